//! Filter bytecode compilation for tracectl
//!
//! Provides [`RunAsCompiler`], the production [`BytecodeCompiler`]: it hands
//! filter text to an external helper process running with the requesting
//! client's credentials and reads back the compiled bytecode.
//!
//! [`BytecodeCompiler`]: tracectl_shared::bytecode::BytecodeCompiler

pub mod config;
pub mod error;
pub mod protocol;
pub mod runas;

pub use config::CompilerConfig;
pub use error::RunAsError;
pub use runas::RunAsCompiler;
