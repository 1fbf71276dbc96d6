//! Run the filter helper under the requesting client's credentials.
//!
//! Filter text comes from unprivileged clients, so the daemon never parses
//! it itself. When running as root, the helper process drops to the
//! client's uid/gid before exec; otherwise it inherits the current user.

use std::io::Write;
use std::process::{Command, Stdio};

use nix::unistd::{geteuid, getgid, getuid};
use std::os::unix::process::CommandExt;
use tracectl_shared::bytecode::{Bytecode, BytecodeCompiler, CompileError, Credentials};
use tracing::{debug, warn};

use crate::config::CompilerConfig;
use crate::error::RunAsError;
use crate::protocol::{CompileOutcome, CompileReply, CompileRequest, PROTOCOL_VERSION};

/// Real uid/gid of this process.
pub fn current_credentials() -> Credentials {
    Credentials::new(getuid().as_raw(), getgid().as_raw())
}

/// [`BytecodeCompiler`] backed by an external helper process.
#[derive(Debug, Clone)]
pub struct RunAsCompiler {
    config: CompilerConfig,
}

impl RunAsCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    fn command(&self, creds: &Credentials) -> Command {
        let mut command = Command::new(&self.config.helper_path);
        command
            .args(&self.config.helper_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if geteuid().is_root() {
            debug!(
                "Running filter helper as uid {} gid {}",
                creds.uid, creds.gid
            );
            command.uid(creds.uid).gid(creds.gid);
        }
        command
    }

    /// Compile `filter`, returning the raw bytecode.
    pub fn run(&self, filter: &str, creds: &Credentials) -> Result<Vec<u8>, RunAsError> {
        let request = CompileRequest::new(filter).to_bytes()?;

        let mut child = self.command(creds).spawn().map_err(RunAsError::Spawn)?;
        // stdin is dropped (closed) before waiting so the helper sees end of
        // input. The child is reaped even when the write fails.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&request).map_err(RunAsError::Io),
            None => Err(RunAsError::MissingPipe("stdin")),
        };
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(RunAsError::HelperFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if let Err(err) = written {
            warn!("Filter helper exited before reading the request");
            return Err(err);
        }

        let reply = CompileReply::from_bytes(&output.stdout)?;
        if reply.version != PROTOCOL_VERSION {
            return Err(RunAsError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: reply.version,
            });
        }

        match reply.outcome {
            CompileOutcome::Rejected(reason) => Err(RunAsError::Rejected(reason)),
            CompileOutcome::Bytecode(bytecode) if bytecode.is_empty() => {
                Err(RunAsError::EmptyBytecode)
            }
            CompileOutcome::Bytecode(bytecode)
                if bytecode.len() > self.config.max_bytecode_len =>
            {
                Err(RunAsError::BytecodeTooLarge {
                    len: bytecode.len(),
                    max: self.config.max_bytecode_len,
                })
            }
            CompileOutcome::Bytecode(bytecode) => Ok(bytecode),
        }
    }
}

impl BytecodeCompiler for RunAsCompiler {
    fn compile(&self, filter: &str, creds: &Credentials) -> Result<Bytecode, CompileError> {
        match self.run(filter, creds) {
            Ok(bytecode) => {
                debug!("Filter compiled to {} bytes of bytecode", bytecode.len());
                Ok(Bytecode::new(bytecode))
            }
            Err(err) => {
                warn!("Filter compilation failed: {}", err);
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compiler(helper: &str, args: &[&str]) -> RunAsCompiler {
        RunAsCompiler::new(CompilerConfig {
            helper_path: PathBuf::from(helper),
            helper_args: args.iter().map(|a| a.to_string()).collect(),
            max_bytecode_len: 16,
        })
    }

    fn creds() -> Credentials {
        current_credentials()
    }

    #[test]
    fn test_missing_helper_is_unavailable() {
        let compiler = compiler("/nonexistent/tracectl-filter-helper", &[]);
        let err = compiler.run("a == 1", &creds()).unwrap_err();
        assert!(matches!(err, RunAsError::Spawn(_)));
        assert!(matches!(
            CompileError::from(err),
            CompileError::Unavailable(_)
        ));
    }

    #[test]
    fn test_failing_helper_reports_stderr() {
        let compiler = compiler("/bin/sh", &["-c", "cat >/dev/null; echo boom >&2; exit 3"]);
        match compiler.run("a == 1", &creds()).unwrap_err() {
            RunAsError::HelperFailed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_helper_exiting_before_reading_is_reaped() {
        // Larger than any pipe buffer, so the write fails once the helper exits.
        let filter = "a".repeat(1 << 20);
        let compiler = compiler("/bin/sh", &["-c", "echo bad-usage >&2; exit 2"]);
        match compiler.run(&filter, &creds()).unwrap_err() {
            RunAsError::HelperFailed { status, stderr } => {
                assert_eq!(status.code(), Some(2));
                assert_eq!(stderr, "bad-usage");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_helper_ignoring_input_reports_write_error() {
        let filter = "a".repeat(1 << 20);
        let compiler = compiler("/bin/sh", &["-c", "exit 0"]);
        assert!(matches!(
            compiler.run(&filter, &creds()).unwrap_err(),
            RunAsError::Io(_)
        ));
    }

    #[test]
    fn test_garbage_reply_is_protocol_error() {
        let compiler = compiler("/bin/sh", &["-c", "cat >/dev/null; printf 'zz'"]);
        assert!(matches!(
            compiler.run("a == 1", &creds()).unwrap_err(),
            RunAsError::Protocol(_)
        ));
    }
}
