//! Value types shared by event rules

pub mod domain;
pub mod legacy;
pub mod location;
pub mod loglevel;
