//! Mock implementations of the collaborators of [super::Actor].

pub mod chain;
pub mod resolver;
pub mod transport;
