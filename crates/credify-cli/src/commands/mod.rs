//! CLI command implementations

pub mod authority;
pub mod issue;
pub mod render;
pub mod status;
pub mod verify;
