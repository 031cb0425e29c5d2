//! Subcommand implementations.

pub mod embed;
pub mod hide;
pub mod records;
pub mod register;
pub mod reveal;
pub mod verify;
