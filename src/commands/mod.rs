//! CLI commands

pub mod compact;
pub mod init;
pub mod list;
pub mod user;
