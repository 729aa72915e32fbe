//! CLI command implementations

pub mod brands;
pub mod build;
pub mod compare;
pub mod completions;
pub mod coverage;
pub mod history;
pub mod init;
pub mod periods;
pub mod show;
