//! Core module - fundamental types and utilities

pub mod config;
pub mod document;
pub mod matcher;
pub mod period;
pub mod project;
pub mod registry;

pub use config::Config;
pub use document::{PeriodDocument, PeriodIndex, SnapshotRecord};
pub use matcher::NameIndex;
pub use period::{PeriodError, PeriodKey, UNKNOWN_PERIOD};
pub use project::{Workspace, WorkspaceError};
pub use registry::{Brand, BrandId, Registry, RegistryError};
