//! BQT: Brand Quarter Toolkit
//!
//! Links a brand registry to quarterly metric snapshots. The offline builder
//! turns each quarter's source file into a period document; the store and
//! query layer answer brand x period questions over those documents.

pub mod build;
pub mod cli;
pub mod core;
pub mod metrics;
pub mod query;
pub mod store;
