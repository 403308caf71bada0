//! `yedek-core` — shared types and configuration for the yedek workspace.
//!
//! Holds the pieces every other crate needs: id newtypes, the database
//! connection descriptor, the engine catalog and migration pair tables
//! (static configuration data with compiled-in defaults), and the command
//! template renderer.

pub mod config;
pub mod error;
pub mod template;
pub mod types;

pub use config::{BackupConfig, EngineSpec, MigrationConfig, MigrationPair, YedekConfig};
pub use error::{CoreError, Result};
pub use types::{ConnectionInfo, JobId, RecordId};
