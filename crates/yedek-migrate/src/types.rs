use serde::{Deserialize, Serialize};

use yedek_core::ConnectionInfo;

/// One side of a migration: an engine tag plus its connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub engine: String,
    pub connection: ConnectionInfo,
}

/// Ephemeral migration request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub source: Endpoint,
    pub target: Endpoint,
}

/// Whether to only render the plan or actually run it. Migrations can be
/// long-running and destructive, so execution is always an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    Preview,
    Execute,
}

/// The planning result. `output` and `succeeded` are `None` in preview mode
/// and populated in execute mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Rendered command, reproducible by hand.
    pub command: String,
    /// Human-readable description of the chosen strategy.
    pub info: String,
    pub output: Option<String>,
    pub succeeded: Option<bool>,
}
