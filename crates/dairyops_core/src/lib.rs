//! Core logic for the DairyOps shift scheduler.
//! This crate owns the schedule invariants; front ends only render and relay.

pub mod config;
pub mod db;
pub mod interchange;
pub mod logging;
pub mod model;
pub mod sync;
pub mod timeline;

pub use config::{ConfigError, PlannerConfig};
pub use interchange::csv::{parse_import, ExportPayload, ImportError, PendingImport};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::plan::{PlanDocument, PlanId};
pub use model::task::{Task, TaskDraft, TaskField, TaskId};
pub use sync::document::{DocumentPath, DocumentService, Snapshot};
pub use sync::error::{MutationError, ServiceError, ServiceErrorCode, StoreError};
pub use sync::identity::{IdentityProvider, LocalIdentityProvider, UserIdentity};
pub use sync::memory::MemoryDocumentService;
pub use sync::sqlite::SqliteDocumentService;
pub use sync::store::{ChangeOrigin, ScheduleStore, StoreChange, SyncState};
pub use timeline::clock::to_decimal_hours;
pub use timeline::color::{color_for, color_for_opt, ResourceColor};
pub use timeline::geometry::{bar_span, BarSpan, TimeWindow};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
