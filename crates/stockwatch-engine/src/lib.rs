pub mod access;
mod deliver;
pub mod error;
pub mod hash;
pub mod reconcile;
pub mod sweep;

pub use access::{AccessMonitor, AccessOutcome};
pub use error::EngineError;
pub use hash::content_hash;
pub use reconcile::{Action, PassSummary, ReconcilePolicy, Reconciler};
pub use sweep::{EngineSettings, SweepSummary, Watcher};
