//! Long-running scheduler: load the ledger, sync once, then tick on a fixed
//! period until ctrl-c.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, run_scheduler, start_blocking, SchedulerStats};
