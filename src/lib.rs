//! Pacer - an in-process periodic task scheduler
//!
//! Callers register named units of work with a recurrence policy; a
//! single scheduling thread sleeps until the earliest task is due (or is
//! woken early by a new arrival), then hands the work to a pluggable
//! [`TaskRunner`]. `Period` tasks keep a fixed cadence regardless of run
//! duration; `Fixed` tasks keep a fixed gap after each run completes.
//!
//! ```no_run
//! use pacer::{Policy, Scheduler};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//! scheduler.start()?;
//! scheduler.add_task(
//!     "heartbeat",
//!     || println!("beat"),
//!     Duration::from_secs(5),
//!     Policy::Period,
//!     true,
//! );
//! # scheduler.stop()?;
//! # Ok::<(), pacer::PacerError>(())
//! ```

pub mod clock;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod task;

pub use clock::{Clock, SystemClock};
pub use error::{PacerError, Result};
pub use runner::{Job, TaskRunner, ThreadRunner, TokioRunner};
pub use scheduler::Scheduler;
pub use task::{Policy, Task, TaskSnapshot, Work};
