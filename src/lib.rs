//! Discrete-event simulation of a single-CPU round-robin scheduler and a
//! demand-paging memory manager with FIFO frame replacement.

pub mod config;
pub mod error;
pub mod hardware;
pub mod memory;
pub mod paging;
pub mod process;
pub mod scheduler;
pub mod workload;

pub use error::{MemoryError, SchedulerError};
pub use memory::{AccessOutcome, Eviction, MemoryManager, MemorySnapshot};
pub use process::{Pid, Process};
pub use scheduler::{RoundRobin, ScheduleReport, TimeQuantum, run_round_robin};
