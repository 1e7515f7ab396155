use core::fmt;

use crate::{paging::Vpn, process::Pid};

/// Errors reported by the memory manager. None of them mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Admission asked for a page count outside `1..=max`.
    InvalidPageCount { pid: Pid, requested: usize, max: usize },
    /// The pid was never admitted, or its admission failed.
    NoSuchProcess(Pid),
    /// The page lies outside the process's admitted range.
    PageOutOfRange { pid: Pid, vpn: Vpn, pages: usize },
    /// Pids are positive.
    InvalidPid(Pid),
    /// The pid already holds a successful admission.
    DuplicateProcess(Pid),
    /// No room left to track another process.
    ProcessTableFull { capacity: usize },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPageCount {
                pid,
                requested,
                max,
            } => write!(
                f,
                "process {}: invalid number of pages requested ({}), expected 1..={}",
                pid, requested, max
            ),
            Self::NoSuchProcess(pid) => write!(f, "process {} has no admitted memory", pid),
            Self::PageOutOfRange { pid, vpn, pages } => write!(
                f,
                "process {}: page {} out of range (requested pages: {})",
                pid, vpn, pages
            ),
            Self::InvalidPid(pid) => write!(f, "invalid pid {}", pid),
            Self::DuplicateProcess(pid) => {
                write!(f, "process {} is already tracked by the memory manager", pid)
            }
            Self::ProcessTableFull { capacity } => {
                write!(f, "memory manager already tracks {} processes", capacity)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors reported by the round-robin scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The ready queue had no room. Recorded in the report; the run goes on.
    QueueCapacityExceeded { pid: Pid, capacity: usize },
    /// A process with nothing to run can never be dispatched.
    ZeroBurstTime(Pid),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueCapacityExceeded { pid, capacity } => write!(
                f,
                "ready queue is full (capacity {}), process {} not queued",
                capacity, pid
            ),
            Self::ZeroBurstTime(pid) => write!(f, "process {} has a zero burst time", pid),
        }
    }
}

impl std::error::Error for SchedulerError {}
