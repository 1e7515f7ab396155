use core::fmt;

use crate::paging::{PageTable, PageTableEntry, Vpn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub usize);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A process as seen by the CPU scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub pid: Pid,
    pub arrival_time: u64,
    pub burst_time: u64,

    pub remaining_time: u64,
    pub completion: Option<Completion>,

    // Set while the process sits in the ready queue.
    pub queued: bool,
}

impl Process {
    pub fn new(pid: Pid, arrival_time: u64, burst_time: u64) -> Self {
        Self {
            pid,
            arrival_time,
            burst_time,

            remaining_time: burst_time,
            completion: None,

            queued: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_time == 0
    }

    /// Whether the process can join the ready queue at `time`.
    pub fn is_ready_at(&self, time: u64) -> bool {
        self.arrival_time <= time && !self.is_finished() && !self.queued
    }

    /// Runs the process for at most `quantum` ticks and returns the ticks used.
    ///
    /// Stamps the completion metrics when the remaining time reaches zero.
    pub fn run(&mut self, now: u64, quantum: u64) -> u64 {
        let ran_for = self.remaining_time.min(quantum);
        self.remaining_time -= ran_for;

        if self.remaining_time == 0 && self.completion.is_none() {
            let completion_time = now + ran_for;
            let turnaround_time = completion_time - self.arrival_time;
            self.completion = Some(Completion {
                completion_time,
                turnaround_time,
                waiting_time: turnaround_time - self.burst_time,
            });
        }

        ran_for
    }
}

/// Metrics recorded once, when a process finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub completion_time: u64,
    pub turnaround_time: u64,
    pub waiting_time: u64,
}

/// Index of a [`ProcessMemoryInfo`] inside a [`ProcessTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub usize);

/// Paging state of one process.
pub struct ProcessMemoryInfo {
    pub pid: Pid,
    /// Zero means the admission request failed.
    pub pages_requested: usize,
    pub page_table: PageTable,
}

impl ProcessMemoryInfo {
    pub fn new(pid: Pid, page_capacity: usize) -> Self {
        Self {
            pid,
            pages_requested: 0,
            page_table: PageTable::new(page_capacity),
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.pages_requested > 0
    }

    pub fn admit(&mut self, pages: usize) {
        self.page_table.invalidate_all();
        self.pages_requested = pages;
    }

    /// The entries that belong to the admitted range.
    pub fn entries(&self) -> &[PageTableEntry] {
        &self.page_table.entries[..self.pages_requested]
    }
}

/// Arena of per-process page tables. Only a slot whose admission failed is
/// handed to another pid before `clear`.
pub struct ProcessTable {
    processes: Vec<ProcessMemoryInfo>,
}
impl ProcessTable {
    pub fn new() -> Self {
        Self { processes: vec![] }
    }

    pub fn insert(&mut self, info: ProcessMemoryInfo) -> Slot {
        self.processes.push(info);
        Slot(self.processes.len() - 1)
    }

    pub fn find(&self, pid: Pid) -> Option<Slot> {
        self.processes
            .iter()
            .position(|info| info.pid == pid)
            .map(Slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&ProcessMemoryInfo> {
        self.processes.get(slot.0)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut ProcessMemoryInfo> {
        self.processes.get_mut(slot.0)
    }

    pub fn get_mut_pte(&mut self, slot: Slot, vpn: Vpn) -> Option<&mut PageTableEntry> {
        self.processes
            .get_mut(slot.0)
            .and_then(|info| info.page_table.entries.get_mut(vpn.0))
    }

    /// First record whose admission failed. Such a record owns no frames.
    pub fn find_unadmitted(&self) -> Option<Slot> {
        self.processes
            .iter()
            .position(|info| !info.is_admitted())
            .map(Slot)
    }

    pub fn replace(&mut self, slot: Slot, info: ProcessMemoryInfo) -> Option<Slot> {
        let entry = self.processes.get_mut(slot.0)?;
        *entry = info;
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessMemoryInfo> {
        self.processes.iter()
    }

    pub fn clear(&mut self) {
        self.processes.clear();
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
