use log::{debug, warn};

use crate::{
    config::MemoryConfig,
    error::MemoryError,
    hardware::mmu::{Mmu, TranslationResult},
    paging::{Fifo, PageReplacementPolicy, PageTableEntry, Pfn, Vpn},
    process::{Pid, ProcessMemoryInfo, ProcessTable, Slot},
};

/// Demand-paging memory manager.
///
/// Owns the frame pool and every page table. Page tables are only changed
/// through [`MemoryManager::request_memory`] and
/// [`MemoryManager::access_memory`].
pub struct MemoryManager<P: PageReplacementPolicy = Fifo> {
    frame_table: FrameTable,
    mmu: Mmu,
    policy: P,
    stats: MemoryStats,
    processes: ProcessTable,
    config: MemoryConfig,
}

impl MemoryManager<Fifo> {
    pub fn fifo(config: MemoryConfig) -> Self {
        Self::with_config(config, Fifo::new())
    }
}

impl Default for MemoryManager<Fifo> {
    fn default() -> Self {
        Self::fifo(MemoryConfig::default())
    }
}

impl<P: PageReplacementPolicy> MemoryManager<P> {
    pub fn new(policy: P) -> Self {
        Self::with_config(MemoryConfig::default(), policy)
    }

    pub fn with_config(mut config: MemoryConfig, policy: P) -> Self {
        // The pool needs at least one frame to evict into.
        config.frame_count = config.frame_count.max(1);
        Self {
            frame_table: FrameTable::new(config.frame_count),
            mmu: Mmu::new(),
            policy,
            stats: MemoryStats::new(),
            processes: ProcessTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Frees every frame, forgets every process and zeroes the counters.
    pub fn init_memory(&mut self) {
        self.frame_table = FrameTable::new(self.config.frame_count);
        self.policy.reset();
        self.stats = MemoryStats::new();
        self.processes.clear();
        debug!(
            "memory initialized: {} frames, {} pages per process",
            self.config.frame_count, self.config.max_pages_per_process
        );
    }

    /// Admits `pid` with `pages` logical pages.
    ///
    /// Checks run in order: `InvalidPid`, `DuplicateProcess`,
    /// `InvalidPageCount`, `ProcessTableFull`. A bad page count still records
    /// the pid with zero pages requested when there is room, so a later
    /// request can retry. Only admitted processes count toward the table
    /// limit; once the table is full a failed record is overwritten by the
    /// next new pid.
    pub fn request_memory(&mut self, pid: Pid, pages: usize) -> Result<(), MemoryError> {
        if pid.0 == 0 {
            return Err(MemoryError::InvalidPid(pid));
        }
        if self.process(pid).is_some_and(|info| info.is_admitted()) {
            return Err(MemoryError::DuplicateProcess(pid));
        }

        let max = self.config.max_pages_per_process;
        if pages == 0 || pages > max {
            if let Some(info) = self.record_for(pid) {
                info.pages_requested = 0;
            }
            return Err(MemoryError::InvalidPageCount {
                pid,
                requested: pages,
                max,
            });
        }

        let capacity = self.config.max_tracked_processes;
        let info = self
            .record_for(pid)
            .ok_or(MemoryError::ProcessTableFull { capacity })?;
        info.admit(pages);
        debug!("process {} admitted with {} pages", pid, pages);
        Ok(())
    }

    // The record for `pid`. A new pid gets a fresh slot while there is room,
    // then takes over the oldest failed record.
    fn record_for(&mut self, pid: Pid) -> Option<&mut ProcessMemoryInfo> {
        let max = self.config.max_pages_per_process;
        let slot = match self.processes.find(pid) {
            Some(slot) => slot,
            None if self.processes.len() < self.config.max_tracked_processes => {
                self.processes.insert(ProcessMemoryInfo::new(pid, max))
            }
            None => {
                let slot = self.processes.find_unadmitted()?;
                self.processes.replace(slot, ProcessMemoryInfo::new(pid, max))?
            }
        };
        self.processes.get_mut(slot)
    }

    /// Touches page `vpn` of `pid`, faulting it in if it is not resident.
    pub fn access_memory(&mut self, pid: Pid, vpn: Vpn) -> Result<AccessOutcome, MemoryError> {
        let slot = self
            .processes
            .find(pid)
            .filter(|&slot| self.processes.get(slot).is_some_and(|info| info.is_admitted()))
            .ok_or(MemoryError::NoSuchProcess(pid))?;
        let info = self
            .processes
            .get(slot)
            .ok_or(MemoryError::NoSuchProcess(pid))?;

        if vpn.0 >= info.pages_requested {
            return Err(MemoryError::PageOutOfRange {
                pid,
                vpn,
                pages: info.pages_requested,
            });
        }

        match self.mmu.translate(&info.page_table, vpn) {
            TranslationResult::Success(frame) => {
                self.stats.hit_count += 1;
                debug!("process {} page {}: hit in frame {}", pid, vpn, frame);
                Ok(AccessOutcome::Hit { frame })
            }
            TranslationResult::PageFault => Ok(self.handle_page_fault(pid, slot, vpn)),
        }
    }

    fn handle_page_fault(&mut self, pid: Pid, slot: Slot, vpn: Vpn) -> AccessOutcome {
        self.stats.page_fault_count += 1;
        let (frame, evicted) = self.allocate_frame();

        self.frame_table.entries[frame.0].assign(pid, vpn, slot);
        if let Some(pte) = self.processes.get_mut_pte(slot, vpn) {
            pte.map(frame);
        }

        match evicted {
            Some(victim) => debug!(
                "process {} page {}: fault, evicted process {} page {} from frame {}",
                pid, vpn, victim.pid, victim.vpn, frame
            ),
            None => debug!("process {} page {}: fault, loaded into free frame {}", pid, vpn, frame),
        }

        AccessOutcome::Fault { frame, evicted }
    }

    fn allocate_frame(&mut self) -> (Pfn, Option<Eviction>) {
        if let Some(pfn) = self.frame_table.get_unassigned() {
            return (pfn, None);
        }
        let victim_pfn = self.policy.pick_victim(&self.frame_table);
        let evicted = self.evict_page(victim_pfn);
        (victim_pfn, evicted)
    }

    /// Unmaps whatever page occupies `pfn` and frees the frame.
    fn evict_page(&mut self, pfn: Pfn) -> Option<Eviction> {
        let owner = self.frame_table.entries[pfn.0].owner?;
        self.frame_table.entries[pfn.0].clear();

        match self.processes.get_mut_pte(owner.slot, owner.vpn) {
            Some(pte) if pte.pfn == Some(pfn) => {
                pte.invalidate();
                self.stats.eviction_count += 1;
                Some(Eviction {
                    pid: owner.pid,
                    vpn: owner.vpn,
                })
            }
            _ => {
                warn!(
                    "frame {} names process {} page {} but its page table disagrees",
                    pfn, owner.pid, owner.vpn
                );
                None
            }
        }
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    pub fn fault_count(&self) -> u64 {
        self.stats.page_fault_count
    }

    /// The tracked record for `pid`, admitted or not.
    pub fn process(&self, pid: Pid) -> Option<&ProcessMemoryInfo> {
        self.processes.find(pid).and_then(|slot| self.processes.get(slot))
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessMemoryInfo> {
        self.processes.iter()
    }

    pub fn snapshot_status(&self) -> MemorySnapshot {
        let frames = self
            .frame_table
            .entries
            .iter()
            .map(|fte| {
                fte.owner.map(|owner| Resident {
                    pid: owner.pid,
                    vpn: owner.vpn,
                })
            })
            .collect();

        let processes = self
            .processes
            .iter()
            .map(|info| PageTableSnapshot {
                pid: info.pid,
                pages_requested: info.pages_requested,
                entries: info.entries().to_vec(),
            })
            .collect();

        MemorySnapshot {
            frames,
            processes,
            fault_count: self.stats.page_fault_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit { frame: Pfn },
    Fault { frame: Pfn, evicted: Option<Eviction> },
}

impl AccessOutcome {
    pub fn frame(&self) -> Pfn {
        match self {
            Self::Hit { frame } | Self::Fault { frame, .. } => *frame,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}

/// The page pushed out of its frame by a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub pid: Pid,
    pub vpn: Vpn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub page_fault_count: u64,
    pub hit_count: u64,
    pub eviction_count: u64,
}
impl MemoryStats {
    fn new() -> Self {
        Self::default()
    }
}

pub struct FrameTable {
    pub entries: Vec<FrameTableEntry>,
}
impl FrameTable {
    pub fn new(frame_count: usize) -> Self {
        let mut entries = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            entries.push(FrameTableEntry::new());
        }
        Self { entries }
    }

    /// Lowest-indexed free frame.
    pub fn get_unassigned(&self) -> Option<Pfn> {
        self.entries
            .iter()
            .position(|frame| frame.is_free())
            .map(Pfn)
    }

    pub fn occupied_count(&self) -> usize {
        self.entries.iter().filter(|frame| !frame.is_free()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOwner {
    pub pid: Pid,
    pub vpn: Vpn,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTableEntry {
    pub owner: Option<FrameOwner>,
}
impl FrameTableEntry {
    pub fn new() -> Self {
        FrameTableEntry { owner: None }
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn clear(&mut self) {
        self.owner = None;
    }

    pub fn assign(&mut self, pid: Pid, vpn: Vpn, slot: Slot) {
        self.owner = Some(FrameOwner { pid, vpn, slot });
    }
}

/// Read-only view of the frame pool and every tracked page table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub frames: Vec<Option<Resident>>,
    pub processes: Vec<PageTableSnapshot>,
    pub fault_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resident {
    pub pid: Pid,
    pub vpn: Vpn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTableSnapshot {
    pub pid: Pid,
    pub pages_requested: usize,
    pub entries: Vec<PageTableEntry>,
}
