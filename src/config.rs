/// Total physical memory in KB.
pub const TOTAL_MEMORY_SIZE: usize = 128;
/// Page (and frame) size in KB.
pub const PAGE_SIZE: usize = 16;
pub const FRAME_COUNT: usize = TOTAL_MEMORY_SIZE / PAGE_SIZE;

pub const MAX_PAGES_PER_PROCESS: usize = 10;

// How many processes the memory manager keeps page tables for.
pub const MAX_TRACKED_PROCESSES: usize = 5;

pub const DEFAULT_TIME_QUANTUM: u64 = 4;

/// Capacities of one memory manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub frame_count: usize,
    pub max_pages_per_process: usize,
    pub max_tracked_processes: usize,
}

impl MemoryConfig {
    pub fn with_frame_count(frame_count: usize) -> Self {
        Self {
            frame_count,
            ..Self::default()
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            frame_count: FRAME_COUNT,
            max_pages_per_process: MAX_PAGES_PER_PROCESS,
            max_tracked_processes: MAX_TRACKED_PROCESSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_count_matches_memory_layout() {
        assert_eq!(FRAME_COUNT, 8);
        assert_eq!(MemoryConfig::default().frame_count, 8);
        assert_eq!(MemoryConfig::default().max_pages_per_process, 10);
    }

    #[test]
    fn test_with_frame_count_keeps_other_limits() {
        let config = MemoryConfig::with_frame_count(3);
        assert_eq!(config.frame_count, 3);
        assert_eq!(config.max_tracked_processes, MAX_TRACKED_PROCESSES);
    }
}
