use core::fmt;

use crate::memory::FrameTable;

pub struct PageTable {
    pub entries: Vec<PageTableEntry>,
}
impl PageTable {
    pub fn new(page_count: usize) -> Self {
        let mut entries = Vec::with_capacity(page_count);
        for _ in 0..page_count {
            entries.push(PageTableEntry::new());
        }
        Self { entries }
    }

    pub fn invalidate_all(&mut self) {
        for pte in self.entries.iter_mut() {
            pte.invalidate();
        }
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|pte| pte.valid).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vpn(pub usize);

impl fmt::Display for Vpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pfn(pub usize);

impl fmt::Display for Pfn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub pfn: Option<Pfn>,
    pub valid: bool,
}
impl PageTableEntry {
    pub fn new() -> Self {
        Self {
            pfn: None,
            valid: false,
        }
    }

    pub fn map(&mut self, pfn: Pfn) {
        self.pfn = Some(pfn);
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.pfn = None;
        self.valid = false;
    }
}

impl Default for PageTableEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Chooses the frame to evict once every frame is occupied.
pub trait PageReplacementPolicy {
    fn pick_victim(&mut self, frame_table: &FrameTable) -> Pfn;

    /// Forget all replacement history.
    fn reset(&mut self);
}

/// First-in first-out replacement with one cursor shared by all processes.
///
/// Frames are handed out lowest-index first and never released, so the
/// frame under the cursor is always the one filled longest ago.
#[derive(Debug, Default)]
pub struct Fifo {
    pub hand: usize,
}
impl Fifo {
    pub fn new() -> Self {
        Self { hand: 0 }
    }

    pub fn inc(&mut self, frame_count: usize) {
        self.hand += 1;
        if self.hand >= frame_count {
            self.hand = 0;
        }
    }
}
impl PageReplacementPolicy for Fifo {
    fn pick_victim(&mut self, frame_table: &FrameTable) -> Pfn {
        let victim = self.hand;
        self.inc(frame_table.entries.len());
        Pfn(victim)
    }

    fn reset(&mut self) {
        self.hand = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_table_is_invalid() {
        let table = PageTable::new(4);
        assert_eq!(table.entries.len(), 4);
        assert!(table.entries.iter().all(|pte| !pte.valid && pte.pfn.is_none()));
        assert_eq!(table.valid_count(), 0);
    }

    #[test]
    fn test_map_and_invalidate() {
        let mut table = PageTable::new(3);
        table.entries[1].map(Pfn(7));
        assert_eq!(table.entries[1].pfn, Some(Pfn(7)));
        assert_eq!(table.valid_count(), 1);

        table.invalidate_all();
        assert_eq!(table.entries[1], PageTableEntry::new());
    }

    #[test]
    fn test_fifo_hand_wraps() {
        let frames = FrameTable::new(3);
        let mut fifo = Fifo::new();
        let order: Vec<Pfn> = (0..5).map(|_| fifo.pick_victim(&frames)).collect();
        assert_eq!(order, vec![Pfn(0), Pfn(1), Pfn(2), Pfn(0), Pfn(1)]);

        fifo.reset();
        assert_eq!(fifo.pick_victim(&frames), Pfn(0));
    }
}
