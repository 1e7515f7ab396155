use crate::paging::{PageTable, Pfn, Vpn};

pub struct Mmu;

impl Mmu {
    pub fn new() -> Self {
        Self {}
    }

    /// Looks `vpn` up in `page_table`. The caller has already checked that
    /// `vpn` lies inside the admitted range.
    pub fn translate(&self, page_table: &PageTable, vpn: Vpn) -> TranslationResult {
        let pte = &page_table.entries[vpn.0];

        match (pte.valid, pte.pfn) {
            (true, Some(pfn)) => TranslationResult::Success(pfn),
            _ => TranslationResult::PageFault,
        }
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationResult {
    Success(Pfn),
    PageFault,
}
