pub mod mmu;
