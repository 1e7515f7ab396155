//! Synthetic page-reference streams for driving the memory manager.

use rand::Rng;

use crate::{paging::Vpn, process::Pid};

const WORKING_SET_HIT_RATE: f64 = 0.9;

/// A process that issues page references until its lifespan runs out.
pub struct Workload {
    pub pid: Pid,
    pub page_count: usize,
    pub working_set: WorkingSet,

    pub state: WorkloadState,
}

impl Workload {
    pub fn new<R: Rng>(
        pid: Pid,

        page_count: usize,
        working_set_size: usize,

        lifespan: usize,
        working_set_lifespan: usize,

        rng: &mut R,
    ) -> Self {
        let mut working_set = WorkingSet::new(working_set_size.min(page_count));
        working_set.scramble(page_count, rng);

        let state = WorkloadState::new(lifespan, working_set_lifespan);

        Self {
            pid,
            page_count,
            working_set,

            state,
        }
    }

    pub fn request<R: Rng>(&mut self, rng: &mut R) -> Request {
        if self.page_count == 0 || self.state.age >= self.state.lifespan {
            return Request::Termination;
        }

        if self.state.working_set_age >= self.state.working_set_lifespan {
            self.working_set.scramble(self.page_count, rng);
            self.state.working_set_age = 0;
        }

        self.state.age += 1;
        self.state.working_set_age += 1;

        let working_set_hit =
            self.working_set.size > 0 && rng.random_bool(WORKING_SET_HIT_RATE);
        let vpn = if working_set_hit {
            let idx = rng.random_range(..self.working_set.size);
            self.working_set.vpns[idx]
        } else {
            rng.random_range(..self.page_count)
        };

        Request::MemoryReference { vpn: Vpn(vpn) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    MemoryReference { vpn: Vpn },
    Termination,
}

pub struct WorkloadState {
    pub age: usize,
    pub lifespan: usize,

    pub working_set_age: usize,
    pub working_set_lifespan: usize,
}

impl WorkloadState {
    pub fn new(lifespan: usize, working_set_lifespan: usize) -> Self {
        Self {
            age: 0,
            lifespan,

            working_set_age: 0,
            working_set_lifespan,
        }
    }
}

pub struct WorkingSet {
    pub size: usize,
    pub vpns: Vec<usize>,
}

impl WorkingSet {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            vpns: Vec::with_capacity(size),
        }
    }

    pub fn scramble<R: Rng>(&mut self, page_count: usize, rng: &mut R) {
        self.vpns.clear();
        if page_count == 0 {
            return;
        }
        for _ in 0..self.size {
            let vpn = rng.random_range(..page_count);
            self.vpns.push(vpn);
        }
    }
}
