//! Round-robin CPU scheduling over a bounded ready queue.

use core::num::NonZeroU64;

use log::{debug, warn};

use crate::{
    config::DEFAULT_TIME_QUANTUM,
    error::SchedulerError,
    process::{Completion, Pid, Process},
};

/// Maximum CPU time granted per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeQuantum(NonZeroU64);

impl TimeQuantum {
    pub fn new(ticks: NonZeroU64) -> Self {
        Self(ticks)
    }

    /// Accepts user input; anything non-positive falls back to the default.
    pub fn from_input(ticks: i64) -> Self {
        match u64::try_from(ticks).ok().and_then(NonZeroU64::new) {
            Some(ticks) => Self(ticks),
            None => {
                debug!(
                    "time quantum {} is not positive, using {}",
                    ticks, DEFAULT_TIME_QUANTUM
                );
                Self::default()
            }
        }
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl Default for TimeQuantum {
    fn default() -> Self {
        Self(NonZeroU64::MIN.saturating_add(DEFAULT_TIME_QUANTUM - 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

/// Bounded circular FIFO of process indices.
pub struct ReadyQueue {
    slots: Vec<usize>,
    head: usize,
    len: usize,
}

impl ReadyQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity],
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn push(&mut self, idx: usize) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull);
        }
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = idx;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let idx = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEvent {
    /// `pid` held the CPU from `start` for `ran_for` ticks.
    Dispatch {
        start: u64,
        pid: Pid,
        ran_for: u64,
        remaining: u64,
    },
    /// Nothing was ready; the clock jumped to the next arrival.
    Idle { from: u64, to: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    pub pid: Pid,
    pub arrival_time: u64,
    pub burst_time: u64,
    pub completion_time: u64,
    pub turnaround_time: u64,
    pub waiting_time: u64,
}

impl ProcessReport {
    fn new(process: &Process, completion: Completion) -> Self {
        Self {
            pid: process.pid,
            arrival_time: process.arrival_time,
            burst_time: process.burst_time,
            completion_time: completion.completion_time,
            turnaround_time: completion.turnaround_time,
            waiting_time: completion.waiting_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleReport {
    pub quantum: u64,
    /// One row per input process, in input order.
    pub processes: Vec<ProcessReport>,
    pub average_turnaround: f64,
    pub average_waiting: f64,
    pub events: Vec<ScheduleEvent>,
    /// Ready-queue overflows seen during the run.
    pub overflows: Vec<SchedulerError>,
}

pub struct RoundRobin {
    quantum: TimeQuantum,
    queue_capacity: Option<usize>,
}

impl RoundRobin {
    pub fn new(quantum: TimeQuantum) -> Self {
        Self {
            quantum,
            queue_capacity: None,
        }
    }

    /// Overrides the ready-queue capacity, which otherwise equals the
    /// number of processes.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn quantum(&self) -> TimeQuantum {
        self.quantum
    }

    /// Runs every process to completion. The input's run-time state is ignored.
    pub fn run(&self, processes: &[Process]) -> Result<ScheduleReport, SchedulerError> {
        if let Some(process) = processes.iter().find(|p| p.burst_time == 0) {
            return Err(SchedulerError::ZeroBurstTime(process.pid));
        }

        let capacity = self.queue_capacity.unwrap_or(processes.len()).max(1);
        let mut run = Run {
            processes: processes
                .iter()
                .map(|p| Process::new(p.pid, p.arrival_time, p.burst_time))
                .collect(),
            queue: ReadyQueue::with_capacity(capacity),
            clock: 0,
            ever_queued: false,
            events: vec![],
            overflows: vec![],
        };
        run.simulate(self.quantum.get());

        let rows: Vec<ProcessReport> = run
            .processes
            .iter()
            .filter_map(|p| p.completion.map(|c| ProcessReport::new(p, c)))
            .collect();
        let (average_turnaround, average_waiting) = averages(&rows);

        Ok(ScheduleReport {
            quantum: self.quantum.get(),
            processes: rows,
            average_turnaround,
            average_waiting,
            events: run.events,
            overflows: run.overflows,
        })
    }
}

/// Runs `processes` under round robin; a non-positive `quantum` means the default.
pub fn run_round_robin(
    processes: &[Process],
    quantum: i64,
) -> Result<ScheduleReport, SchedulerError> {
    RoundRobin::new(TimeQuantum::from_input(quantum)).run(processes)
}

fn averages(rows: &[ProcessReport]) -> (f64, f64) {
    if rows.is_empty() {
        return (0.0, 0.0);
    }
    let n = rows.len() as f64;
    let turnaround: u64 = rows.iter().map(|r| r.turnaround_time).sum();
    let waiting: u64 = rows.iter().map(|r| r.waiting_time).sum();
    (turnaround as f64 / n, waiting as f64 / n)
}

struct Run {
    processes: Vec<Process>,
    queue: ReadyQueue,
    clock: u64,
    ever_queued: bool,
    events: Vec<ScheduleEvent>,
    overflows: Vec<SchedulerError>,
}

impl Run {
    fn simulate(&mut self, quantum: u64) {
        let mut completed = 0;

        while completed < self.processes.len() {
            self.admit_arrivals(None);

            let Some(idx) = self.queue.pop() else {
                self.idle();
                continue;
            };

            let process = &mut self.processes[idx];
            process.queued = false;
            let start = self.clock;
            let ran_for = process.run(start, quantum);
            self.clock += ran_for;
            self.events.push(ScheduleEvent::Dispatch {
                start,
                pid: process.pid,
                ran_for,
                remaining: process.remaining_time,
            });

            if process.is_finished() {
                debug!("t={}: process {} finished", self.clock, process.pid);
                completed += 1;
            } else {
                // Arrivals during the slice go ahead of the preempted process.
                self.admit_arrivals(Some(idx));
                self.enqueue(idx);
            }
        }
    }

    fn admit_arrivals(&mut self, skip: Option<usize>) {
        for idx in 0..self.processes.len() {
            if Some(idx) != skip && self.processes[idx].is_ready_at(self.clock) {
                self.enqueue(idx);
            }
        }
    }

    fn enqueue(&mut self, idx: usize) {
        let process = &mut self.processes[idx];
        match self.queue.push(idx) {
            Ok(()) => {
                process.queued = true;
                self.ever_queued = true;
            }
            Err(QueueFull) => {
                let err = SchedulerError::QueueCapacityExceeded {
                    pid: process.pid,
                    capacity: self.queue.capacity(),
                };
                warn!("t={}: {}", self.clock, err);
                self.overflows.push(err);
            }
        }
    }

    fn idle(&mut self) {
        if !self.ever_queued {
            self.clock += 1;
            return;
        }

        let next_arrival = self
            .processes
            .iter()
            .filter(|p| !p.is_finished())
            .map(|p| p.arrival_time)
            .min();

        match next_arrival {
            Some(arrival) if arrival > self.clock => {
                debug!("cpu idle, advancing time from {} to {}", self.clock, arrival);
                self.events.push(ScheduleEvent::Idle {
                    from: self.clock,
                    to: arrival,
                });
                self.clock = arrival;
            }
            _ => self.clock += 1,
        }
    }
}
