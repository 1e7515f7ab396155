//! Usage: os_sim [OPTIONS]
//!
//! Options:
//!   -q, --quantum <n>  Round-robin time quantum (non-positive means 4)
//!   -s, --seed <n>     Seed for the random paging workload
//!   -v, --verbose      Log every dispatch, fault and eviction to stderr
//!   -h, --help         Print help information

use std::{env, process};

use anyhow::{Context, Result, bail};
use log::{LevelFilter, Log, Metadata, Record};
use rand::{SeedableRng, rngs::StdRng};

use os_sim::{
    AccessOutcome, MemoryManager, MemorySnapshot, Pid, Process, ScheduleReport,
    config::{
        FRAME_COUNT, MAX_PAGES_PER_PROCESS, MAX_TRACKED_PROCESSES, PAGE_SIZE, TOTAL_MEMORY_SIZE,
    },
    paging::Vpn,
    run_round_robin,
    scheduler::ScheduleEvent,
    workload::{Request, Workload},
};

struct SimConfig {
    process_count: usize,
    pages_per_process: usize,
    working_set_size: usize,
    duration: usize,
}

const CONFIG: SimConfig = SimConfig {
    process_count: MAX_TRACKED_PROCESSES,
    pages_per_process: MAX_PAGES_PER_PROCESS,
    working_set_size: 3,
    duration: 200,
};

struct Args {
    quantum: i64,
    seed: u64,
    verbose: bool,
}

#[derive(Default)]
struct SimStats {
    accesses: u64,
    hits: u64,
    faults: u64,
    evictions: u64,
}

impl SimStats {
    fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            (self.hits as f64 / self.accesses as f64) * 100.0
        }
    }

    fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;
    if args.verbose {
        log::set_logger(&LOGGER).context("failed to install logger")?;
        log::set_max_level(LevelFilter::Debug);
    }

    print_header(&args);

    let processes = vec![
        Process::new(Pid(1), 0, 10),
        Process::new(Pid(2), 1, 5),
        Process::new(Pid(3), 2, 8),
    ];
    let report = run_round_robin(&processes, args.quantum)?;
    print_schedule(&report);

    let snapshot = run_fifo_walkthrough()?;
    print_snapshot(&snapshot);

    let stats = run_random_workload(args.seed)?;
    print_report(&stats);

    Ok(())
}

fn print_help(program: &str) {
    eprintln!("Round-robin scheduling and demand-paging simulator");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -q, --quantum <n>  Round-robin time quantum (non-positive means 4)");
    eprintln!("  -s, --seed <n>     Seed for the random paging workload");
    eprintln!("  -v, --verbose      Log every dispatch, fault and eviction to stderr");
    eprintln!("  -h, --help         Print this help message");
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("os_sim");

    let mut parsed = Args {
        quantum: 4,
        seed: 0,
        verbose: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(program);
                process::exit(0);
            }
            "-v" | "--verbose" => parsed.verbose = true,
            "-q" | "--quantum" => {
                let value = iter.next().context("--quantum needs a value")?;
                parsed.quantum = value
                    .parse()
                    .with_context(|| format!("invalid quantum: {}", value))?;
            }
            "-s" | "--seed" => {
                let value = iter.next().context("--seed needs a value")?;
                parsed.seed = value
                    .parse()
                    .with_context(|| format!("invalid seed: {}", value))?;
            }
            _ => bail!("Unknown option: {}\nUse --help for usage information.", arg),
        }
    }

    Ok(parsed)
}

/// One process with one page more than there are frames, touched in order,
/// then page 0 again.
fn run_fifo_walkthrough() -> Result<MemorySnapshot> {
    let mut mm: MemoryManager = MemoryManager::default();
    mm.init_memory();

    let pid = Pid(101);
    let pages = (FRAME_COUNT + 1).min(MAX_PAGES_PER_PROCESS);
    mm.request_memory(pid, pages)?;

    println!("## FIFO walkthrough (PID {}, {} pages)", pid, pages);
    let touches = (0..pages).chain(std::iter::once(0));
    for page in touches {
        let outcome = mm.access_memory(pid, Vpn(page))?;
        println!("- page {}: {}", page, describe(&outcome));
    }
    println!();

    Ok(mm.snapshot_status())
}

fn run_random_workload(seed: u64) -> Result<SimStats> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mm: MemoryManager = MemoryManager::default();
    mm.init_memory();

    let mut workloads = Vec::with_capacity(CONFIG.process_count);
    for i in 0..CONFIG.process_count {
        let pid = Pid(1000 + i + 1);
        mm.request_memory(pid, CONFIG.pages_per_process)?;
        workloads.push(Workload::new(
            pid,
            CONFIG.pages_per_process,
            CONFIG.working_set_size,
            CONFIG.duration,
            CONFIG.duration / 4,
            &mut rng,
        ));
    }

    let mut stats = SimStats::default();
    for _ in 0..CONFIG.duration {
        for workload in workloads.iter_mut() {
            match workload.request(&mut rng) {
                Request::MemoryReference { vpn } => {
                    stats.accesses += 1;
                    match mm.access_memory(workload.pid, vpn)? {
                        AccessOutcome::Hit { .. } => stats.hits += 1,
                        AccessOutcome::Fault { .. } => stats.faults += 1,
                    }
                }
                Request::Termination => {}
            }
        }
    }
    stats.evictions = mm.stats().eviction_count;

    Ok(stats)
}

fn describe(outcome: &AccessOutcome) -> String {
    match outcome {
        AccessOutcome::Hit { frame } => format!("hit in frame {}", frame),
        AccessOutcome::Fault {
            frame,
            evicted: None,
        } => format!("fault, allocated to free frame {}", frame),
        AccessOutcome::Fault {
            frame,
            evicted: Some(victim),
        } => format!(
            "fault, evicted P{} page {} from frame {}",
            victim.pid, victim.vpn, frame
        ),
    }
}

fn print_header(args: &Args) {
    println!("# OS Simulation\n");
    print_row_header("## Conditions");
    print_row("Total memory (KB)", &TOTAL_MEMORY_SIZE);
    print_row("Page size (KB)", &PAGE_SIZE);
    print_row("Frame count", &FRAME_COUNT);
    print_row("Max pages/process", &MAX_PAGES_PER_PROCESS);
    print_row("Requested quantum", &args.quantum);
    print_row("Workload seed", &args.seed);
    println!();
}

fn print_schedule(report: &ScheduleReport) {
    println!("## Round robin (quantum {})", report.quantum);
    for event in &report.events {
        match event {
            ScheduleEvent::Dispatch {
                start,
                pid,
                ran_for,
                remaining,
            } => println!(
                "- t={}: PID {} ran {} (remaining {})",
                start, pid, ran_for, remaining
            ),
            ScheduleEvent::Idle { from, to } => println!("- CPU idle from {} to {}", from, to),
        }
    }
    println!();

    println!("| PID | Arrival | Burst | Completion | Turnaround | Waiting |");
    println!("| --- | ------- | ----- | ---------- | ---------- | ------- |");
    for row in &report.processes {
        println!(
            "| {} | {} | {} | {} | {} | {} |",
            row.pid,
            row.arrival_time,
            row.burst_time,
            row.completion_time,
            row.turnaround_time,
            row.waiting_time
        );
    }
    println!();
    print_row_header("## Averages");
    print_row("Turnaround time", &format!("{:.2}", report.average_turnaround));
    print_row("Waiting time", &format!("{:.2}", report.average_waiting));
    println!();
}

fn print_snapshot(snapshot: &MemorySnapshot) {
    print_row_header("## Frames");
    for (idx, frame) in snapshot.frames.iter().enumerate() {
        let value = match frame {
            Some(resident) => format!("P{} | page {}", resident.pid, resident.vpn),
            None => "free".to_string(),
        };
        print_row(&format!("Frame {}", idx), &value);
    }
    println!();

    for table in &snapshot.processes {
        println!(
            "## Page table of PID {} ({} pages)",
            table.pid, table.pages_requested
        );
        println!("| {:<8} | {:<5} | {:<10} |", "Page", "Valid", "Frame");
        println!("| {:-<8} | {:-<5} | {:-<10} |", "-", "-", "-");
        for (page, pte) in table.entries.iter().enumerate() {
            let frame = pte.pfn.map_or("-".to_string(), |pfn| pfn.to_string());
            println!("| {:<8} | {:<5} | {:<10} |", page, pte.valid, frame);
        }
        println!();
    }
    print_row("Total page faults", &snapshot.fault_count);
    println!();
}

fn print_report(stats: &SimStats) {
    print_row_header("## Random workload (FIFO)");
    print_row("Memory accesses", &stats.accesses);
    print_row("Page hits", &stats.hits);
    print_row("Page faults", &stats.faults);
    print_row("Evictions", &stats.evictions);
    print_row("Hit rate", &format!("{:.2}%", stats.hit_rate()));
    print_row("Miss rate", &format!("{:.2}%", stats.miss_rate()));
    println!();
}

fn print_row_header(title: &str) {
    println!("{}", title);
    println!("| {:<20} | {:<20} |", "Metric", "Value");
    println!("| {:-<20} | {:-<20} |", "-", "-");
}

fn print_row(label: &str, value: &dyn std::fmt::Display) {
    println!("| {:<20} | {:<20} |", label, value);
}
