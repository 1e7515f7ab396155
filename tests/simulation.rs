use rand::{SeedableRng, rngs::StdRng};

use os_sim::{
    AccessOutcome, Eviction, MemoryError, MemoryManager, Pid, Process, run_round_robin,
    config::{FRAME_COUNT, MAX_PAGES_PER_PROCESS, MemoryConfig},
    memory::Resident,
    paging::{Pfn, Vpn},
    workload::{Request, Workload},
};

fn assert_conservation(mm: &MemoryManager) {
    let snapshot = mm.snapshot_status();
    let occupied: Vec<(usize, Resident)> = snapshot
        .frames
        .iter()
        .enumerate()
        .filter_map(|(idx, frame)| frame.map(|resident| (idx, resident)))
        .collect();
    let valid: usize = snapshot
        .processes
        .iter()
        .map(|table| table.entries.iter().filter(|pte| pte.valid).count())
        .sum();
    assert_eq!(occupied.len(), valid);

    for (idx, resident) in occupied {
        let matches = snapshot
            .processes
            .iter()
            .filter(|table| table.pid == resident.pid)
            .flat_map(|table| table.entries.iter().enumerate())
            .filter(|(page, pte)| pte.valid && pte.pfn == Some(Pfn(idx)) && *page == resident.vpn.0)
            .count();
        assert_eq!(matches, 1, "frame {} has no single matching entry", idx);
    }
}

#[test]
fn round_robin_reference_scenario() {
    let processes = vec![
        Process::new(Pid(1), 0, 10),
        Process::new(Pid(2), 1, 5),
        Process::new(Pid(3), 2, 8),
    ];
    let report = run_round_robin(&processes, 4).unwrap();

    let rows: Vec<(usize, u64, u64, u64)> = report
        .processes
        .iter()
        .map(|r| (r.pid.0, r.completion_time, r.turnaround_time, r.waiting_time))
        .collect();
    assert_eq!(rows, vec![(1, 23, 23, 13), (2, 17, 16, 11), (3, 21, 19, 11)]);
    assert_eq!(format!("{:.2}", report.average_turnaround), "19.33");
    assert_eq!(format!("{:.2}", report.average_waiting), "11.67");
}

#[test]
fn paging_reference_scenario() {
    assert_eq!(FRAME_COUNT, 8);

    let mut mm: MemoryManager = MemoryManager::default();
    mm.init_memory();
    mm.request_memory(Pid(1), 9).unwrap();

    for page in 0..8 {
        let outcome = mm.access_memory(Pid(1), Vpn(page)).unwrap();
        assert_eq!(
            outcome,
            AccessOutcome::Fault {
                frame: Pfn(page),
                evicted: None
            }
        );
    }
    assert_eq!(
        mm.access_memory(Pid(1), Vpn(8)).unwrap(),
        AccessOutcome::Fault {
            frame: Pfn(0),
            evicted: Some(Eviction {
                pid: Pid(1),
                vpn: Vpn(0)
            })
        }
    );
    assert_eq!(mm.fault_count(), 9);

    let outcome = mm.access_memory(Pid(1), Vpn(0)).unwrap();
    assert!(outcome.is_fault());
    assert_eq!(
        outcome,
        AccessOutcome::Fault {
            frame: Pfn(1),
            evicted: Some(Eviction {
                pid: Pid(1),
                vpn: Vpn(1)
            })
        }
    );
    assert_conservation(&mm);
}

#[test]
fn boundary_page_counts_are_rejected() {
    let mut mm: MemoryManager = MemoryManager::default();
    mm.init_memory();

    for pages in [0, MAX_PAGES_PER_PROCESS + 1] {
        let err = mm.request_memory(Pid(42), pages).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidPageCount { .. }));
        assert_eq!(mm.process(Pid(42)).unwrap().pages_requested, 0);
    }
}

#[test]
fn failed_admissions_leave_room_for_valid_ones() {
    let mut mm: MemoryManager = MemoryManager::default();
    mm.init_memory();
    let limit = mm.config().max_tracked_processes;

    for pid in 1..=limit {
        assert!(mm.request_memory(Pid(pid), MAX_PAGES_PER_PROCESS + 1).is_err());
    }
    for pid in limit + 1..=2 * limit {
        mm.request_memory(Pid(pid), 3).unwrap();
    }
    assert_eq!(
        mm.request_memory(Pid(2 * limit + 1), 0),
        Err(MemoryError::InvalidPageCount {
            pid: Pid(2 * limit + 1),
            requested: 0,
            max: MAX_PAGES_PER_PROCESS
        })
    );
    assert_eq!(
        mm.request_memory(Pid(2 * limit + 1), 1),
        Err(MemoryError::ProcessTableFull { capacity: limit })
    );

    mm.access_memory(Pid(limit + 1), Vpn(0)).unwrap();
    assert_eq!(mm.frame_table().occupied_count(), 1);
    assert_conservation(&mm);
}

#[test]
fn random_multi_process_workload_keeps_frames_consistent() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut mm = MemoryManager::fifo(MemoryConfig::with_frame_count(6));
    mm.init_memory();

    let mut workloads = vec![];
    for i in 1..=4 {
        mm.request_memory(Pid(i), 5 + i).unwrap();
        workloads.push(Workload::new(Pid(i), 5 + i, 2, 300, 40, &mut rng));
    }

    let mut faults = 0;
    let mut last_fill_order = vec![];
    for _ in 0..300 {
        for workload in workloads.iter_mut() {
            let Request::MemoryReference { vpn } = workload.request(&mut rng) else {
                continue;
            };
            let before = mm.fault_count();
            let outcome = mm.access_memory(workload.pid, vpn).unwrap();

            match outcome {
                AccessOutcome::Hit { .. } => assert_eq!(mm.fault_count(), before),
                AccessOutcome::Fault { frame, evicted } => {
                    faults += 1;
                    assert_eq!(mm.fault_count(), before + 1);
                    if let Some(victim) = evicted {
                        // The victim is the page that was loaded earliest among residents.
                        assert_eq!(last_fill_order.first(), Some(&(victim.pid, victim.vpn)));
                        last_fill_order.remove(0);
                    }
                    last_fill_order.push((workload.pid, vpn));
                    assert_eq!(
                        mm.snapshot_status().frames[frame.0],
                        Some(Resident {
                            pid: workload.pid,
                            vpn
                        })
                    );
                }
            }
            assert_conservation(&mm);
        }
    }

    assert_eq!(mm.fault_count(), faults);
    assert!(mm.stats().eviction_count > 0);
}
