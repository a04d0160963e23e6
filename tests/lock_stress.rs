//! Lock manager stress test with concurrent no-wait transactions.
//!
//! Workers hammer a small key space with random lock requests. Every
//! call must return promptly (no-wait liveness); a refused worker
//! releases everything and starts a fresh transaction. At the end the
//! lock table must drain to empty.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use granite::heap::Rid;
use granite::tx::{LockError, LockManager, Transaction, TxnId};

/// Configuration for the stress test.
#[derive(Debug, Clone, Copy)]
struct StressConfig {
    /// Concurrent worker threads.
    num_workers: usize,
    /// Transactions each worker runs to completion.
    txns_per_worker: usize,
    /// Lock operations attempted per transaction.
    ops_per_txn: usize,
    /// Distinct tables in the key space.
    num_tables: u32,
    /// Distinct records per table in the key space.
    records_per_table: i32,
}

/// Releases everything `txn` holds and asserts each release succeeds:
/// an owner can always unlock its own locks.
fn release_all(locks: &LockManager, txn: &Transaction) {
    for target in txn.held_locks() {
        locks.unlock(txn, target).expect("owner can always release");
    }
}

fn run_worker(
    locks: Arc<LockManager>,
    ids: Arc<AtomicU64>,
    start: Arc<Barrier>,
    config: StressConfig,
    seed: u64,
) -> (u64, u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut completed = 0u64;
    let mut refused = 0u64;
    start.wait();

    for _ in 0..config.txns_per_worker {
        let txn = Transaction::new(TxnId::new(ids.fetch_add(1, Ordering::Relaxed)));

        for _ in 0..config.ops_per_txn {
            let fd = rng.gen_range(0..config.num_tables);
            let result = match rng.gen_range(0..6) {
                0 => locks.lock_is_on_table(&txn, fd),
                1 => locks.lock_ix_on_table(&txn, fd),
                2 => locks.lock_shared_on_table(&txn, fd),
                3 => locks.lock_exclusive_on_table(&txn, fd),
                4 => {
                    let rid = Rid::new(1, rng.gen_range(0..config.records_per_table));
                    locks.lock_shared_on_record(&txn, rid, fd)
                }
                _ => {
                    let rid = Rid::new(1, rng.gen_range(0..config.records_per_table));
                    locks.lock_exclusive_on_record(&txn, rid, fd)
                }
            };

            match result {
                Ok(()) => {}
                Err(LockError::DeadlockPrevention(_)) => {
                    // No-wait: back off by aborting this transaction.
                    refused += 1;
                    break;
                }
                Err(other) => panic!("unexpected lock failure: {}", other),
            }
        }

        release_all(&locks, &txn);
        assert!(txn.held_locks().is_empty());
        completed += 1;
    }

    (completed, refused)
}

#[test]
fn concurrent_no_wait_traffic_drains_cleanly() {
    let config = StressConfig {
        num_workers: 8,
        txns_per_worker: 200,
        ops_per_txn: 6,
        num_tables: 3,
        records_per_table: 4,
    };

    let locks = Arc::new(LockManager::new());
    let ids = Arc::new(AtomicU64::new(1));
    let start = Arc::new(Barrier::new(config.num_workers));

    let handles: Vec<_> = (0..config.num_workers)
        .map(|worker| {
            let locks = locks.clone();
            let ids = ids.clone();
            let start = start.clone();
            thread::spawn(move || run_worker(locks, ids, start, config, 0xC0FFEE + worker as u64))
        })
        .collect();

    let mut total_completed = 0u64;
    let mut total_refused = 0u64;
    for handle in handles {
        let (completed, refused) = handle.join().expect("worker panicked");
        total_completed += completed;
        total_refused += refused;
    }

    // Every transaction ran to completion (commit-like release), even
    // the ones that were refused mid-way. Refusals vary with thread
    // scheduling, so only their liveness effect is asserted: nothing
    // ever blocked, and nothing is left granted anywhere.
    assert_eq!(
        total_completed,
        (config.num_workers * config.txns_per_worker) as u64
    );
    let _ = total_refused;
    assert!(locks.is_clean());
}

#[test]
fn single_threaded_interleaving_matches_no_wait_rules() {
    let locks = LockManager::new();
    let mut rng = StdRng::seed_from_u64(42);

    // A deterministic interleaving of two transactions over one table:
    // whenever a request succeeds, it must be compatible with what the
    // other transaction holds on the same key.
    for _ in 0..500 {
        let t1 = Transaction::new(TxnId::new(rng.gen_range(1..1_000_000)));
        let t2 = Transaction::new(TxnId::new(1_000_000 + rng.gen_range(1..1_000_000)));

        locks.lock_ix_on_table(&t1, 9).unwrap();
        let r2 = locks.lock_shared_on_table(&t2, 9);
        // IX held by t1 is incompatible with S: t2 must be refused.
        assert_eq!(r2, Err(LockError::DeadlockPrevention(t2.id())));

        let r1 = locks.lock_exclusive_on_table(&t1, 9);
        // Upgrade of t1's own IX to X succeeds; nobody else holds the
        // table.
        assert_eq!(r1, Ok(()));

        release_all(&locks, &t1);
        release_all(&locks, &t2);
    }
    assert!(locks.is_clean());
}
