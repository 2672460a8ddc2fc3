//! Bounded worker pool over a shared job queue.
//!
//! Spawns up to `max_concurrent` scoped threads that pull indexed items
//! from one queue and send results back over a channel. Results come back
//! in input order; one slow or failing item never blocks the others from
//! being picked up.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

/// Runs `job` over every item with at most `max_concurrent` running at once.
///
/// The returned vector is index-aligned with `items`. An entry is `None`
/// only if the worker handling it panicked; the remaining items still
/// complete on the surviving workers.
pub fn run_pool<T, R, F>(items: Vec<T>, max_concurrent: usize, job: F) -> Vec<Option<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    if count == 0 {
        return Vec::new();
    }
    let workers = max_concurrent.max(1).min(count);

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel::<(usize, R)>();

    let mut results: Vec<Option<R>> = Vec::with_capacity(count);
    results.resize_with(count, || None);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let job = &job;
            handles.push(scope.spawn(move || loop {
                let next = queue.lock().unwrap().pop_front();
                let Some((index, item)) = next else {
                    break;
                };
                let out = job(item);
                if tx.send((index, out)).is_err() {
                    break;
                }
            }));
        }
        drop(tx);

        // Channel closes once every worker has exited; a panicking worker
        // drops its sender during unwind, so this loop always terminates.
        while let Ok((index, out)) = rx.recv() {
            results[index] = Some(out);
        }

        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("download worker panicked");
            }
        }
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn results_align_with_input_order() {
        let items: Vec<u32> = (0..20).collect();
        let out = run_pool(items, 4, |n| {
            // Reverse the natural completion order a little.
            std::thread::sleep(Duration::from_millis((20 - n as u64) % 5));
            n * 2
        });
        let got: Vec<u32> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(got, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn concurrency_never_exceeds_limit() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items: Vec<u32> = (0..32).collect();
        run_pool(items, 3, |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
        });
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out: Vec<Option<u32>> = run_pool(Vec::<u32>::new(), 8, |n| n);
        assert!(out.is_empty());
    }

    #[test]
    fn single_worker_processes_everything() {
        let out = run_pool(vec!["a", "b", "c"], 1, |s| s.to_uppercase());
        assert_eq!(
            out.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }
}
