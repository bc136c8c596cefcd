//! # Concurrency Tests using Loom
//!
//! Models the scheduler's cancellation hierarchy: a run token with one child
//! token per job. A job's own cancellation (its timeout) must never reach a
//! sibling, while cancelling the run token (fail-fast) reaches every job.

#[cfg(test)]
mod tests {
    use loom::sync::Arc;
    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::thread;
    use tokio_util::sync::CancellationToken;

    // Loom's exhaustive exploration recurses deeply.
    const STACK_SIZE: usize = 8 * 1024 * 1024;

    fn run_in_large_stack<F: FnOnce() + Send + 'static>(name: &str, f: F) {
        std::thread::Builder::new()
            .name(name.into())
            .stack_size(STACK_SIZE)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap();
    }

    /// One job times out and cancels its own token while a sibling runs.
    /// The sibling must always complete.
    #[test]
    fn test_job_timeout_is_isolated_from_siblings() {
        run_in_large_stack("loom-timeout-isolation", || {
            loom::model(|| {
                let run_token = CancellationToken::new();
                let completed = Arc::new(AtomicUsize::new(0));

                let timed_out = run_token.child_token();
                let sibling = run_token.child_token();

                let t1 = {
                    let timed_out = timed_out.clone();
                    thread::spawn(move || {
                        timed_out.cancel();
                    })
                };
                let t2 = {
                    let completed = completed.clone();
                    thread::spawn(move || {
                        if !sibling.is_cancelled() {
                            completed.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                };

                t1.join().unwrap();
                t2.join().unwrap();

                assert!(timed_out.is_cancelled());
                assert!(!run_token.is_cancelled());
                assert_eq!(completed.load(Ordering::SeqCst), 1);
            });
        });
    }

    /// With fail-fast, the failing job cancels the run token. Siblings race
    /// against it: each either finishes or observes cancellation, and every
    /// job token ends up cancelled.
    #[test]
    fn test_fail_fast_reaches_every_job() {
        run_in_large_stack("loom-fail-fast", || {
            loom::model(|| {
                const NUM_JOBS: usize = 2;
                let run_token = CancellationToken::new();
                let finished = Arc::new(AtomicUsize::new(0));
                let cancelled = Arc::new(AtomicUsize::new(0));

                let job_tokens: Vec<CancellationToken> =
                    (0..NUM_JOBS).map(|_| run_token.child_token()).collect();

                let mut handles = vec![];
                for (i, job_token) in job_tokens.iter().cloned().enumerate() {
                    let run_token = run_token.clone();
                    let finished = finished.clone();
                    let cancelled = cancelled.clone();
                    handles.push(thread::spawn(move || {
                        if job_token.is_cancelled() {
                            cancelled.fetch_add(1, Ordering::SeqCst);
                            return;
                        }
                        finished.fetch_add(1, Ordering::SeqCst);
                        // Job 0 fails.
                        if i == 0 {
                            run_token.cancel();
                        }
                    }));
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                assert!(job_tokens.iter().all(|t| t.is_cancelled()));
                assert_eq!(
                    finished.load(Ordering::SeqCst) + cancelled.load(Ordering::SeqCst),
                    NUM_JOBS
                );
                assert!(finished.load(Ordering::SeqCst) >= 1);
            });
        });
    }
}
