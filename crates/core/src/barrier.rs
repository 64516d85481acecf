//! Reusable round-counting thread rendezvous.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A barrier that can be reused for any number of rounds.
///
/// The last thread to arrive bumps the round counter, resets the waiter
/// count and wakes everyone; earlier arrivals sleep until the round they
/// observed on entry is over.
pub(crate) struct Barrier {
    state: Mutex<State>,
    cond: Condvar,
}

struct State {
    waiting: usize,
    round: u64,
}

impl Barrier {
    pub fn new() -> Self {
        Barrier {
            state: Mutex::new(State { waiting: 0, round: 0 }),
            cond: Condvar::new(),
        }
    }

    /// Blocks until `parties` threads have called `wait` for the current
    /// round.
    pub fn wait(&self, parties: usize) {
        let mut state = recover(self.state.lock());
        state.waiting += 1;
        if state.waiting == parties {
            state.round = state.round.wrapping_add(1);
            state.waiting = 0;
            self.cond.notify_all();
        } else {
            let round = state.round;
            while state.round == round {
                state = recover(self.cond.wait(state));
            }
        }
    }
}

// A poisoned lock only means some peer panicked mid-round; the counters are
// still consistent, so keep going and let the panic surface at join.
fn recover<'a>(
    result: Result<MutexGuard<'a, State>, PoisonError<MutexGuard<'a, State>>>,
) -> MutexGuard<'a, State> {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn all_threads_cross_every_round_together() {
        const THREADS: usize = 4;
        const ROUNDS: usize = 5;

        let barrier = Barrier::new();
        let arrived = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for round in 1..=ROUNDS {
                        arrived.fetch_add(1, Ordering::SeqCst);
                        barrier.wait(THREADS);
                        // Everyone from this round has arrived by now.
                        assert!(arrived.load(Ordering::SeqCst) >= round * THREADS);
                        barrier.wait(THREADS);
                    }
                });
            }
        });

        assert_eq!(arrived.load(Ordering::SeqCst), THREADS * ROUNDS);
    }

    #[test]
    fn single_party_never_blocks() {
        let barrier = Barrier::new();
        for _ in 0..3 {
            barrier.wait(1);
        }
    }
}
