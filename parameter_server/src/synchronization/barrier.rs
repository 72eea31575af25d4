use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::Synchronizer;
use crate::storage::{Result, Store, StoreHandle};

#[derive(Debug)]
struct Round {
    size: usize,
    remaining: usize,
    arrived: usize,
    closing: bool,
    generation: u64,
}

impl Round {
    fn threshold(&self) -> usize {
        self.size.min(self.remaining).max(1)
    }

    fn is_complete(&self) -> bool {
        !self.closing && self.arrived > 0 && self.arrived >= self.threshold()
    }
}

/// A barrier whose group shrinks as workers leave the training.
///
/// The party completing a round becomes its leader and must call `release` once
/// the update is applied, until then nobody else proceeds.
#[derive(Debug)]
struct Rendezvous {
    round: Mutex<Round>,
    released: watch::Sender<u64>,
}

impl Rendezvous {
    fn new(size: usize, workers: usize) -> Self {
        let round = Round {
            size,
            remaining: workers,
            arrived: 0,
            closing: false,
            generation: 0,
        };

        Self {
            round: Mutex::new(round),
            released: watch::Sender::new(0),
        }
    }

    /// Joins the current round, returns `true` for its leader.
    async fn arrive(&self) -> bool {
        loop {
            let (generation, joined) = {
                let mut round = self.round.lock();
                let joined = !round.closing;

                if joined {
                    round.arrived += 1;
                    if round.is_complete() {
                        round.closing = true;
                        return true;
                    }
                }
                (round.generation, joined)
            };

            self.released_after(generation).await;
            // Otherwise a full round was being applied and this arrival belongs
            // to the next one.
            if joined {
                return false;
            }
        }
    }

    /// Leaves the group for good, returns `true` if that completed the round and
    /// the caller must lead it.
    fn leave(&self) -> bool {
        let mut round = self.round.lock();
        round.remaining = round.remaining.saturating_sub(1);

        if round.is_complete() {
            round.closing = true;
            return true;
        }
        false
    }

    fn release(&self) {
        let mut round = self.round.lock();
        round.arrived = 0;
        round.closing = false;
        round.generation += 1;
        self.released.send_replace(round.generation);
    }

    async fn released_after(&self, generation: u64) {
        let mut rx = self.released.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|&current| current != generation).await;
    }
}

/// Synchronous updates, waits for `barrier_size` gradients before a single leader
/// applies them, then every participant pulls the same parameters.
///
/// Workers that disconnect leave the group, a round needs at most as many
/// gradients as there are workers left. A worker that crashes without
/// disconnecting still stalls the whole step.
#[derive(Clone)]
pub struct BarrierSync {
    rendezvous: Arc<Rendezvous>,
}

impl BarrierSync {
    /// Creates a new `BarrierSync` synchronizer.
    ///
    /// # Arguments
    /// * `barrier_size` - The amount of gradients applied together in every step.
    /// * `workers` - The amount of workers that will connect.
    pub fn new(barrier_size: usize, workers: usize) -> Self {
        Self {
            rendezvous: Arc::new(Rendezvous::new(barrier_size, workers)),
        }
    }

    async fn lead<S>(&self, handle: &StoreHandle<S>) -> Result<()>
    where
        S: Store + Send + Sync,
    {
        let applied = handle.update_params().await;
        self.rendezvous.release();
        applied
    }
}

impl Synchronizer for BarrierSync {
    async fn step<S>(&self, handle: &StoreHandle<S>, grad: &[f32], params: &mut [f32]) -> Result<()>
    where
        S: Store + Send + Sync,
    {
        let accumulated = handle.accumulate(grad).await;

        let applied = if self.rendezvous.arrive().await {
            self.lead(handle).await
        } else {
            Ok(())
        };

        accumulated?;
        applied?;
        handle.pull_params(params).await
    }

    async fn leave<S>(&self, handle: &StoreHandle<S>) -> Result<()>
    where
        S: Store + Send + Sync,
    {
        if self.rendezvous.leave() {
            self.lead(handle).await?;
        }
        Ok(())
    }
}
