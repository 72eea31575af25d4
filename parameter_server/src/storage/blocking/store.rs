use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
};

use rayon::prelude::*;

use super::BlockingShard;
use crate::{
    initialization::ParamGen,
    optimization::Optimizer,
    storage::{Result, SizeMismatchErr, Store},
};

/// Partitions the master replica in shards and works on them in parallel with rayon.
///
/// Accumulating and pulling only take per shard locks, a single `updating` flag makes
/// sure only one caller at a time flips the active gradient buffer and applies the
/// frozen one.
#[derive(Debug)]
pub struct BlockingStore<O: Optimizer> {
    nparams: usize,
    active_idx: AtomicU8,
    updating: AtomicBool,
    shards: Box<[BlockingShard<O>]>,
    shard_size: NonZeroUsize,
}

impl<O: Optimizer> BlockingStore<O> {
    /// Creates a new `BlockingStore`, draining `param_gen` shard by shard.
    ///
    /// # Arguments
    /// * `shard_size` - The maximum amount of parameters per shard.
    /// * `param_gen` - The initial parameters source.
    /// * `optimizer_factory` - Builds the optimizer of a shard given its length.
    pub fn new<PG, OF>(shard_size: NonZeroUsize, mut param_gen: PG, mut optimizer_factory: OF) -> Self
    where
        PG: ParamGen,
        OF: FnMut(usize) -> O,
    {
        let mut nparams = 0;
        let mut shards = Vec::new();

        while let Some(params) = param_gen.sample(shard_size.get()) {
            nparams += params.len();
            let optimizer = optimizer_factory(params.len());
            shards.push(BlockingShard::new(params, optimizer));
        }

        Self {
            nparams,
            active_idx: AtomicU8::new(0),
            updating: AtomicBool::new(false),
            shards: shards.into_boxed_slice(),
            shard_size,
        }
    }

    /// The amount of shards the parameters were split into.
    pub fn nshards(&self) -> usize {
        self.shards.len()
    }
}

impl<O: Optimizer + Send> Store for BlockingStore<O> {
    fn len(&self) -> usize {
        self.nparams
    }

    fn accumulate(&self, grad: &[f32]) -> Result<()> {
        if self.nparams != grad.len() {
            return Err(SizeMismatchErr);
        }

        let active_idx = self.active_idx.load(Ordering::Acquire) as usize;

        self.shards
            .par_iter()
            .zip(grad.par_chunks(self.shard_size.get()))
            .try_for_each(|(shard, grad)| shard.accumulate(active_idx, grad))
    }

    fn update_params(&self) -> Result<()> {
        if self
            .updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Ok(());
        }

        let frozen_idx = self.active_idx.fetch_xor(1, Ordering::AcqRel) as usize;

        let res = self
            .shards
            .par_iter()
            .try_for_each(|shard| shard.update_params(frozen_idx));

        self.updating.store(false, Ordering::Release);
        res
    }

    fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        if self.nparams != out.len() {
            return Err(SizeMismatchErr);
        }

        self.shards
            .par_iter()
            .zip(out.par_chunks_mut(self.shard_size.get()))
            .try_for_each(|(shard, out)| shard.pull_params(out))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::initialization::ConstParamGen;

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
            params.iter_mut().zip(grad).for_each(|(p, g)| *p += g);
            Ok(())
        }
    }

    fn create_test_store(params: usize, shard_size: usize) -> BlockingStore<AddOptimizer> {
        let shard_size = NonZeroUsize::new(shard_size).unwrap();
        let param_gen = ConstParamGen::new(0., params);
        BlockingStore::new(shard_size, param_gen, |_| AddOptimizer)
    }

    #[test]
    fn ragged_last_shard() {
        const PARAMS: usize = 105;

        let store = create_test_store(PARAMS, 10);
        assert_eq!(store.nshards(), 11);

        store.accumulate(&[1.; PARAMS]).unwrap();
        store.update_params().unwrap();

        let mut out = [0.; PARAMS];
        store.pull_params(&mut out).unwrap();
        assert_eq!(out, [1.; PARAMS]);
    }

    #[test]
    fn buffer_swap_defers_late_gradients() {
        const PARAMS: usize = 10;

        let store = create_test_store(PARAMS, 1);
        store.accumulate(&[1.; PARAMS]).unwrap();

        store.update_params().unwrap();
        assert_eq!(store.active_idx.load(Ordering::Acquire), 1);
        store.accumulate(&[5.; PARAMS]).unwrap();

        let mut params = [0.; PARAMS];
        store.pull_params(&mut params).unwrap();
        assert_eq!(params, [1.; PARAMS]);

        store.update_params().unwrap();
        store.pull_params(&mut params).unwrap();
        assert_eq!(params, [6.; PARAMS]);
    }

    #[test]
    fn concurrent_update_is_a_noop() {
        let store = create_test_store(10, 1);
        store.updating.store(true, Ordering::SeqCst);

        let active_idx = store.active_idx.load(Ordering::Acquire);
        store.update_params().unwrap();
        assert_eq!(store.active_idx.load(Ordering::Acquire), active_idx);

        store.updating.store(false, Ordering::Release);
        store.update_params().unwrap();
        assert_ne!(store.active_idx.load(Ordering::SeqCst), active_idx);
    }

    #[test]
    fn size_mismatches() {
        let store = create_test_store(4, 3);

        assert_eq!(store.accumulate(&[1.; 3]), Err(SizeMismatchErr));
        assert_eq!(store.pull_params(&mut [0.; 5]), Err(SizeMismatchErr));
    }

    #[test]
    fn no_gradient_is_lost_under_contention() {
        const PARAMS: usize = 16;
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;

        let store = Arc::new(create_test_store(PARAMS, 5));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        store.accumulate(&[1.; PARAMS]).unwrap();
                        store.update_params().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        store.update_params().unwrap();
        store.update_params().unwrap();

        let mut out = [0.; PARAMS];
        store.pull_params(&mut out).unwrap();
        assert_eq!(out, [(THREADS * ROUNDS) as f32; PARAMS]);
    }
}
