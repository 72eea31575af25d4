use parking_lot::{Mutex, RwLock};

use crate::{
    optimization::Optimizer,
    storage::{Result, SizeMismatchErr},
};

/// One contiguous slice of the master replica.
///
/// Gradients are double buffered: workers keep accumulating into the active buffer while
/// the frozen one is being applied and cleared by `update_params`.
#[derive(Debug)]
pub struct BlockingShard<O: Optimizer> {
    nparams: usize,
    grads: [Mutex<Box<[f32]>>; 2],
    params: RwLock<Box<[f32]>>,
    optimizer: Mutex<O>,
}

impl<O: Optimizer> BlockingShard<O> {
    /// Creates a new `BlockingShard`.
    ///
    /// # Arguments
    /// * `params` - The initial parameters of this slice.
    /// * `optimizer` - The optimizer owning this slice's statistics.
    pub fn new(params: Vec<f32>, optimizer: O) -> Self {
        let nparams = params.len();

        Self {
            nparams,
            grads: [
                Mutex::new(vec![0.; nparams].into_boxed_slice()),
                Mutex::new(vec![0.; nparams].into_boxed_slice()),
            ],
            params: RwLock::new(params.into_boxed_slice()),
            optimizer: Mutex::new(optimizer),
        }
    }

    /// Adds `grad` into the gradient buffer at `active_idx` (`0` or `1`).
    pub fn accumulate(&self, active_idx: usize, grad: &[f32]) -> Result<()> {
        if self.nparams != grad.len() {
            return Err(SizeMismatchErr);
        }

        self.grads[active_idx]
            .lock()
            .iter_mut()
            .zip(grad)
            .for_each(|(acc, g)| *acc += g);

        Ok(())
    }

    /// Applies the gradient buffer at `frozen_idx` through the optimizer and zeroes it.
    pub fn update_params(&self, frozen_idx: usize) -> Result<()> {
        let mut grad = self.grads[frozen_idx].lock();
        let mut params = self.params.write();

        self.optimizer.lock().update_params(&grad, &mut params)?;
        grad.fill(0.);
        Ok(())
    }

    /// Copies this slice's parameters into `out`.
    pub fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        if self.nparams != out.len() {
            return Err(SizeMismatchErr);
        }

        out.copy_from_slice(&self.params.read());
        Ok(())
    }
}
