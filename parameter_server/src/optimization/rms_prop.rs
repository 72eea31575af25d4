use super::Optimizer;
use crate::storage::{Result, SizeMismatchErr};

/// RMSProp with momentum, the statistics are kept on the master so every worker
/// replica's gradient feeds the same running averages.
///
/// ```text
/// ms  = decay * ms + (1 - decay) * g²
/// mom = momentum * mom + lr * g / sqrt(ms + epsilon)
/// p  -= mom
/// ```
#[derive(Debug)]
pub struct RmsProp {
    learning_rate: f32,
    decay: f32,
    momentum: f32,
    epsilon: f32,
    ms: Box<[f32]>,
    mom: Box<[f32]>,
}

impl RmsProp {
    /// Creates a new `RmsProp` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance holds statistics for.
    /// * `learning_rate` - The step size.
    /// * `decay` - Discount of the running mean square.
    /// * `momentum` - Decay of the accumulated update.
    /// * `epsilon` - Added to the mean square before the square root.
    pub fn new(len: usize, learning_rate: f32, decay: f32, momentum: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            decay,
            momentum,
            epsilon,
            ms: vec![0.; len].into_boxed_slice(),
            mom: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for RmsProp {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || grad.len() != self.ms.len() {
            return Err(SizeMismatchErr);
        }

        let Self {
            learning_rate: lr,
            decay,
            momentum,
            epsilon: eps,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.ms.iter_mut().zip(self.mom.iter_mut()))
            .for_each(|((p, g), (ms, mom))| {
                *ms = decay * *ms + (1. - decay) * g * g;
                *mom = momentum * *mom + lr * g / (*ms + eps).sqrt();
                *p -= *mom;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hand_computed_step() {
        let mut optimizer = RmsProp::new(1, 0.1, 0.9, 0., 0.);
        let mut params = [1.];

        optimizer.update_params(&[2.], &mut params).unwrap();

        // ms = 0.1 * 4 = 0.4, step = 0.1 * 2 / sqrt(0.4)
        let expected = 1. - 0.2 / 0.4f32.sqrt();
        assert!((params[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn zero_gradient_keeps_params_without_momentum() {
        let mut optimizer = RmsProp::new(2, 0.1, 0.99, 0., 0.1);
        let mut params = [0.3, -0.7];

        optimizer.update_params(&[0., 0.], &mut params).unwrap();
        assert_eq!(params, [0.3, -0.7]);
    }

    #[test]
    fn size_mismatch() {
        let mut optimizer = RmsProp::new(2, 0.1, 0.99, 0., 0.1);
        assert!(optimizer.update_params(&[0.; 3], &mut [0.; 3]).is_err());
    }
}
