//! Loss and gradient kernels of the actor-critic.
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};
use puzzle::PuzzleErr;

use super::{layout::ParameterLayout, view::ActorCriticView};
use crate::{Result, WorkerErr};

/// Probabilities are clipped to this range before taking their log.
const LOG_CLIP: (f32, f32) = (1e-20, 1.);

/// Weight of the squared value error in the A3C loss.
const VALUE_LOSS_WEIGHT: f32 = 0.25;

/// Numerically stable softmax.
pub fn softmax(mut logits: Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
    logits.mapv_inplace(|z| (z - max).exp());
    let sum = logits.sum();
    logits /= sum;
    logits
}

/// One step of a rollout, ready for the loss.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub obs: &'a [f32],
    pub action: usize,
    /// The advantage, a constant for the gradient.
    pub td: f32,
    /// The discounted return the value head regresses to.
    pub ret: f32,
}

/// Mutable views over a flat gradient buffer, mirroring `ParameterLayout`.
struct Grads<'a> {
    policy_w: ArrayViewMut2<'a, f32>,
    policy_b: ArrayViewMut1<'a, f32>,
    value_w: ArrayViewMut1<'a, f32>,
    value_b: &'a mut f32,
}

impl<'a> Grads<'a> {
    fn split(layout: &ParameterLayout, grad: &'a mut [f32]) -> Result<Self> {
        if grad.len() != layout.len() {
            return Err(WorkerErr::GradientLengthMismatch {
                got: grad.len(),
                expected: layout.len(),
            });
        }

        grad.fill(0.);

        let (policy_w, rest) = grad.split_at_mut(layout.policy_w.len());
        let (policy_b, rest) = rest.split_at_mut(layout.policy_b.len());
        let (value_w, value_b) = rest.split_at_mut(layout.value_w.len());

        Ok(Self {
            policy_w: ArrayViewMut2::from_shape((layout.actions, layout.features), policy_w)?,
            policy_b: ArrayViewMut1::from(policy_b),
            value_w: ArrayViewMut1::from(value_w),
            value_b: &mut value_b[0],
        })
    }
}

/// Computes the A3C loss of `batch` and writes its gradient w.r.t. the parameters
/// viewed by `view` into `grad`.
///
/// loss = sum_t [ -(log pi(a_t) * td_t + beta * H_t) + 0.25 * (R_t - V_t)^2 ]
///
/// with `H = -sum_j pi_j log pi_j`. The policy gradient w.r.t. the logits is
/// `-td * (onehot - pi) + beta * pi * (log pi + H)` and the value gradient w.r.t.
/// `V` is `0.5 * (V - R)`. The value term is half an l2 loss, itself `x^2 / 2`.
///
/// # Returns
/// The total loss of the batch.
pub fn a3c_loss_grad(
    view: &ActorCriticView<'_>,
    batch: &[Sample<'_>],
    entropy_beta: f32,
    grad: &mut [f32],
) -> Result<f32> {
    if batch.is_empty() {
        return Err(WorkerErr::EmptyBatch);
    }

    let layout = view.layout();
    let mut grads = Grads::split(layout, grad)?;
    let mut loss = 0.;

    for sample in batch {
        if sample.action >= layout.actions {
            return Err(PuzzleErr::InvalidAction(sample.action).into());
        }

        let x = ArrayView1::from(sample.obs);
        let (policy, value) = view.forward(x)?;

        let log_pi = policy.mapv(|p| p.clamp(LOG_CLIP.0, LOG_CLIP.1).ln());
        let entropy = -(&policy * &log_pi).sum();

        let policy_loss = -(log_pi[sample.action] * sample.td + entropy_beta * entropy);
        let value_loss = VALUE_LOSS_WEIGHT * (sample.ret - value).powi(2);
        loss += policy_loss + value_loss;

        let mut dlogits = &policy * &(&log_pi + entropy) * entropy_beta;
        for (j, (d, &p)) in dlogits.iter_mut().zip(&policy).enumerate() {
            let onehot = if j == sample.action { 1. } else { 0. };
            *d -= sample.td * (onehot - p);
        }

        for (mut row, &d) in grads.policy_w.rows_mut().into_iter().zip(&dlogits) {
            row.scaled_add(d, &x);
        }
        grads.policy_b += &dlogits;

        let dv = 2. * VALUE_LOSS_WEIGHT * (value - sample.ret);
        grads.value_w.scaled_add(dv, &x);
        *grads.value_b += dv;
    }

    Ok(loss)
}

/// Computes `0.5 * sum (target - V)^2` over the rows of `xs` and writes its
/// gradient into `grad`. Only the value head receives a gradient.
///
/// # Returns
/// The total loss of the batch.
pub fn value_loss_grad(
    view: &ActorCriticView<'_>,
    xs: ArrayView2<'_, f32>,
    targets: ArrayView1<'_, f32>,
    grad: &mut [f32],
) -> Result<f32> {
    if xs.nrows() == 0 {
        return Err(WorkerErr::EmptyBatch);
    }

    let mut grads = Grads::split(view.layout(), grad)?;
    let mut loss = 0.;

    for (x, &target) in xs.rows().into_iter().zip(&targets) {
        let value = view.value(x)?;
        let dv = value - target;
        loss += 0.5 * dv * dv;

        grads.value_w.scaled_add(dv, &x);
        *grads.value_b += dv;
    }

    Ok(loss)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use comms::specs::worker::ModelSpec;
    use ndarray::{Array2, array};

    use super::*;

    fn layout(features: usize, actions: usize) -> ParameterLayout {
        ParameterLayout::new(ModelSpec {
            features: NonZeroUsize::new(features).unwrap(),
            actions: NonZeroUsize::new(actions).unwrap(),
        })
    }

    /// Deterministic, small, non symmetric parameters.
    fn params(n: usize) -> Vec<f32> {
        (0..n).map(|i| ((i * 7 % 11) as f32 - 5.) * 0.07).collect()
    }

    #[test]
    fn softmax_is_a_distribution() {
        let p = softmax(array![1000., 1001., 999.]);

        assert!((p.sum() - 1.).abs() < 1e-6);
        assert!(p[1] > p[0] && p[0] > p[2]);
    }

    #[test]
    fn a3c_gradient_matches_finite_differences() {
        let layout = layout(3, 4);
        let mut params = params(layout.len());

        let obs = [[0.5, -0.3, 0.8], [-0.2, 0.9, 0.1], [0.0, 0.4, -0.6]];
        let batch = [
            Sample {
                obs: &obs[0],
                action: 1,
                td: 0.7,
                ret: 0.4,
            },
            Sample {
                obs: &obs[1],
                action: 3,
                td: -0.5,
                ret: -0.1,
            },
            Sample {
                obs: &obs[2],
                action: 0,
                td: 0.2,
                ret: 0.9,
            },
        ];
        let beta = 0.01;

        let mut grad = vec![0.; layout.len()];
        let view = ActorCriticView::new(&params, &layout).unwrap();
        a3c_loss_grad(&view, &batch, beta, &mut grad).unwrap();

        let mut scratch = vec![0.; layout.len()];
        let eps = 1e-3;
        for i in 0..layout.len() {
            let orig = params[i];

            params[i] = orig + eps;
            let view = ActorCriticView::new(&params, &layout).unwrap();
            let up = a3c_loss_grad(&view, &batch, beta, &mut scratch).unwrap();

            params[i] = orig - eps;
            let view = ActorCriticView::new(&params, &layout).unwrap();
            let down = a3c_loss_grad(&view, &batch, beta, &mut scratch).unwrap();

            params[i] = orig;

            let numeric = (up - down) / (2. * eps);
            assert!(
                (numeric - grad[i]).abs() < 5e-3,
                "param {i}: analytic {} numeric {numeric}",
                grad[i]
            );
        }
    }

    #[test]
    fn a3c_value_gradient_is_half_the_regression_error() {
        let layout = layout(2, 2);
        let params = params(layout.len());
        let view = ActorCriticView::new(&params, &layout).unwrap();
        let obs = [1., 0.];
        let batch = [Sample {
            obs: &obs,
            action: 0,
            td: 0.,
            ret: 2.,
        }];

        let mut grad = vec![0.; layout.len()];
        a3c_loss_grad(&view, &batch, 0., &mut grad).unwrap();

        let value = view.value(ArrayView1::from(&obs[..])).unwrap();
        let dv = 0.5 * (value - 2.);
        assert!((grad[layout.value_w.start] - dv).abs() < 1e-6);
        assert_eq!(grad[layout.value_w.start + 1], 0.);
        assert!((grad[layout.value_b.start] - dv).abs() < 1e-6);
    }

    #[test]
    fn value_gradient_only_touches_value_head() {
        let layout = layout(2, 3);
        let params = params(layout.len());
        let view = ActorCriticView::new(&params, &layout).unwrap();

        let xs = Array2::from_shape_vec((2, 2), vec![1., 0., 0., 1.]).unwrap();
        let targets = array![1., 2.];
        let mut grad = vec![9.; layout.len()];

        let loss = value_loss_grad(&view, xs.view(), targets.view(), &mut grad).unwrap();

        let v0 = view.value(xs.row(0)).unwrap();
        let v1 = view.value(xs.row(1)).unwrap();
        let expected = 0.5 * ((1. - v0).powi(2) + (2. - v1).powi(2));
        assert!((loss - expected).abs() < 1e-6);

        assert!(grad[..layout.value_w.start].iter().all(|&g| g == 0.));
        assert!((grad[layout.value_w.start] - (v0 - 1.)).abs() < 1e-6);
        assert!((grad[layout.value_w.start + 1] - (v1 - 2.)).abs() < 1e-6);
        assert!((grad[layout.value_b.start] - (v0 - 1. + v1 - 2.)).abs() < 1e-6);
    }

    #[test]
    fn wrong_sizes_are_errors() {
        let layout = layout(2, 2);
        let params = params(layout.len());
        let view = ActorCriticView::new(&params, &layout).unwrap();
        let obs = [1., 2., 3.];
        let batch = [Sample {
            obs: &obs,
            action: 0,
            td: 1.,
            ret: 1.,
        }];

        let mut grad = vec![0.; layout.len()];
        assert!(matches!(
            a3c_loss_grad(&view, &batch, 0., &mut grad),
            Err(WorkerErr::ObservationMismatch { .. })
        ));

        let mut short = vec![0.; 1];
        assert!(matches!(
            a3c_loss_grad(&view, &batch, 0., &mut short),
            Err(WorkerErr::GradientLengthMismatch { .. })
        ));

        assert!(matches!(
            a3c_loss_grad(&view, &[], 0., &mut grad),
            Err(WorkerErr::EmptyBatch)
        ));
    }
}
