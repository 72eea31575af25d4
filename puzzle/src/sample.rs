use std::f32::consts::TAU;

use glam::Vec3;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{PuzzleErr, Result, Scene, State, transit::march};

const MAX_RESTART_ATTEMPTS: usize = 100_000;

/// A configuration uniformly sampled in `[-1, 1]³` with a uniformly random
/// rotation (Shoemake's method).
pub fn random_state<R: Rng + ?Sized>(rng: &mut R) -> State {
    let tr: [f32; 3] = [
        rng.random_range(-1.0..=1.0),
        rng.random_range(-1.0..=1.0),
        rng.random_range(-1.0..=1.0),
    ];
    let (u1, u2, u3): (f32, f32, f32) = (rng.random(), rng.random(), rng.random());

    let (a, b) = ((1. - u1).sqrt(), u1.sqrt());
    State::new([
        tr[0],
        tr[1],
        tr[2],
        a * (TAU * u2).sin(),
        a * (TAU * u2).cos(),
        b * (TAU * u3).sin(),
        b * (TAU * u3).cos(),
    ])
}

/// Samples configurations until one is valid and not yet disentangled.
///
/// # Returns
/// A `NoValidState` error if the scene has no such configuration in reach of
/// `random_state`.
pub fn restart<S, R>(scene: &S, rng: &mut R) -> Result<State>
where
    S: Scene + ?Sized,
    R: Rng + ?Sized,
{
    for attempt in 1..=MAX_RESTART_ATTEMPTS {
        let state = random_state(rng);
        if scene.is_valid(&state) && !scene.is_disentangled(&state) {
            debug!(attempts = attempt; "restarted episode");
            return Ok(state);
        }
    }

    Err(PuzzleErr::NoValidState {
        attempts: MAX_RESTART_ATTEMPTS,
    })
}

/// A pair of configurations straddling the boundary of the free space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    /// The last valid configuration before the contact.
    pub free: State,
    /// The first colliding configuration.
    pub touch: State,
    /// Nothing was hit within reach, `free` and `touch` are both the farthest point.
    pub is_inf: bool,
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );

        let len = v.length();
        if len > 1e-3 && len <= 1. {
            return v / len;
        }
    }
}

/// Marches from `key` along a random translation direction in steps of
/// `resolution` until the first colliding configuration or until `reach`.
///
/// # Returns
/// An `InvalidKey` error if `key` itself collides.
pub fn sample_touch<S, R>(
    scene: &S,
    key: &State,
    rng: &mut R,
    resolution: f32,
    reach: f32,
) -> Result<TouchSample>
where
    S: Scene + ?Sized,
    R: Rng + ?Sized,
{
    if !scene.is_valid(key) {
        return Err(PuzzleErr::InvalidKey);
    }

    if resolution <= 0. || reach <= 0. {
        return Err(PuzzleErr::InvalidGeometry(format!(
            "resolution {resolution} and reach {reach} must be positive"
        )));
    }

    let dir = random_direction(rng);
    let (origin, rotation) = (key.translation(), key.rotation());
    let at = |t: f32| State::from_parts(origin + dir * t, rotation);

    let mut free = *key;

    for t in march(reach, resolution) {
        let candidate = at(t);

        if !scene.is_valid(&candidate) {
            return Ok(TouchSample {
                free,
                touch: candidate,
                is_inf: false,
            });
        }

        free = candidate;
    }

    Ok(TouchSample {
        free,
        touch: free,
        is_inf: true,
    })
}

#[cfg(test)]
mod tests {
    use glam::Quat;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::BoxPuzzle;

    #[test]
    fn random_states_are_unit_quaternions_in_the_unit_cube() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..1000 {
            let state = random_state(&mut rng);
            let raw = state.as_array();

            assert!(raw[..3].iter().all(|c| (-1.0..=1.0).contains(c)));
            let norm: f32 = raw[3..].iter().map(|c| c * c).sum();
            assert!((norm - 1.).abs() < 1e-4);
        }
    }

    #[test]
    fn restart_lands_inside_the_box() {
        let puzzle = BoxPuzzle::new(0.5, 0.1, 0.2, 1.).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let state = restart(&puzzle, &mut rng).unwrap();
            assert!(puzzle.is_valid(&state));
            assert!(!puzzle.is_disentangled(&state));
        }
    }

    #[test]
    fn touch_straddles_the_boundary() {
        let puzzle = BoxPuzzle::new(0.5, 0.1, 0.05, 1.).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let key = State::IDENTITY;

        let mut hits = 0;
        for _ in 0..50 {
            let sample = sample_touch(&puzzle, &key, &mut rng, 0.01, 5.).unwrap();
            if sample.is_inf {
                continue;
            }

            hits += 1;
            assert!(puzzle.is_valid(&sample.free));
            assert!(!puzzle.is_valid(&sample.touch));
            let step = sample.free.translation().distance(sample.touch.translation());
            assert!(step <= 0.0101);
        }

        assert!(hits > 40);
    }

    #[test]
    fn colliding_key_is_rejected() {
        let puzzle = BoxPuzzle::new(0.5, 0.1, 0.2, 1.).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let key = State::from_parts(Vec3::new(0., 0.55, 0.), Quat::IDENTITY);

        let err = sample_touch(&puzzle, &key, &mut rng, 0.01, 1.).unwrap_err();
        assert_eq!(err, PuzzleErr::InvalidKey);
    }
}
