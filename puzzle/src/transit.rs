use glam::Quat;

use crate::{Action, Motion, Scene, State};

/// The outcome of moving a configuration along an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// The last valid configuration reached.
    pub state: State,
    /// Whether the whole magnitude was travelled.
    pub done: bool,
    /// Fraction of the magnitude travelled, `0.0` when fully blocked.
    pub ratio: f32,
}

/// Applies `action` scaled by `amount` to `state`.
///
/// Rotations are applied in the world frame around the robot's origin.
fn apply(state: &State, action: Action, amount: f32) -> State {
    let axis = action.axis();

    match action.motion() {
        Motion::Translate => State::from_parts(state.translation() + axis * amount, state.rotation()),
        Motion::Rotate => {
            let delta = Quat::from_axis_angle(axis, amount);
            State::from_parts(state.translation(), delta * state.rotation())
        }
    }
}

/// Moves `state` along `action` in increments of `delta` up to `magnitude`,
/// stopping before the first invalid configuration.
///
/// `magnitudes` and `deltas` hold the translation values first and the rotation
/// values second.
pub fn transit_state<S: Scene + ?Sized>(
    scene: &S,
    state: &State,
    action: Action,
    magnitudes: [f32; 2],
    deltas: [f32; 2],
) -> Transition {
    let slot = match action.motion() {
        Motion::Translate => 0,
        Motion::Rotate => 1,
    };
    let (magnitude, delta) = (magnitudes[slot], deltas[slot]);

    if magnitude <= 0. || delta <= 0. {
        return Transition {
            state: *state,
            done: true,
            ratio: 1.,
        };
    }

    let mut reached = *state;
    let mut travelled = 0.;

    for next in march(magnitude, delta) {
        let candidate = apply(state, action, next);

        if !scene.is_valid(&candidate) {
            return Transition {
                state: reached,
                done: false,
                ratio: travelled / magnitude,
            };
        }

        reached = candidate;
        travelled = next;
    }

    Transition {
        state: reached,
        done: true,
        ratio: 1.,
    }
}

/// The distances `delta, 2 * delta, ..` up to and ending at `length`.
///
/// Each distance comes from its step index, so a `delta` below the precision of
/// `length` still ends after `ceil(length / delta)` steps.
pub(crate) fn march(length: f32, delta: f32) -> impl DoubleEndedIterator<Item = f32> {
    let steps = (length / delta).ceil() as usize;
    (1..=steps).map(move |i| if i == steps { length } else { (i as f32 * delta).min(length) })
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::Result;

    /// Free space is `x < wall`.
    struct HalfSpace {
        wall: f32,
    }

    impl Scene for HalfSpace {
        fn is_valid(&self, state: &State) -> bool {
            state.translation().x < self.wall
        }

        fn is_disentangled(&self, _: &State) -> bool {
            false
        }

        fn observation_len(&self) -> usize {
            0
        }

        fn observe(&self, _: &State, _: &mut [f32]) -> Result<()> {
            Ok(())
        }
    }

    const MAGS: [f32; 2] = [0.1, 0.2];
    const DELTAS: [f32; 2] = [0.025, 0.05];

    #[test]
    fn free_translation_travels_whole_magnitude() {
        let scene = HalfSpace { wall: 10. };
        let action = Action::new(0).unwrap();

        let t = transit_state(&scene, &State::IDENTITY, action, MAGS, DELTAS);

        assert!(t.done);
        assert_eq!(t.ratio, 1.);
        assert!((t.state.translation().x - 0.1).abs() < 1e-6);
    }

    #[test]
    fn blocked_translation_stops_before_collision() {
        let scene = HalfSpace { wall: 0.06 };
        let action = Action::new(0).unwrap();

        let t = transit_state(&scene, &State::IDENTITY, action, MAGS, DELTAS);

        assert!(!t.done);
        assert!((t.ratio - 0.5).abs() < 1e-6);
        assert!((t.state.translation().x - 0.05).abs() < 1e-6);
    }

    #[test]
    fn fully_blocked_has_zero_ratio() {
        let scene = HalfSpace { wall: 0.01 };
        let action = Action::new(0).unwrap();

        let t = transit_state(&scene, &State::IDENTITY, action, MAGS, DELTAS);

        assert!(!t.done);
        assert_eq!(t.ratio, 0.);
        assert_eq!(t.state, State::IDENTITY);
    }

    #[test]
    fn rotation_keeps_translation() {
        let scene = HalfSpace { wall: 10. };
        let start = State::from_parts(Vec3::new(0.5, 0., 0.), Quat::IDENTITY);
        let action = Action::new(10).unwrap();

        let t = transit_state(&scene, &start, action, MAGS, DELTAS);

        assert!(t.done);
        assert_eq!(t.state.translation(), start.translation());
        let expected = Quat::from_axis_angle(Vec3::Z, 0.2);
        assert!(t.state.rotation().angle_between(expected) < 1e-4);
    }

    #[test]
    fn march_ends_exactly_at_the_length() {
        let steps: Vec<_> = march(0.1, 0.025).collect();

        assert_eq!(steps.len(), 4);
        assert!((steps[1] - 0.05).abs() < 1e-7);
        assert_eq!(steps.last(), Some(&0.1));
    }

    #[test]
    fn march_is_bounded_for_a_delta_below_the_precision() {
        let mut steps = march(0.1, 1e-10);

        assert_eq!(steps.next_back(), Some(0.1));
        assert!(steps.next().is_some_and(|t| t > 0.));
        let (lower, upper) = steps.size_hint();
        assert_eq!(upper, Some(lower));
        assert!(lower < 2_000_000_000);
    }
}
