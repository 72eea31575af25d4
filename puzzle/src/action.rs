use glam::Vec3;

use crate::{PuzzleErr, Result};

/// Amount of discrete actions: 3 axes, translate or rotate, both signs.
pub const NUM_ACTIONS: usize = 12;

const ACTIONS_PER_MOTION: usize = 6;

/// Whether an action translates along or rotates around its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Translate,
    Rotate,
}

/// A discrete action index in `0..NUM_ACTIONS`.
///
/// `index / 2` selects the motion (`0..3` translate along X/Y/Z, `3..6` rotate
/// around X/Y/Z) and `index % 2` the sign, `0` being positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action(usize);

impl Action {
    pub fn new(index: usize) -> Result<Self> {
        if index >= NUM_ACTIONS {
            return Err(PuzzleErr::InvalidAction(index));
        }

        Ok(Self(index))
    }

    /// Iterates every action in index order.
    pub fn all() -> impl Iterator<Item = Action> {
        (0..NUM_ACTIONS).map(Self)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    pub fn motion(&self) -> Motion {
        if self.0 < ACTIONS_PER_MOTION {
            Motion::Translate
        } else {
            Motion::Rotate
        }
    }

    /// `1.0` for even indices, `-1.0` for odd ones.
    pub fn sign(&self) -> f32 {
        if self.0 % 2 == 0 { 1. } else { -1. }
    }

    /// The signed unit axis of this action.
    pub fn axis(&self) -> Vec3 {
        let axis = match (self.0 % ACTIONS_PER_MOTION) / 2 {
            0 => Vec3::X,
            1 => Vec3::Y,
            _ => Vec3::Z,
        };

        axis * self.sign()
    }
}

impl TryFrom<usize> for Action {
    type Error = PuzzleErr;

    fn try_from(index: usize) -> Result<Self> {
        Self::new(index)
    }
}
