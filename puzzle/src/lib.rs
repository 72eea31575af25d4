//! Configuration space of a rigid robot inside a scene.
//!
//! The renderer and collision engine are collaborators behind the `Scene` trait, this
//! crate only knows how configurations move and how to sample them.

mod action;
mod box_puzzle;
mod error;
mod sample;
mod scene;
mod state;
mod transit;

pub use action::{Action, Motion, NUM_ACTIONS};
pub use box_puzzle::{BoxPuzzle, Wall};
pub use error::{PuzzleErr, Result};
pub use sample::{TouchSample, random_state, restart, sample_touch};
pub use scene::Scene;
pub use state::{STATE_LEN, State};
pub use transit::{Transition, transit_state};
