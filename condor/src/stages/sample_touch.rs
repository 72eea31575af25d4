use puzzle::{State, sample_touch};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    partition::TaskChunk,
    stage::{Stage, StageName},
    workspace::Workspace,
};

pub const TOUCH_SCRATCH: &str = "condor_scratch/training_key_touch";

/// One contact found by marching away from a key configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchRecord {
    /// Index of the key configuration the sample started from.
    pub from_index: usize,
    pub from: State,
    pub free: State,
    pub touch: State,
    pub is_inf: bool,
}

/// Draws `touch_samples` contacts per key configuration, the task grid is
/// `(keys, touch_samples)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleTouch;

impl Stage for SampleTouch {
    type Record = TouchRecord;

    fn name(&self) -> StageName {
        StageName::SampleTouch
    }

    fn scratch(&self) -> &'static str {
        TOUCH_SCRATCH
    }

    fn prefix(&self) -> &'static str {
        "touchq_batch"
    }

    fn task_shape(&self, ws: &Workspace) -> Result<Vec<usize>> {
        Ok(vec![ws.keys()?.len(), ws.config().touch_samples])
    }

    fn granularity(&self, ws: &Workspace) -> usize {
        ws.config().touch_sample_granularity
    }

    fn run_chunk(&self, ws: &Workspace, chunk: &TaskChunk, task_id: usize) -> Result<Vec<TouchRecord>> {
        let scene = ws.scene()?;
        let keys = ws.keys()?;
        let config = ws.config();
        // Seeded per chunk so a rerun reproduces its file.
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(task_id as u64));

        chunk
            .indices()
            .map(|index| {
                let from_index = index[0];
                let from = keys[from_index];
                let sample = sample_touch(
                    &scene,
                    &from,
                    &mut rng,
                    config.touch_resolution,
                    config.touch_reach,
                )?;

                Ok(TouchRecord {
                    from_index,
                    from,
                    free: sample.free,
                    touch: sample.touch,
                    is_inf: sample.is_inf,
                })
            })
            .collect()
    }
}
