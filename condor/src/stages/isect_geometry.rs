use puzzle::{State, Wall};
use serde::{Deserialize, Serialize};

use super::{TOUCH_ALL_FILE, TOUCH_SCRATCH, TouchRecord};
use crate::{
    Result,
    partition::{TaskChunk, padded},
    stage::{Stage, StageName},
    workspace::{Workspace, read_json},
};

pub const ISECT_SCRATCH: &str = "condor_scratch/training_key_isect";

/// The geometry a touch configuration collides with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsectRecord {
    /// The padded index of the touch sample.
    pub key: String,
    pub touch: State,
    pub from: State,
    pub from_index: usize,
    /// `None` when no wall lies within the contact tolerance.
    pub wall: Option<Wall>,
}

/// Finds what every finite touch sample of `touchq_all` hits, one task per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsectGeometry;

impl IsectGeometry {
    fn touches(ws: &Workspace) -> Result<Vec<TouchRecord>> {
        read_json(ws.local_ws([TOUCH_SCRATCH, TOUCH_ALL_FILE]))
    }
}

impl Stage for IsectGeometry {
    type Record = IsectRecord;

    fn name(&self) -> StageName {
        StageName::IsectGeometry
    }

    fn scratch(&self) -> &'static str {
        ISECT_SCRATCH
    }

    fn prefix(&self) -> &'static str {
        "isect_batch"
    }

    fn task_shape(&self, ws: &Workspace) -> Result<Vec<usize>> {
        Ok(vec![Self::touches(ws)?.len()])
    }

    fn granularity(&self, ws: &Workspace) -> usize {
        ws.config().mesh_bool_granularity
    }

    fn run_chunk(&self, ws: &Workspace, chunk: &TaskChunk, _task_id: usize) -> Result<Vec<IsectRecord>> {
        let scene = ws.scene()?;
        let touches = Self::touches(ws)?;
        let tolerance = ws.config().contact_tolerance;

        let records = chunk
            .range()
            .filter_map(|si| touches.get(si).map(|sample| (si, sample)))
            .filter(|(_, sample)| !sample.is_inf)
            .map(|(si, sample)| IsectRecord {
                key: padded(si, touches.len()),
                touch: sample.touch,
                from: sample.from,
                from_index: sample.from_index,
                wall: scene.contact(&sample.touch, tolerance),
            })
            .collect();

        Ok(records)
    }
}
