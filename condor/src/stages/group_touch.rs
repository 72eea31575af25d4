use super::{SampleTouch, TouchRecord};
use crate::{
    Result,
    stage::{Stage, merge_chunks},
    workspace::Workspace,
};

pub const TOUCH_ALL_FILE: &str = "touchq_all.json";

/// Merges every `sample_touch` chunk into one file, in chunk order.
pub async fn group_touch(ws: &Workspace) -> Result<Vec<TouchRecord>> {
    let stage = SampleTouch;
    let scratch = ws.local_ws([stage.scratch()]);
    let total_chunks = stage.total_chunks(ws)?;

    merge_chunks(&scratch, stage.prefix(), total_chunks, &scratch.join(TOUCH_ALL_FILE)).await
}
