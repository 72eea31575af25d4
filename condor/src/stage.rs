use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{info, warn};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    CondorErr, Result,
    partition::{TaskChunk, get_task_chunk, guess_chunk_number, padded},
    scheduler::Scheduler,
    submit::{local_submit, wait_on},
    workspace::Workspace,
};

/// One partitioned step of the pipeline.
pub trait Stage {
    /// What a chunk of this stage produces per task.
    type Record: Serialize + DeserializeOwned;

    fn name(&self) -> StageName;

    /// The scratch directory of the stage, relative to the workspace.
    fn scratch(&self) -> &'static str;

    /// File name prefix of the chunk files.
    fn prefix(&self) -> &'static str;

    /// The task grid this stage partitions.
    fn task_shape(&self, ws: &Workspace) -> Result<Vec<usize>>;

    /// Tasks worth one job.
    fn granularity(&self, ws: &Workspace) -> usize;

    /// Runs the tasks of `chunk`, the `task_id`th chunk of the grid.
    fn run_chunk(&self, ws: &Workspace, chunk: &TaskChunk, task_id: usize) -> Result<Vec<Self::Record>>;

    /// Amount of chunks, every stage may use twice the cluster quota.
    fn total_chunks(&self, ws: &Workspace) -> Result<usize> {
        let quota = ws.config().condor_quota.saturating_mul(2);
        guess_chunk_number(&self.task_shape(ws)?, quota, self.granularity(ws))
    }

    fn chunk_path(&self, ws: &Workspace, task_id: usize, total_chunks: usize) -> PathBuf {
        chunk_path(
            &ws.local_ws([self.scratch()]),
            self.prefix(),
            task_id,
            total_chunks,
        )
    }
}

/// The stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    SampleTouch,
    GroupTouch,
    IsectGeometry,
}

impl StageName {
    pub const ALL: [StageName; 3] = [Self::SampleTouch, Self::GroupTouch, Self::IsectGeometry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SampleTouch => "sample_touch",
            Self::GroupTouch => "group_touch",
            Self::IsectGeometry => "isect_geometry",
        }
    }
}

impl Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = CondorErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CondorErr::UnknownStage(s.to_string()))
    }
}

/// How a stage was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageArgs {
    /// The chunk to run, `None` lets the runner decide.
    pub task_id: Option<usize>,
    /// Only block on the jobs of an earlier submission.
    pub only_wait: bool,
}

/// What a stage invocation did.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Waited,
    Submitted { total_chunks: usize },
    Merged { records: usize },
    Ran {
        task_id: usize,
        records: usize,
        path: PathBuf,
    },
}

/// `{prefix}-{padded task id}.json` under `scratch`.
pub fn chunk_path(scratch: &Path, prefix: &str, task_id: usize, total_chunks: usize) -> PathBuf {
    scratch.join(format!("{prefix}-{}.json", padded(task_id, total_chunks)))
}

/// Serializes `records` into `path` through a temporary sibling, readers never
/// see a partial file and a rerun replaces the previous one.
pub async fn write_atomic<T: Serialize>(path: &Path, records: &T) -> Result<()> {
    let bytes = serde_json::to_vec(records)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Concatenates the chunk files `0..total_chunks` of `prefix` in index order
/// and writes the result to `out`.
///
/// # Errors
/// `MissingChunk` naming the first chunk without a file.
pub async fn merge_chunks<R>(scratch: &Path, prefix: &str, total_chunks: usize, out: &Path) -> Result<Vec<R>>
where
    R: Serialize + DeserializeOwned,
{
    let mut merged = Vec::new();

    for task_id in 0..total_chunks {
        let path = chunk_path(scratch, prefix, task_id, total_chunks);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CondorErr::MissingChunk { task_id, path });
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<R> = serde_json::from_slice(&bytes)?;
        merged.extend(records);
    }

    write_atomic(out, &merged).await?;
    info!(records = merged.len(); "merged {total_chunks} chunks into {}", out.display());
    Ok(merged)
}

/// Runs stages either in place or by fanning their chunks out to a scheduler.
pub struct StageRunner<'a, S> {
    ws: &'a Workspace,
    scheduler: S,
}

impl<'a, S: Scheduler + Sync> StageRunner<'a, S> {
    pub fn new(ws: &'a Workspace, scheduler: S) -> Self {
        Self { ws, scheduler }
    }

    pub fn workspace(&self) -> &Workspace {
        self.ws
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Runs `stage`.
    ///
    /// * `only_wait` blocks on the stage's log.
    /// * Without a task id and more than one chunk, one job per chunk is
    ///   submitted with the job's process number as task id, then waited on.
    /// * Otherwise the chunk runs here. A single chunk always runs as task `0`,
    ///   whatever task id was given.
    pub async fn run<T: Stage + Sync>(&self, stage: &T, args: StageArgs) -> Result<StageOutcome> {
        let scratch = self.ws.local_ws([stage.scratch()]);

        if args.only_wait {
            wait_on(&self.scheduler, &scratch).await?;
            return Ok(StageOutcome::Waited);
        }

        let shape = stage.task_shape(self.ws)?;
        let total_chunks = stage.total_chunks(self.ws)?;
        info!(stage = stage.name().as_str(), total_chunks = total_chunks; "task shape {shape:?}");

        let task_id = match args.task_id {
            _ if total_chunks == 1 => {
                if let Some(ignored) = args.task_id.filter(|&id| id != 0) {
                    warn!(stage = stage.name().as_str(); "single chunk, running task 0 instead of {ignored}");
                }
                0
            }
            None => {
                self.submit(stage, total_chunks).await?;
                return Ok(StageOutcome::Submitted { total_chunks });
            }
            Some(task_id) => task_id,
        };

        let chunk = get_task_chunk(&shape, total_chunks, task_id)?;
        let records = stage.run_chunk(self.ws, &chunk, task_id)?;

        tokio::fs::create_dir_all(&scratch).await?;
        let path = stage.chunk_path(self.ws, task_id, total_chunks);
        write_atomic(&path, &records).await?;
        info!(
            stage = stage.name().as_str(),
            task_id = task_id;
            "{} records written to {}",
            records.len(),
            path.display()
        );

        Ok(StageOutcome::Ran {
            task_id,
            records: records.len(),
            path,
        })
    }

    async fn submit<T: Stage + Sync>(&self, stage: &T, total_chunks: usize) -> Result<()> {
        let arguments = [
            self.ws.root().to_string_lossy().into_owned(),
            stage.name().to_string(),
            "--task-id".to_string(),
            "$(Process)".to_string(),
        ];

        local_submit(
            self.ws,
            &self.scheduler,
            &self.ws.config().executable,
            Path::new(stage.scratch()),
            &arguments,
            total_chunks,
            true,
        )
        .await?;

        let missing = missing_chunks(self.ws, stage).await?;
        if !missing.is_empty() {
            warn!(stage = stage.name().as_str(); "chunks {missing:?} produced no output");
        }

        Ok(())
    }
}

/// The chunk ids of `stage` without an output file, to be resubmitted by hand.
pub async fn missing_chunks<T: Stage>(ws: &Workspace, stage: &T) -> Result<Vec<usize>> {
    let total_chunks = stage.total_chunks(ws)?;
    let mut missing = Vec::new();

    for task_id in 0..total_chunks {
        if !tokio::fs::try_exists(stage.chunk_path(ws, task_id, total_chunks)).await? {
            missing.push(task_id);
        }
    }

    Ok(missing)
}
