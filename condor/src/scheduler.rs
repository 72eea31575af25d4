use std::{
    fs::File,
    path::{Path, PathBuf},
    process::Stdio,
};

use log::{debug, info, warn};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, process::Command};

use crate::{CondorErr, Result};

const PROCESS_MACRO: &str = "$(Process)";

/// Runs the jobs of a submission file.
#[allow(unused)]
#[trait_variant::make(Scheduler: Send)]
pub trait SchedulerTemplate {
    /// Queues every instance of the submission file at `submission`.
    async fn submit(&self, submission: &Path) -> Result<()>;

    /// Blocks until every job logging to `log` has finished.
    async fn wait(&self, log: &Path) -> Result<()>;
}

async fn shell(program: &str, args: &[&str]) -> Result<()> {
    let command = format!("{program} {}", args.join(" "));
    debug!("running {command}");

    let status = Command::new(program).args(args).status().await?;
    if !status.success() {
        return Err(CondorErr::CommandFailed {
            command,
            status: status.code(),
        });
    }

    Ok(())
}

/// Hands submissions to an HTCondor pool through `condor_submit` and
/// `condor_wait`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CondorScheduler;

impl Scheduler for CondorScheduler {
    async fn submit(&self, submission: &Path) -> Result<()> {
        let submission = submission.to_string_lossy();
        shell("condor_submit", &[submission.as_ref()]).await
    }

    async fn wait(&self, log: &Path) -> Result<()> {
        let log = log.to_string_lossy();
        shell("condor_wait", &[log.as_ref()]).await
    }
}

/// The parts of a submission file a local run needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Job {
    executable: String,
    arguments: Vec<String>,
    output: String,
    error: String,
    log: String,
    instances: usize,
}

impl Job {
    fn parse(text: &str) -> Result<Self> {
        let mut job = Self::default();

        for line in text.lines().map(str::trim) {
            let (head, count) = line
                .split_once(char::is_whitespace)
                .unwrap_or((line, ""));
            if head.eq_ignore_ascii_case("queue") {
                // A bare `Queue` queues a single job.
                job.instances = match count.trim() {
                    "" => 1,
                    count => count.parse().map_err(|_| {
                        CondorErr::InvalidArgument(format!("malformed queue statement {line:?}"))
                    })?,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "executable" => job.executable = value,
                "arguments" => job.arguments = value.split_whitespace().map(String::from).collect(),
                "output" => job.output = value,
                "error" => job.error = value,
                "log" => job.log = value,
                _ => {}
            }
        }

        if job.executable.is_empty() || job.log.is_empty() {
            return Err(CondorErr::InvalidArgument(
                "submission without executable or log".into(),
            ));
        }

        Ok(job)
    }
}

fn expand(template: &str, process: usize) -> String {
    template.replace(PROCESS_MACRO, &process.to_string())
}

fn redirect(path: &str, process: usize) -> Result<Stdio> {
    if path.is_empty() {
        return Ok(Stdio::null());
    }
    Ok(File::create(expand(path, process))?.into())
}

/// Runs every instance of a submission as a local process, writing the same
/// output, error and log files a cluster would.
///
/// Jobs finish within `submit`, a failed job is logged and leaves its chunk
/// missing for a later resubmission.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl LocalScheduler {
    async fn append_log(log: &Path, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

impl Scheduler for LocalScheduler {
    async fn submit(&self, submission: &Path) -> Result<()> {
        let job = Job::parse(&tokio::fs::read_to_string(submission).await?)?;
        let log = PathBuf::from(&job.log);
        info!(instances = job.instances; "running {} locally", job.executable);

        let mut children = Vec::with_capacity(job.instances);
        for process in 0..job.instances {
            let args: Vec<_> = job.arguments.iter().map(|a| expand(a, process)).collect();
            let child = Command::new(&job.executable)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(redirect(&job.output, process)?)
                .stderr(redirect(&job.error, process)?)
                .spawn()?;

            Self::append_log(&log, &format!("job {process} submitted")).await?;
            children.push(child);
        }

        for (process, mut child) in children.into_iter().enumerate() {
            let status = child.wait().await?;
            if !status.success() {
                warn!(process = process; "job failed with {status}");
            }
            Self::append_log(&log, &format!("job {process} terminated with {status}")).await?;
        }

        Ok(())
    }

    async fn wait(&self, log: &Path) -> Result<()> {
        if !tokio::fs::try_exists(log).await? {
            return Err(CondorErr::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no jobs logged to {}", log.display()),
            )));
        }
        Ok(())
    }
}
