use std::path::{Path, PathBuf};

use log::info;

use crate::{CondorErr, Result, scheduler::Scheduler, workspace::Workspace};

pub const SUBMISSION_FILE: &str = "submission.condor";

/// Keys set by every submission, a template can't carry them.
const OWNED_KEYS: [&str; 5] = ["executable", "error", "output", "log", "arguments"];

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &line[prefix.len()..])
}

fn is_excluded(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || strip_prefix_ignore_case(line, "queue").is_some()
        || OWNED_KEYS.iter().any(|key| {
            strip_prefix_ignore_case(line, key).is_some_and(|rest| rest.trim_start().starts_with('='))
        })
}

/// Turns an existing submission file into a template: drops the keys a
/// submission sets itself, the `Queue` statement, comments and blank lines.
pub fn extract_template(text: &str) -> String {
    text.lines()
        .filter(|line| !is_excluded(line))
        .flat_map(|line| [line, "\n"])
        .collect()
}

/// One cluster submission: `instances` runs of `executable`, each with its
/// output, error and log files under `iodir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub executable: String,
    pub iodir: PathBuf,
    pub arguments: Vec<String>,
    pub instances: usize,
}

impl Submission {
    /// The submission file text: `template` followed by this submission's keys.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty executable, no instances or an argument
    /// containing whitespace.
    pub fn render(&self, template: &str) -> Result<String> {
        if self.executable.is_empty() {
            return Err(CondorErr::InvalidArgument("the executable is empty".into()));
        }
        if self.instances == 0 {
            return Err(CondorErr::InvalidArgument("nothing to queue".into()));
        }
        if let Some(arg) = self
            .arguments
            .iter()
            .find(|arg| arg.chars().any(char::is_whitespace))
        {
            return Err(CondorErr::InvalidArgument(format!(
                "argument {arg:?} contains whitespace"
            )));
        }

        let dir = self.iodir.display();
        let mut text = template.to_string();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }

        text.push_str(&format!("Executable = {}\n", self.executable));
        text.push_str(&format!("Output = {dir}/$(Process).out\n"));
        text.push_str(&format!("Error = {dir}/$(Process).err\n"));
        text.push_str(&format!("Log = {dir}/log\n"));
        text.push_str("arguments =");
        for arg in &self.arguments {
            text.push(' ');
            text.push_str(arg);
        }
        text.push_str(&format!("\nQueue {}\n", self.instances));

        Ok(text)
    }
}

/// Submits `instances` runs of `executable` from the scratch directory
/// `iodir_rel` of the workspace, creating it if needed.
///
/// # Returns
/// The written submission file.
pub async fn local_submit<S: Scheduler>(
    ws: &Workspace,
    scheduler: &S,
    executable: &str,
    iodir_rel: &Path,
    arguments: &[String],
    instances: usize,
    wait: bool,
) -> Result<PathBuf> {
    let scratch = ws.local_ws([iodir_rel]);
    tokio::fs::create_dir_all(&scratch).await?;
    info!("using scratch directory {}", scratch.display());

    let submission = Submission {
        executable: executable.to_string(),
        iodir: scratch.clone(),
        arguments: arguments.to_vec(),
        instances,
    };
    let text = submission.render(&ws.template().await?)?;

    let path = scratch.join(SUBMISSION_FILE);
    tokio::fs::write(&path, text).await?;

    info!(instances = instances; "submitting {}", path.display());
    scheduler.submit(&path).await?;

    if wait {
        wait_on(scheduler, &scratch).await?;
    }

    Ok(path)
}

/// Blocks on the log of the scratch directory `iodir`.
pub async fn wait_on<S: Scheduler>(scheduler: &S, iodir: &Path) -> Result<()> {
    let log = iodir.join("log");
    info!("waiting on log file {}", log.display());
    scheduler.wait(&log).await
}
