use std::{num::NonZeroUsize, time::Duration};

use log::{info, warn};
use tokio::process::Command;

use crate::{CondorErr, Result, stage::StageName, workspace::RemoteConfig};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Runs pipeline stages on the submit host through `ssh`.
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    program: String,
    host: String,
    exec: String,
    workspace: String,
    max_attempts: NonZeroUsize,
    retry_delay: Duration,
}

impl RemoteCommand {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            program: "ssh".into(),
            host: config.host.clone(),
            exec: config.exec.clone(),
            workspace: config.workspace.clone(),
            max_attempts: config.max_attempts,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Replaces `ssh` with another launcher taking the same arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// The launcher arguments running `stage` remotely.
    pub fn args(&self, stage: StageName) -> Vec<String> {
        vec![
            self.host.clone(),
            self.exec.clone(),
            self.workspace.clone(),
            stage.to_string(),
        ]
    }

    /// Runs `stage` on the submit host.
    ///
    /// With `auto_retry` a failed run is attempted again up to the configured
    /// amount of attempts, otherwise the first failure is returned.
    pub async fn run(&self, stage: StageName, auto_retry: bool) -> Result<()> {
        let args = self.args(stage);
        let attempts = if auto_retry { self.max_attempts.get() } else { 1 };

        let mut attempt = 1;
        loop {
            info!(stage = stage.as_str(), attempt = attempt; "dispatching to {}", self.host);

            let status = Command::new(&self.program).args(&args).status().await?;
            if status.success() {
                return Ok(());
            }

            if attempt >= attempts {
                return Err(CondorErr::CommandFailed {
                    command: format!("{} {}", self.program, args.join(" ")),
                    status: status.code(),
                });
            }

            warn!(stage = stage.as_str(), attempt = attempt; "remote run failed with {status}, retrying");
            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }
}

/// Dispatches every stage in pipeline order, retrying failed dispatches.
pub async fn autorun(remote: &RemoteCommand) -> Result<()> {
    for stage in StageName::ALL {
        remote.run(stage, true).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;

    fn remote(max_attempts: usize) -> RemoteCommand {
        RemoteCommand::new(&RemoteConfig {
            host: "submit".into(),
            exec: "/opt/pipeline".into(),
            workspace: "/ws".into(),
            max_attempts: NonZeroUsize::new(max_attempts).unwrap(),
        })
        .with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn args_name_host_executable_workspace_and_stage() {
        assert_eq!(
            remote(1).args(StageName::GroupTouch),
            vec!["submit", "/opt/pipeline", "/ws", "group_touch"]
        );
    }

    #[tokio::test]
    async fn failure_without_retry_is_returned_at_once() {
        let err = remote(3)
            .with_program("false")
            .run(StageName::SampleTouch, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CondorErr::CommandFailed { status: Some(1), .. }));
    }

    /// A launcher run through `sh` that logs every attempt to a counter file and
    /// succeeds from attempt `succeed_at` on.
    fn counting(dir: &Path, max_attempts: usize, succeed_at: usize) -> (RemoteCommand, PathBuf) {
        let script = dir.join("launch.sh");
        let counter = dir.join("attempts");
        std::fs::write(
            &script,
            format!("echo \"$*\" >> \"$1\"\n[ \"$(wc -l < \"$1\")\" -ge {succeed_at} ]\n"),
        )
        .unwrap();

        let remote = RemoteCommand::new(&RemoteConfig {
            host: script.to_string_lossy().into_owned(),
            exec: counter.to_string_lossy().into_owned(),
            workspace: "/ws".into(),
            max_attempts: NonZeroUsize::new(max_attempts).unwrap(),
        })
        .with_program("sh")
        .with_retry_delay(Duration::ZERO);

        (remote, counter)
    }

    fn attempts(counter: &Path) -> Vec<String> {
        std::fs::read_to_string(counter)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn retries_stop_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let (remote, counter) = counting(dir.path(), 3, 1000);

        let err = remote.run(StageName::IsectGeometry, true).await.unwrap_err();

        assert!(matches!(err, CondorErr::CommandFailed { status: Some(1), .. }));
        let attempts = attempts(&counter);
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|a| a.ends_with("/ws isect_geometry")));
    }

    #[tokio::test]
    async fn a_later_attempt_may_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let (remote, counter) = counting(dir.path(), 3, 2);

        remote.run(StageName::SampleTouch, true).await.unwrap();
        assert_eq!(attempts(&counter).len(), 2);
    }

    #[tokio::test]
    async fn autorun_dispatches_every_stage_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (remote, counter) = counting(dir.path(), 1, 1);

        autorun(&remote).await.unwrap();

        let stages: Vec<_> = attempts(&counter)
            .iter()
            .filter_map(|a| a.rsplit(' ').next().map(String::from))
            .collect();
        assert_eq!(stages, ["sample_touch", "group_touch", "isect_geometry"]);
    }
}
