use std::{
    fs::File,
    io::BufReader,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use log::debug;
use puzzle::{BoxPuzzle, State};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Result;

pub const CONFIG_FILE: &str = "config.json";
pub const KEY_FILE: &str = "keys.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneConfig {
    BoxPuzzle {
        half_extent: f32,
        wall: f32,
        hole: f32,
        probe_range: f32,
    },
}

/// Which backend runs the submitted jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    #[default]
    Condor,
    Local,
}

/// Where the stages run when dispatched from another machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// The submit host, as `ssh` understands it.
    pub host: String,
    /// The `pipeline` executable on the submit host.
    pub exec: String,
    /// The workspace directory on the submit host.
    pub workspace: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: NonZeroUsize,
}

fn default_max_attempts() -> NonZeroUsize {
    NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN)
}

fn default_executable() -> String {
    "pipeline".into()
}

fn default_touch_resolution() -> f32 {
    0.01
}

fn default_touch_reach() -> f32 {
    2.
}

fn default_contact_tolerance() -> f32 {
    1e-3
}

/// The `config.json` of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Upper bound of concurrent cluster jobs.
    pub condor_quota: usize,
    /// Touch samples drawn per key configuration.
    pub touch_samples: usize,
    pub touch_sample_granularity: usize,
    pub mesh_bool_granularity: usize,
    /// Submission template, relative paths are resolved against the workspace.
    #[serde(default)]
    pub condor_template: Option<PathBuf>,
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default)]
    pub scheduler: SchedulerKind,
    pub scene: SceneConfig,
    #[serde(default = "default_touch_resolution")]
    pub touch_resolution: f32,
    #[serde(default = "default_touch_reach")]
    pub touch_reach: f32,
    #[serde(default = "default_contact_tolerance")]
    pub contact_tolerance: f32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

/// A pipeline workspace: a directory holding the configuration, the key
/// configurations and every stage's scratch files.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Opens the workspace at `root`, reading its `config.json`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = read_json(root.join(CONFIG_FILE))?;
        debug!("opened workspace {}", root.display());

        Ok(Self { root, config })
    }

    pub fn new(root: PathBuf, config: WorkspaceConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// `parts` joined under the workspace root.
    pub fn local_ws<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        parts
            .into_iter()
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// The key configurations of `keys.json`.
    pub fn keys(&self) -> Result<Vec<State>> {
        read_json(self.local_ws([KEY_FILE]))
    }

    pub fn scene(&self) -> Result<BoxPuzzle> {
        let SceneConfig::BoxPuzzle {
            half_extent,
            wall,
            hole,
            probe_range,
        } = self.config.scene;

        Ok(BoxPuzzle::new(half_extent, wall, hole, probe_range)?)
    }

    /// The submission template text, empty when none is configured.
    pub async fn template(&self) -> Result<String> {
        match &self.config.condor_template {
            Some(path) => Ok(tokio::fs::read_to_string(self.root.join(path)).await?),
            None => Ok(String::new()),
        }
    }
}

pub(crate) fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
