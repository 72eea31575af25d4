use comms::specs::worker::{SceneSpec, TrainerSpec, WorkerSpec};
use log::info;
use puzzle::{BoxPuzzle, NUM_ACTIONS, Scene};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Result, Worker, WorkerErr,
    config::WorkerConfig,
    model::ActorCritic,
    training::{A3cTrainer, Trainer, ValueTrainer},
};

#[derive(Debug, Default)]
pub struct WorkerBuilder;

impl WorkerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds a `Worker` from a `WorkerSpec`.
    ///
    /// # Args
    /// * `spec` - Bootstrap specification received from the orchestrator.
    ///
    /// # Returns
    /// A fully initialized `Worker` instance, or an error if the model doesn't fit
    /// the scene.
    pub fn build(&self, spec: &WorkerSpec) -> Result<Worker> {
        let scene = self.build_scene(spec.scene)?;

        let (features, observation) = (spec.model.features.get(), scene.observation_len());
        if features != observation {
            return Err(WorkerErr::ObservationMismatch {
                features,
                observation,
            });
        }

        let model = ActorCritic::new(spec.model);
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let trainer: Box<dyn Trainer> = match spec.trainer {
            TrainerSpec::A3c(a3c) => {
                let actions = spec.model.actions.get();
                if actions != NUM_ACTIONS {
                    return Err(WorkerErr::ActionsMismatch {
                        actions,
                        expected: NUM_ACTIONS,
                    });
                }

                Box::new(A3cTrainer::new(model, scene, a3c, rng)?)
            }
            TrainerSpec::ValueRegression(value) => {
                Box::new(ValueTrainer::new(model, scene, value, rng))
            }
        };

        info!(worker_id = spec.worker_id, nparams = trainer.nparams(); "worker built");
        let config = WorkerConfig::new(spec.worker_id, spec.max_iterations);
        Ok(Worker::new(config, trainer))
    }

    fn build_scene(&self, spec: SceneSpec) -> Result<BoxPuzzle> {
        match spec {
            SceneSpec::BoxPuzzle {
                half_extent,
                wall,
                hole,
                probe_range,
            } => Ok(BoxPuzzle::new(half_extent, wall, hole, probe_range)?),
        }
    }
}
