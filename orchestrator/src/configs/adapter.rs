use std::{
    net::{SocketAddr, ToSocketAddrs},
    num::NonZeroUsize,
};

use comms::specs::{
    server::{DistributionSpec, OptimizerSpec, ParamGenSpec, ServerSpec, SynchronizerSpec},
    worker::{A3cSpec, ModelSpec, SceneSpec, TrainerSpec, ValueRegressionSpec, WorkerSpec},
};
use puzzle::{BoxPuzzle, NUM_ACTIONS, Scene};

use super::{
    InitConfig, OptimizerConfig, ParamGenConfig, SceneConfig, SynchronizerConfig, TrainerConfig,
    TrainingConfig,
};
use crate::error::OrchestratorError;

type Result<T> = std::result::Result<T, OrchestratorError>;

/// The resolved addresses and wire specs of one training session.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub server_addr: SocketAddr,
    pub server: ServerSpec,
    pub workers: Vec<(SocketAddr, WorkerSpec)>,
}

/// Validates a `TrainingConfig` and turns it into wire specs.
#[derive(Debug, Default)]
pub struct Adapter;

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt(&self, config: &TrainingConfig) -> Result<Deployment> {
        self.validate(config)?;

        let model = self.adapt_model(config.scene)?;
        let server_addr = self.resolve("server", &config.server_addr)?;

        let server = ServerSpec {
            workers: config.worker_addrs.len(),
            shard_size: config.shard_size,
            param_gen: self.adapt_param_gen(model, config.init),
            optimizer: self.adapt_optimizer(config.optimizer),
            synchronizer: self.adapt_synchronizer(config.synchronizer),
            seed: config.seed,
        };

        let trainer = self.adapt_trainer(config.trainer);
        let scene = self.adapt_scene(config.scene);

        let workers = config
            .worker_addrs
            .iter()
            .enumerate()
            .map(|(i, addressable)| {
                let addr = self.resolve(&format!("worker[{i}]"), addressable)?;

                Ok((
                    addr,
                    WorkerSpec {
                        worker_id: i,
                        max_iterations: config.max_iterations,
                        server_addr,
                        model,
                        trainer,
                        scene,
                        seed: config.seed.map(|seed| seed.wrapping_add(i as u64 + 1)),
                    },
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Deployment {
            server_addr,
            server,
            workers,
        })
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate(&self, config: &TrainingConfig) -> Result<()> {
        if config.worker_addrs.is_empty() {
            return invalid("at least one worker address is required".into());
        }

        if let SynchronizerConfig::Barrier { barrier_size } = config.synchronizer {
            let workers = config.worker_addrs.len();
            if barrier_size == 0 {
                return invalid("barrier_size must be greater than 0".into());
            }
            if barrier_size > workers {
                return invalid(format!(
                    "barrier_size ({barrier_size}) cannot exceed number of workers ({workers})"
                ));
            }
        }

        self.validate_optimizer(config.optimizer)?;
        self.validate_trainer(config.trainer)
    }

    fn validate_optimizer(&self, optimizer: OptimizerConfig) -> Result<()> {
        let lr = match optimizer {
            OptimizerConfig::Adam { lr, b1, b2, eps } => {
                unit_open("b1", b1)?;
                unit_open("b2", b2)?;
                positive("eps", eps)?;
                lr
            }
            OptimizerConfig::GradientDescent { lr } => lr,
            OptimizerConfig::GradientDescentWithMomentum { lr, mu } => {
                unit_open("mu", mu)?;
                lr
            }
            OptimizerConfig::RmsProp { lr, decay, mu, eps } => {
                unit_open("decay", decay)?;
                unit_open("mu", mu)?;
                positive("eps", eps)?;
                lr
            }
        };

        positive("lr", lr)
    }

    fn validate_trainer(&self, trainer: TrainerConfig) -> Result<()> {
        match trainer {
            TrainerConfig::A3c {
                gamma,
                entropy_beta,
                epsilon,
                magnitudes,
                deltas,
                ..
            } => {
                unit_closed("gamma", gamma)?;
                unit_closed("epsilon", epsilon)?;
                if !(entropy_beta >= 0.) {
                    return invalid(format!("entropy_beta ({entropy_beta}) must not be negative"));
                }
                for (name, value) in [
                    ("translation magnitude", magnitudes[0]),
                    ("rotation magnitude", magnitudes[1]),
                    ("translation delta", deltas[0]),
                    ("rotation delta", deltas[1]),
                ] {
                    positive(name, value)?;
                }
                Ok(())
            }
            TrainerConfig::ValueRegression { axis, .. } => {
                if axis.iter().all(|&a| a == 0.) {
                    return invalid("value regression axis must not be zero".into());
                }
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    fn resolve(&self, who: &str, addressable: &str) -> Result<SocketAddr> {
        addressable
            .to_socket_addrs()
            .map_err(|e| OrchestratorError::ConnectionFailed {
                addr: format!("{who} ({addressable})"),
                source: e,
            })?
            .next()
            .ok_or_else(|| {
                OrchestratorError::InvalidConfig(format!("{who}: could not resolve {addressable}"))
            })
    }

    /// The model shape follows the scene: one feature per observed value and one
    /// action per discrete motion.
    fn adapt_model(&self, scene: SceneConfig) -> Result<ModelSpec> {
        let observation = match scene {
            SceneConfig::BoxPuzzle {
                half_extent,
                wall,
                hole,
                probe_range,
            } => BoxPuzzle::new(half_extent, wall, hole, probe_range)
                .map_err(|e| OrchestratorError::InvalidConfig(e.to_string()))?
                .observation_len(),
        };

        let nonzero = |n: usize| {
            NonZeroUsize::new(n)
                .ok_or_else(|| OrchestratorError::InvalidConfig("scene observes nothing".into()))
        };

        Ok(ModelSpec {
            features: nonzero(observation)?,
            actions: nonzero(NUM_ACTIONS)?,
        })
    }

    /// Lays the initialization out the same way the worker's parameter layout does:
    /// policy weights, policy bias, value weights, value bias.
    fn adapt_param_gen(&self, model: ModelSpec, init: InitConfig) -> ParamGenSpec {
        let (f, a) = (model.features.get(), model.actions.get());
        let zeros = |limit| ParamGenSpec::Const { value: 0., limit };

        ParamGenSpec::Chained {
            specs: vec![
                self.adapt_init(init.policy, (f, a * f, a)),
                zeros(a),
                self.adapt_init(init.value, (f, f, 1)),
                zeros(1),
            ],
        }
    }

    fn adapt_init(
        &self,
        param_gen: ParamGenConfig,
        (fan_in, limit, fan_out): (usize, usize, usize),
    ) -> ParamGenSpec {
        let rand = |distribution| ParamGenSpec::Rand {
            distribution,
            limit,
        };

        match param_gen {
            ParamGenConfig::Const { value } => ParamGenSpec::Const { value, limit },
            ParamGenConfig::Uniform { low, high } => rand(DistributionSpec::Uniform { low, high }),
            ParamGenConfig::UniformInclusive { low, high } => {
                rand(DistributionSpec::UniformInclusive { low, high })
            }
            ParamGenConfig::XavierUniform => {
                rand(DistributionSpec::XavierUniform { fan_in, fan_out })
            }
            ParamGenConfig::LecunUniform => rand(DistributionSpec::LecunUniform { fan_in }),
            ParamGenConfig::Normal { mean, std_dev } => {
                rand(DistributionSpec::Normal { mean, std_dev })
            }
            ParamGenConfig::Kaiming => rand(DistributionSpec::Kaiming { fan_in }),
            ParamGenConfig::Xavier => rand(DistributionSpec::Xavier { fan_in, fan_out }),
            ParamGenConfig::Lecun => rand(DistributionSpec::Lecun { fan_in }),
        }
    }

    fn adapt_optimizer(&self, optimizer: OptimizerConfig) -> OptimizerSpec {
        match optimizer {
            OptimizerConfig::Adam { lr, b1, b2, eps } => OptimizerSpec::Adam {
                learning_rate: lr,
                beta1: b1,
                beta2: b2,
                epsilon: eps,
            },
            OptimizerConfig::GradientDescent { lr } => {
                OptimizerSpec::GradientDescent { learning_rate: lr }
            }
            OptimizerConfig::GradientDescentWithMomentum { lr, mu } => {
                OptimizerSpec::GradientDescentWithMomentum {
                    learning_rate: lr,
                    momentum: mu,
                }
            }
            OptimizerConfig::RmsProp { lr, decay, mu, eps } => OptimizerSpec::RmsProp {
                learning_rate: lr,
                decay,
                momentum: mu,
                epsilon: eps,
            },
        }
    }

    fn adapt_synchronizer(&self, synchronizer: SynchronizerConfig) -> SynchronizerSpec {
        match synchronizer {
            SynchronizerConfig::Barrier { barrier_size } => {
                SynchronizerSpec::Barrier { barrier_size }
            }
            SynchronizerConfig::NonBlocking => SynchronizerSpec::NonBlocking,
        }
    }

    fn adapt_trainer(&self, trainer: TrainerConfig) -> TrainerSpec {
        match trainer {
            TrainerConfig::A3c {
                local_t,
                gamma,
                entropy_beta,
                epsilon,
                terminal_value,
                magnitudes,
                deltas,
            } => TrainerSpec::A3c(A3cSpec {
                local_t,
                gamma,
                entropy_beta,
                epsilon,
                terminal_value,
                magnitudes,
                deltas,
            }),
            TrainerConfig::ValueRegression {
                batch,
                axis,
                origin,
            } => TrainerSpec::ValueRegression(ValueRegressionSpec {
                batch,
                axis,
                origin,
            }),
        }
    }

    fn adapt_scene(&self, scene: SceneConfig) -> SceneSpec {
        match scene {
            SceneConfig::BoxPuzzle {
                half_extent,
                wall,
                hole,
                probe_range,
            } => SceneSpec::BoxPuzzle {
                half_extent,
                wall,
                hole,
                probe_range,
            },
        }
    }
}

fn invalid<T>(msg: String) -> Result<T> {
    Err(OrchestratorError::InvalidConfig(msg))
}

fn positive(name: &str, value: f32) -> Result<()> {
    if !(value > 0.) {
        return invalid(format!("{name} ({value}) must be positive"));
    }
    Ok(())
}

fn unit_closed(name: &str, value: f32) -> Result<()> {
    if !(0. ..=1.).contains(&value) {
        return invalid(format!("{name} ({value}) must be in [0, 1]"));
    }
    Ok(())
}

fn unit_open(name: &str, value: f32) -> Result<()> {
    if !(0. ..1.).contains(&value) {
        return invalid(format!("{name} ({value}) must be in [0, 1)"));
    }
    Ok(())
}
