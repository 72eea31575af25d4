use std::{cell::RefCell, rc::Rc};

use comms::specs::server::{
    DistributionSpec, OptimizerSpec, ParamGenSpec, ServerSpec, SynchronizerSpec,
};
use log::debug;
use rand::{SeedableRng, rngs::StdRng};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{ParameterServer, Server};
use crate::{
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen, Result},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer, RmsProp},
    storage::{BlockingStore, StoreHandle},
    synchronization::{BarrierSync, NoBlockingSync},
};

type SharedRng = Rc<RefCell<StdRng>>;

/// Boxes the `RandParamGen` sampling `distribution`.
fn rand_param_gen(
    rng: SharedRng,
    distribution: DistributionSpec,
    limit: usize,
) -> Result<Box<dyn ParamGen>> {
    Ok(match distribution {
        DistributionSpec::Uniform { low, high } => {
            Box::new(RandParamGen::uniform(rng, limit, low, high)?)
        }
        DistributionSpec::UniformInclusive { low, high } => {
            Box::new(RandParamGen::uniform_inclusive(rng, limit, low, high)?)
        }
        DistributionSpec::XavierUniform { fan_in, fan_out } => {
            Box::new(RandParamGen::xavier_uniform(rng, limit, fan_in, fan_out)?)
        }
        DistributionSpec::LecunUniform { fan_in } => {
            Box::new(RandParamGen::lecun_uniform(rng, limit, fan_in)?)
        }
        DistributionSpec::Normal { mean, std_dev } => {
            Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
        }
        DistributionSpec::Kaiming { fan_in } => Box::new(RandParamGen::kaiming(rng, limit, fan_in)?),
        DistributionSpec::Xavier { fan_in, fan_out } => {
            Box::new(RandParamGen::xavier(rng, limit, fan_in, fan_out)?)
        }
        DistributionSpec::Lecun { fan_in } => Box::new(RandParamGen::lecun(rng, limit, fan_in)?),
    })
}

/// Turns a `ParamGenSpec` tree into a generator, every random section of the tree
/// draws from the same `rng` so a seed fixes the whole master replica.
fn param_gen(rng: &SharedRng, spec: &ParamGenSpec) -> Result<Box<dyn ParamGen>> {
    match spec {
        ParamGenSpec::Const { value, limit } => Ok(Box::new(ConstParamGen::new(*value, *limit))),
        ParamGenSpec::Rand {
            distribution,
            limit,
        } => rand_param_gen(rng.clone(), *distribution, *limit),
        ParamGenSpec::Chained { specs } => {
            let param_gens = specs
                .iter()
                .map(|spec| param_gen(rng, spec))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(ChainedParamGen::new(param_gens)))
        }
    }
}

/// Resolves a `ServerSpec` into a boxed `Server`: parameter generator, then
/// optimizer, then synchronizer, each one a concrete type down to the store.
#[derive(Default)]
pub struct ServerBuilder;

impl ServerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the master replica described by `spec`.
    ///
    /// # Errors
    /// A `RandErr` if a distribution of the spec has invalid parameters.
    pub fn build<R, W>(&self, spec: ServerSpec) -> Result<Box<dyn Server<R, W>>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        debug!(
            workers = spec.workers,
            nparams = spec.param_gen.limit(),
            shard_size = spec.shard_size.get();
            "building parameter server"
        );

        let rng = Rc::new(RefCell::new(match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }));
        let param_gen = param_gen(&rng, &spec.param_gen)?;

        Ok(self.resolve_optimizer(spec, param_gen))
    }

    fn resolve_optimizer<R, W, PG>(&self, spec: ServerSpec, param_gen: PG) -> Box<dyn Server<R, W>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        PG: ParamGen,
    {
        match spec.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => self.resolve_synchronizer(spec, param_gen, |len| {
                Adam::new(len, learning_rate, beta1, beta2, epsilon)
            }),
            OptimizerSpec::GradientDescent { learning_rate } => {
                self.resolve_synchronizer(spec, param_gen, |_| GradientDescent::new(learning_rate))
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => self.resolve_synchronizer(spec, param_gen, |len| {
                GradientDescentWithMomentum::new(len, learning_rate, momentum)
            }),
            OptimizerSpec::RmsProp {
                learning_rate,
                decay,
                momentum,
                epsilon,
            } => self.resolve_synchronizer(spec, param_gen, |len| {
                RmsProp::new(len, learning_rate, decay, momentum, epsilon)
            }),
        }
    }

    /// Picks the synchronizer and shards the initial parameters into the store,
    /// one optimizer per shard.
    fn resolve_synchronizer<R, W, PG, O, OF>(
        &self,
        spec: ServerSpec,
        param_gen: PG,
        optimizer_factory: OF,
    ) -> Box<dyn Server<R, W>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        PG: ParamGen,
        O: Optimizer + Send + 'static,
        OF: FnMut(usize) -> O,
    {
        let store = BlockingStore::new(spec.shard_size, param_gen, optimizer_factory);
        let handle = StoreHandle::new(store);

        match spec.synchronizer {
            SynchronizerSpec::Barrier { barrier_size } => {
                Box::new(ParameterServer::new(handle, BarrierSync::new(barrier_size, spec.workers)))
            }
            SynchronizerSpec::NonBlocking => {
                Box::new(ParameterServer::new(handle, NoBlockingSync::new()))
            }
        }
    }
}
