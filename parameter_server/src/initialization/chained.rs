use super::ParamGen;

/// Delegates generation to a sequence of generators, each one used until it runs dry.
///
/// The actor-critic layout is made of weight matrices and biases that want different
/// initializations, chaining lets each section of the flat buffer have its own generator.
pub struct ChainedParamGen {
    param_gens: Vec<Box<dyn ParamGen>>,
    curr: usize,
}

impl ChainedParamGen {
    /// Creates a new `ChainedParamGen`.
    ///
    /// # Arguments
    /// * `param_gens` - The generators in the order their values should appear.
    pub fn new(param_gens: Vec<Box<dyn ParamGen>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl ParamGen for ChainedParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let mut out = Vec::with_capacity(n);

        while out.len() < n {
            let Some(param_gen) = self.param_gens.get_mut(self.curr) else {
                break;
            };

            match param_gen.sample(n - out.len()) {
                Some(sample) => out.extend(sample),
                None => self.curr += 1,
            }
        }

        (!out.is_empty()).then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{super::ConstParamGen, *};

    fn consts(specs: &[(f32, usize)]) -> Vec<Box<dyn ParamGen>> {
        specs
            .iter()
            .map(|&(value, limit)| Box::new(ConstParamGen::new(value, limit)) as Box<dyn ParamGen>)
            .collect()
    }

    #[test]
    fn empty() {
        let mut param_gen = ChainedParamGen::new(vec![]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn crosses_generator_boundaries() {
        let mut param_gen = ChainedParamGen::new(consts(&[(0., 1), (1., 3)]));

        assert_eq!(param_gen.sample(2).unwrap(), [0., 1.]);
        assert_eq!(param_gen.sample(2).unwrap(), [1., 1.]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn skips_empty_generators() {
        let mut param_gen = ChainedParamGen::new(consts(&[(0., 0), (1., 2), (2., 0), (3., 1)]));

        assert_eq!(param_gen.sample(10).unwrap(), [1., 1., 3.]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn nested_chains_keep_order() {
        let inner = ChainedParamGen::new(consts(&[(1., 1), (2., 1)]));
        let param_gens: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::new(0., 1)),
            Box::new(inner),
            Box::new(ConstParamGen::new(3., 1)),
        ];

        let mut param_gen = ChainedParamGen::new(param_gens);
        assert_eq!(param_gen.sample(4).unwrap(), [0., 1., 2., 3.]);
        assert!(param_gen.sample(1).is_none());
    }
}
