use super::ParamGen;

/// A parameter generator that always yields the same value, mostly used for biases.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen`.
    ///
    /// # Arguments
    /// * `value` - The value to generate.
    /// * `limit` - How many values to generate before running dry.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let n = n.min(self.remaining);
        if n == 0 {
            return None;
        }

        self.remaining -= n;
        Some(vec![self.value; n])
    }
}
