use std::ops::Range;

use comms::specs::worker::ModelSpec;

/// Maps a flat parameter buffer into the actor-critic's named tensors.
///
/// The buffer holds, in order, the policy weights (`actions x features`, row
/// major), the policy bias (`actions`), the value weights (`features`) and the
/// value bias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    pub features: usize,
    pub actions: usize,
    pub policy_w: Range<usize>,
    pub policy_b: Range<usize>,
    pub value_w: Range<usize>,
    pub value_b: Range<usize>,
}

impl ParameterLayout {
    pub fn new(spec: ModelSpec) -> Self {
        let (features, actions) = (spec.features.get(), spec.actions.get());

        let policy_w = 0..actions * features;
        let policy_b = policy_w.end..policy_w.end + actions;
        let value_w = policy_b.end..policy_b.end + features;
        let value_b = value_w.end..value_w.end + 1;

        Self {
            features,
            actions,
            policy_w,
            policy_b,
            value_w,
            value_b,
        }
    }

    /// Total amount of parameters covered by the layout.
    pub fn len(&self) -> usize {
        self.value_b.end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
