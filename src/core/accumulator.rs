//! Property accumulation strategies, selectable at context construction.

use super::key::Specificity;
use super::property::Property;

/// Which accumulation strategy a [crate::Context] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorKind {
    /// Retains only candidates at the pointwise-maximum specificity seen so
    /// far. The default: this is what makes "most specific wins" work.
    #[default]
    Max,
    /// Retains every `(Property, Specificity)` candidate ever accumulated.
    /// Diagnostic use only.
    Set,
}

/// Accumulated candidates for one property name.
#[derive(Debug, Clone)]
pub(crate) enum AccumulatorState {
    Max {
        specificity: Specificity,
        candidates: Vec<Property>,
    },
    Set {
        candidates: Vec<(Property, Specificity)>,
    },
}

impl AccumulatorState {
    pub(crate) fn new(kind: AccumulatorKind) -> Self {
        match kind {
            AccumulatorKind::Max => AccumulatorState::Max {
                specificity: Specificity::zero(),
                candidates: Vec::new(),
            },
            AccumulatorKind::Set => AccumulatorState::Set {
                candidates: Vec::new(),
            },
        }
    }

    /// Folds in one more candidate at the given specificity.
    pub(crate) fn accum(&mut self, prop: Property, specificity: Specificity) {
        match self {
            AccumulatorState::Max {
                specificity: current,
                candidates,
            } => {
                if specificity > *current {
                    *current = specificity;
                    *candidates = vec![prop];
                } else if specificity == *current {
                    candidates.push(prop);
                }
                // otherwise: strictly less specific, no change.
            }
            AccumulatorState::Set { candidates } => candidates.push((prop, specificity)),
        }
    }

    /// The current set of candidate properties, for `Max` the ones tied at
    /// the highest specificity seen; for `Set`, everything ever accumulated.
    pub(crate) fn candidates(&self) -> Vec<&Property> {
        match self {
            AccumulatorState::Max { candidates, .. } => candidates.iter().collect(),
            AccumulatorState::Set { candidates } => candidates.iter().map(|(p, _)| p).collect(),
        }
    }
}
