use std::collections::HashMap;

use crate::instance::InstanceError;
use crate::instance::graph::VertexId;

/// The necessity for a vertex to be covered, expressed as a non-increasing
/// penalty vector. Position `i` holds the penalty for visiting the vertex
/// fewer than `i + 1` times; `f64::INFINITY` entries are mandatory coverages.
///
/// Multiple entries per vertex can get expensive: requiring a vertex `k`
/// times forces capacity `k` onto the whole model.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageNecessity {
    penalties: Vec<f64>,
}

impl CoverageNecessity {
    pub fn new(penalties: Vec<f64>) -> Result<Self, InstanceError> {
        if penalties.iter().any(|&p| !(p > 0.0)) {
            return Err(InstanceError::MalformedPenaltyVector);
        }
        if penalties.windows(2).any(|w| w[0] < w[1]) {
            return Err(InstanceError::MalformedPenaltyVector);
        }
        Ok(Self { penalties })
    }

    /// A coverage that can be skipped for free.
    pub fn optional() -> Self {
        Self { penalties: Vec::new() }
    }

    /// A single mandatory coverage.
    pub fn simple() -> Self {
        Self {
            penalties: vec![f64::INFINITY],
        }
    }

    /// `k` mandatory coverages.
    pub fn multi(k: usize) -> Self {
        Self {
            penalties: vec![f64::INFINITY; k],
        }
    }

    /// A single coverage that may be skipped for the given penalty.
    pub fn penalty(penalty: f64) -> Self {
        debug_assert!(penalty >= 0.0);
        if penalty == 0.0 {
            Self::optional()
        } else {
            Self {
                penalties: vec![penalty],
            }
        }
    }

    pub fn len(&self) -> usize {
        self.penalties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.penalties.is_empty()
    }

    pub fn penalties(&self) -> &[f64] {
        &self.penalties
    }

    /// The minimum number of visits: the length of the infinite prefix.
    pub fn required_count(&self) -> usize {
        self.penalties.iter().filter(|p| p.is_infinite()).count()
    }

    /// True if every entry is mandatory, i.e. paying instead is never allowed.
    pub fn is_fully_mandatory(&self) -> bool {
        self.penalties.iter().all(|p| p.is_infinite())
    }

    /// The penalty for skipping the `i`-th coverage, zero beyond the vector.
    pub fn penalty_for_skipping(&self, i: usize) -> f64 {
        self.penalties.get(i).copied().unwrap_or(0.0)
    }

    /// The sum of penalty entries not absorbed by the given (possibly
    /// fractional) visit count. Non-increasing in the coverage.
    pub fn opportunity_loss(&self, coverage: f64) -> f64 {
        let mut loss = 0.0;
        for (i, &p) in self.penalties.iter().enumerate() {
            let uncovered = 1.0 - (coverage - i as f64).clamp(0.0, 1.0);
            if uncovered > 0.0 {
                loss += p * uncovered;
            }
        }
        loss
    }
}

/// Per-vertex coverage necessities over a shared default.
#[derive(Debug, Clone)]
pub struct CoverageNecessities {
    default: CoverageNecessity,
    overrides: HashMap<VertexId, CoverageNecessity>,
}

impl CoverageNecessities {
    pub fn new(default: CoverageNecessity) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn set(&mut self, v: VertexId, necessity: CoverageNecessity) {
        self.overrides.insert(v, necessity);
    }

    pub fn get(&self, v: VertexId) -> &CoverageNecessity {
        self.overrides.get(&v).unwrap_or(&self.default)
    }
}

impl Default for CoverageNecessities {
    fn default() -> Self {
        Self::new(CoverageNecessity::simple())
    }
}
