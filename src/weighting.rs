//! Statistical culling of secondaries.
//!
//! A bias factor `b >= 1` keeps a secondary set with probability `1/b` and
//! multiplies each survivor's weight by `b`, so the expected weighted yield
//! matches the unbiased simulation while only `1/b` of the sets are tracked.

use crate::secondary::{Secondary, SecondaryPair};
use rand::Rng;

/// Keep/drop decision for one secondary set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightDecision {
    /// Materialize the set, multiplying weights by this factor
    Keep(f64),
    Drop,
}

impl WeightDecision {
    pub fn is_kept(&self) -> bool {
        matches!(self, WeightDecision::Keep(_))
    }
}

/// Draw a keep/drop decision for bias factor `bias`.
///
/// A bias at or below 1 always keeps with unit factor and consumes no random
/// number.
pub fn choose_weight<R: Rng + ?Sized>(rng: &mut R, bias: f64) -> WeightDecision {
    if bias <= 1.0 {
        return WeightDecision::Keep(1.0);
    }
    if rng.gen::<f64>() < 1.0 / bias {
        WeightDecision::Keep(bias)
    } else {
        WeightDecision::Drop
    }
}

/// Apply the policy to a decay pair as a unit.
///
/// Survivors get `parent_weight * b`; a dropped pair is discarded here and
/// never reaches the host.
pub fn weigh_pair<R: Rng + ?Sized>(
    rng: &mut R,
    bias: f64,
    parent_weight: f64,
    mut pair: SecondaryPair,
) -> Option<SecondaryPair> {
    match choose_weight(rng, bias) {
        WeightDecision::Keep(factor) => {
            pair.first.weight = parent_weight;
            pair.second.weight = parent_weight;
            pair.scale_weights(factor);
            Some(pair)
        }
        WeightDecision::Drop => None,
    }
}

/// Apply the policy to a single secondary
pub fn weigh_single<R: Rng + ?Sized>(
    rng: &mut R,
    bias: f64,
    parent_weight: f64,
    mut secondary: Secondary,
) -> Option<Secondary> {
    match choose_weight(rng, bias) {
        WeightDecision::Keep(factor) => {
            secondary.weight = parent_weight * factor;
            Some(secondary)
        }
        WeightDecision::Drop => None,
    }
}
