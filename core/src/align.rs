//! Reconcile the metadata feature list with the model's declared input width.

use crate::error::{PolicyError, PolicyResult};

/// Features removed, in this order, when metadata lists more than the model uses.
/// Water-quality placeholders first, then lake/pool levels, then weather.
pub const OPTIONAL_DROP_ORDER: &[&str] = &[
    "lakeN_mgL", "lakeP_mgL",
    "canalN_mgL", "canalP_mgL",
    "poolN_mgL", "poolP_mgL",
    "lake_mm", "pool_mm",
    "rain_mm", "loss_mm",
];

/// Return the exact ordered feature list to synthesize.
///
/// The result has `expected` entries, or this fails. An engine that does
/// not declare a width (`None`) gets the list unchanged.
pub fn align_features(features: &[String], expected: Option<usize>) -> PolicyResult<Vec<String>> {
    let Some(need) = expected else {
        return Ok(features.to_vec());
    };
    let have = features.len();
    if have == need {
        return Ok(features.to_vec());
    }
    if have < need {
        return Err(PolicyError::Mismatch {
            metadata: have,
            model:    need,
            remedy:   "Retrain or fix metadata features order to exactly those used.".into(),
        });
    }

    let mut pruned = features.to_vec();
    for candidate in OPTIONAL_DROP_ORDER {
        if pruned.len() == need {
            break;
        }
        if let Some(pos) = pruned.iter().position(|f| f == candidate) {
            pruned.remove(pos);
        }
    }
    if pruned.len() != need {
        return Err(PolicyError::Mismatch {
            metadata: have,
            model:    need,
            remedy:   "Could not reconcile feature count; edit metadata 'features' to the exact training set/order.".into(),
        });
    }

    let removed: Vec<&String> = features.iter().filter(|f| !pruned.contains(f)).collect();
    log::warn!("Dropped extra features to match model: {removed:?}");
    Ok(pruned)
}
