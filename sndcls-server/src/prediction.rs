//! Prediction post-processing
//!
//! Orders the classifier's probability vector from most to least likely and
//! applies the same permutation to the class names. Equal probabilities
//! keep ascending class-index order (stable sort); NaN sorts last.

use serde::{Deserialize, Serialize};
use sndcls_common::{Error, Result};
use std::cmp::Ordering;

/// Probabilities and class names in matching, probability-descending order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub probas: Vec<f32>,
    pub classes: Vec<String>,
}

impl RankedPrediction {
    /// Most likely class
    pub fn top(&self) -> Option<(&str, f32)> {
        self.classes
            .first()
            .zip(self.probas.first())
            .map(|(class, &p)| (class.as_str(), p))
    }

    /// `(class, probability)` pairs in rank order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, f32)> {
        self.classes
            .iter()
            .map(String::as_str)
            .zip(self.probas.iter().copied())
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Rank `probas` (indexed by class index) against `classes` (same indexing)
pub fn rank_predictions(probas: &[f32], classes: &[String]) -> Result<RankedPrediction> {
    if probas.len() != classes.len() {
        return Err(Error::Registry(format!(
            "{} probabilities for {} classes",
            probas.len(),
            classes.len()
        )));
    }

    let mut order: Vec<usize> = (0..probas.len()).collect();
    order.sort_by(|&a, &b| descending(probas[a], probas[b]));

    Ok(RankedPrediction {
        probas: order.iter().map(|&i| probas[i]).collect(),
        classes: order.iter().map(|&i| classes[i].clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_descending_with_matching_classes() {
        let ranked =
            rank_predictions(&[0.1, 0.7, 0.2], &names(&["cat", "bird", "dog"])).unwrap();
        assert_eq!(ranked.probas, vec![0.7, 0.2, 0.1]);
        assert_eq!(ranked.classes, names(&["bird", "dog", "cat"]));
        assert_eq!(ranked.top(), Some(("bird", 0.7)));
    }

    #[test]
    fn test_ties_keep_index_order() {
        let ranked = rank_predictions(
            &[0.25, 0.25, 0.5, 0.25],
            &names(&["a", "b", "c", "d"]),
        )
        .unwrap();
        assert_eq!(ranked.classes, names(&["c", "a", "b", "d"]));
    }

    #[test]
    fn test_pairs_survive_reranking() {
        let probas = [0.05, 0.3, 0.15, 0.3, 0.2];
        let classes = names(&["e", "d", "c", "b", "a"]);
        let ranked = rank_predictions(&probas, &classes).unwrap();

        // Every output pair existed in the input
        for (class, p) in ranked.pairs() {
            let idx = classes.iter().position(|c| c == class).unwrap();
            assert_eq!(probas[idx], p);
        }

        // Ranking the ranked output again is a no-op
        let again = rank_predictions(&ranked.probas, &ranked.classes).unwrap();
        assert_eq!(again, ranked);
    }

    #[test]
    fn test_nan_sorts_last() {
        let ranked =
            rank_predictions(&[f32::NAN, 0.4, 0.6], &names(&["x", "y", "z"])).unwrap();
        assert_eq!(ranked.classes, names(&["z", "y", "x"]));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            rank_predictions(&[0.5, 0.5], &names(&["only"])),
            Err(Error::Registry(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let ranked = rank_predictions(&[], &[]).unwrap();
        assert!(ranked.top().is_none());
    }

    #[test]
    fn test_serializes_to_response_shape() {
        let ranked = rank_predictions(&[0.5], &names(&["siren"])).unwrap();
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json, serde_json::json!({"probas": [0.5], "classes": ["siren"]}));
    }
}
