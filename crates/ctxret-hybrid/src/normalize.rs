//! Min-max score normalization.

use ctxret_core::types::{Candidate, NormalizedCandidate};

/// Scale `scores` into `[0, 1]` as `(s - min) / (max - min)`.
///
/// A list whose scores are all equal (including a single score) maps to all
/// `1.0`; an empty list maps to an empty list.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let Some(&first) = scores.first() else { return Vec::new() };
    let (min, max) = scores.iter().fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|&s| (s - min) / range).collect()
}

pub fn normalize_candidates(candidates: Vec<Candidate>) -> Vec<NormalizedCandidate> {
    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    candidates
        .into_iter()
        .zip(min_max_normalize(&scores))
        .map(|(candidate, normalized_score)| NormalizedCandidate { candidate, normalized_score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scales_between_min_and_max() {
        let out = min_max_normalize(&[12.0, 8.0, 3.0]);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[2], 0.0);
        assert!((out[1] - 5.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_lists() {
        assert!(min_max_normalize(&[]).is_empty());
        assert_eq!(min_max_normalize(&[0.3]), vec![1.0]);
        assert_eq!(min_max_normalize(&[5.0, 5.0, 5.0]), vec![1.0, 1.0, 1.0]);
        assert_eq!(min_max_normalize(&[0.0, 0.0]), vec![1.0, 1.0]);
    }

    #[test]
    fn candidates_keep_order_and_payload() {
        let c = |id, score| Candidate { chunk_id: id, text: format!("t{}", id), context: String::new(), score };
        let out = normalize_candidates(vec![c(4, 0.9), c(2, 0.1)]);
        assert_eq!(out[0].candidate.chunk_id, 4);
        assert_eq!(out[0].normalized_score, 1.0);
        assert_eq!(out[1].candidate.text, "t2");
        assert_eq!(out[1].normalized_score, 0.0);
    }

    proptest! {
        #[test]
        fn normalized_scores_stay_in_unit_range(scores in prop::collection::vec(-1.0e6f32..1.0e6, 1..64)) {
            let out = min_max_normalize(&scores);
            prop_assert_eq!(out.len(), scores.len());
            for v in &out {
                prop_assert!((0.0..=1.0).contains(v), "{} out of range", v);
            }
            let max = scores.iter().cloned().fold(f32::MIN, f32::max);
            let min = scores.iter().cloned().fold(f32::MAX, f32::min);
            for (s, v) in scores.iter().zip(&out) {
                if *s == max { prop_assert_eq!(*v, 1.0); }
                if *s == min && min != max { prop_assert_eq!(*v, 0.0); }
            }
        }

        #[test]
        fn equal_scores_normalize_to_one(score in -1.0e6f32..1.0e6, n in 1usize..32) {
            prop_assert!(min_max_normalize(&vec![score; n]).iter().all(|v| *v == 1.0));
        }
    }
}
