//! Per-player match records and competition ranking

/// Kills, deaths, and (for survival modes) how long the player lasted
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStats {
    pub kills: u32,
    pub deaths: u32,
    /// Seconds survived; set when the player dies in a no-respawn mode
    pub time_alive: Option<f32>,
}

/// Standard competition ranking: rank = 1 + number of strictly higher scores
///
/// Ties share the better rank and the next distinct score skips ahead,
/// so `[5, 3, 5, 1]` ranks as `[1, 3, 1, 4]`.
pub fn competition_ranks(scores: &[f64]) -> Vec<usize> {
    scores
        .iter()
        .map(|score| 1 + scores.iter().filter(|other| *other > score).count())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ties_share_rank() {
        assert_eq!(competition_ranks(&[5.0, 3.0, 5.0, 1.0]), vec![1, 3, 1, 4]);
    }

    #[test]
    fn test_all_tied() {
        assert_eq!(competition_ranks(&[2.0, 2.0, 2.0]), vec![1, 1, 1]);
        assert!(competition_ranks(&[]).is_empty());
    }

    #[test]
    fn test_fractional_scores_not_truncated() {
        assert_eq!(competition_ranks(&[10.4, 10.6]), vec![2, 1]);
    }

    proptest! {
        #[test]
        fn prop_best_score_ranks_first(scores in prop::collection::vec(-1000i32..1000, 1..12)) {
            let scores: Vec<f64> = scores.into_iter().map(f64::from).collect();
            let ranks = competition_ranks(&scores);
            let best = scores.iter().cloned().fold(f64::MIN, f64::max);
            for (score, rank) in scores.iter().zip(&ranks) {
                prop_assert!(*rank >= 1 && *rank <= scores.len());
                prop_assert_eq!(*rank == 1, *score == best);
            }
        }
    }
}
