//! Scorer & Ranker
//!
//! Composite importance score in [0, 100]: contribution, skill diversity,
//! duration and file count, min-max normalised over the batch being
//! ranked, weighted by the persisted score configuration. Deterministic
//! given inputs.

use chrono::{DateTime, Utc};

use crate::config::ScoreWeights;
use crate::constants::scoring::SCORE_SCALE;
use crate::types::ScoreBreakdown;

/// Raw per-project signals the scorer consumes.
#[derive(Debug, Clone)]
pub struct ScoreInputs {
    pub project_id: i64,
    pub name: String,
    /// 0-100; solo projects with no other contributors report 100.
    pub contribution_pct: f64,
    /// |tools| + |practices|.
    pub skill_count: u64,
    pub duration_days: u64,
    pub file_count: u64,
    pub last_commit: Option<DateTime<Utc>>,
}

/// One scored project.
#[derive(Debug, Clone)]
pub struct ScoredProject {
    pub project_id: i64,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub rank: i64,
}

/// Score and rank a batch. Ranks start at 1; ties are broken by higher
/// file count, more recent last commit, then lexicographic name.
pub fn score_batch(inputs: &[ScoreInputs], weights: &ScoreWeights) -> Vec<ScoredProject> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let weights = weights.normalised();

    let contribution = Normaliser::over(inputs, |i| i.contribution_pct);
    let diversity = Normaliser::over(inputs, |i| i.skill_count as f64);
    let duration = Normaliser::over(inputs, |i| i.duration_days as f64);
    let files = Normaliser::over(inputs, |i| i.file_count as f64);

    let mut scored: Vec<(usize, ScoredProject)> = inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| {
            let breakdown = ScoreBreakdown {
                contribution: weights.contribution
                    * contribution.normalise(input.contribution_pct)
                    * SCORE_SCALE,
                diversity: weights.diversity
                    * diversity.normalise(input.skill_count as f64)
                    * SCORE_SCALE,
                duration: weights.duration
                    * duration.normalise(input.duration_days as f64)
                    * SCORE_SCALE,
                file_count: weights.file_count
                    * files.normalise(input.file_count as f64)
                    * SCORE_SCALE,
            };
            (
                idx,
                ScoredProject {
                    project_id: input.project_id,
                    score: breakdown.total(),
                    breakdown,
                    rank: 0,
                },
            )
        })
        .collect();

    scored.sort_by(|(a_idx, a), (b_idx, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| inputs[*b_idx].file_count.cmp(&inputs[*a_idx].file_count))
            .then_with(|| inputs[*b_idx].last_commit.cmp(&inputs[*a_idx].last_commit))
            .then_with(|| inputs[*a_idx].name.cmp(&inputs[*b_idx].name))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (_, mut project))| {
            project.rank = position as i64 + 1;
            project
        })
        .collect()
}

/// Min-max normalisation over the batch. A constant column normalises to
/// 1.0 so a single-project batch does not zero itself out.
struct Normaliser {
    min: f64,
    max: f64,
}

impl Normaliser {
    fn over(inputs: &[ScoreInputs], f: impl Fn(&ScoreInputs) -> f64) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for input in inputs {
            let value = f(input);
            min = min.min(value);
            max = max.max(value);
        }
        Self { min, max }
    }

    fn normalise(&self, value: f64) -> f64 {
        if (self.max - self.min).abs() < f64::EPSILON {
            if self.max > 0.0 { 1.0 } else { 0.0 }
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(id: i64, name: &str, pct: f64, skills: u64, days: u64, files: u64) -> ScoreInputs {
        ScoreInputs {
            project_id: id,
            name: name.to_string(),
            contribution_pct: pct,
            skill_count: skills,
            duration_days: days,
            file_count: files,
            last_commit: None,
        }
    }

    #[test]
    fn test_scores_bounded_and_ordered() {
        let inputs = vec![
            input(1, "big", 100.0, 10, 365, 200),
            input(2, "small", 20.0, 2, 10, 5),
        ];
        let scored = score_batch(&inputs, &ScoreWeights::default());
        assert_eq!(scored[0].project_id, 1);
        assert_eq!(scored[0].rank, 1);
        assert_eq!(scored[1].rank, 2);
        assert!(scored[0].score <= 100.0 + 1e-9);
        assert!(scored[1].score >= 0.0);
        assert!((scored[0].score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_project_batch() {
        let scored = score_batch(
            &[input(1, "only", 100.0, 4, 30, 12)],
            &ScoreWeights::default(),
        );
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].rank, 1);
        // All columns constant and positive: full marks.
        assert!((scored[0].score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_broken_by_file_count_then_name() {
        let inputs = vec![
            input(1, "beta", 50.0, 3, 10, 40),
            input(2, "alpha", 50.0, 3, 10, 40),
            input(3, "gamma", 50.0, 3, 10, 90),
        ];
        let scored = score_batch(&inputs, &ScoreWeights::default());
        // gamma wins its file-count component, so it leads outright.
        assert_eq!(scored[0].project_id, 3);
        // Remaining two tie completely; name breaks it.
        assert_eq!(scored[1].project_id, 2);
        assert_eq!(scored[2].project_id, 1);
    }

    #[test]
    fn test_rank_set_is_one_to_n() {
        let inputs: Vec<ScoreInputs> = (0..5)
            .map(|i| input(i, &format!("p{}", i), i as f64 * 10.0, i as u64, 0, 0))
            .collect();
        let scored = score_batch(&inputs, &ScoreWeights::default());
        let mut ranks: Vec<i64> = scored.iter().map(|s| s.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_weights_shift_outcomes() {
        let inputs = vec![
            input(1, "contributor", 100.0, 0, 0, 0),
            input(2, "collector", 0.0, 10, 0, 0),
        ];
        let contribution_heavy = ScoreWeights {
            contribution: 1.0,
            diversity: 0.0,
            duration: 0.0,
            file_count: 0.0,
        };
        let scored = score_batch(&inputs, &contribution_heavy);
        assert_eq!(scored[0].project_id, 1);

        let diversity_heavy = ScoreWeights {
            contribution: 0.0,
            diversity: 1.0,
            duration: 0.0,
            file_count: 0.0,
        };
        let scored = score_batch(&inputs, &diversity_heavy);
        assert_eq!(scored[0].project_id, 2);
    }

    #[test]
    fn test_deterministic() {
        let inputs = vec![
            input(1, "a", 70.0, 5, 100, 50),
            input(2, "b", 30.0, 8, 200, 20),
        ];
        let first = score_batch(&inputs, &ScoreWeights::default());
        let second = score_batch(&inputs, &ScoreWeights::default());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.project_id, b.project_id);
            assert!((a.score - b.score).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_recency_tiebreak() {
        let ts = |d| Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap();
        let mut older = input(1, "older", 50.0, 3, 10, 40);
        older.last_commit = Some(ts(1));
        let mut newer = input(2, "newer", 50.0, 3, 10, 40);
        newer.last_commit = Some(ts(20));
        let scored = score_batch(&[older, newer], &ScoreWeights::default());
        assert_eq!(scored[0].project_id, 2);
    }
}
