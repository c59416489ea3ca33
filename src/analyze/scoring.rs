//! Heuristic ranking of candidates.
//!
//! `score = recency_weight * manual_boost * link_bonus`
//! - `recency_weight = 0.5^(age_hours / half_life_hours)`
//! - `manual_boost   = 1.5` for manual seeds, else `1.0`
//! - `link_bonus     = min(1.2, 0.8 + 0.1 * max(1, links))`

use chrono::{DateTime, Utc};

use crate::model::Candidate;

pub const DEFAULT_HALF_LIFE_HOURS: f64 = 24.0;
const MANUAL_BOOST: f64 = 1.5;

#[derive(Clone, Copy, Debug)]
pub struct CandidateScorer {
    half_life_hours: f64,
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_LIFE_HOURS)
    }
}

impl CandidateScorer {
    /// Non-positive half-lives fall back to the default.
    pub fn new(half_life_hours: f64) -> Self {
        let half_life_hours = if half_life_hours > 0.0 {
            half_life_hours
        } else {
            DEFAULT_HALF_LIFE_HOURS
        };
        Self { half_life_hours }
    }

    pub fn score_one(&self, candidate: &Candidate, now: DateTime<Utc>) -> f64 {
        let age_secs = now
            .signed_duration_since(candidate.published_at)
            .num_seconds()
            .max(0) as f64;
        let age_hours = age_secs / 3600.0;
        let recency_weight = 0.5f64.powf(age_hours / self.half_life_hours);
        let manual_boost = if candidate.manual_seed { MANUAL_BOOST } else { 1.0 };
        let link_count = candidate.corroborating_links.len().max(1) as f64;
        let link_bonus = (0.8 + 0.1 * link_count).min(1.2);
        // Very old items underflow to 0; keep the score strictly positive.
        (recency_weight * manual_boost * link_bonus).max(f64::MIN_POSITIVE)
    }

    /// Score every candidate and return them ranked, best first.
    /// Equal scores keep their input order.
    pub fn score(&self, candidates: Vec<Candidate>, now: DateTime<Utc>) -> Vec<Candidate> {
        let mut scored: Vec<Candidate> = candidates
            .into_iter()
            .map(|c| {
                let s = self.score_one(&c, now);
                c.with_score(s)
            })
            .collect();
        // `sort_by` is stable.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        tracing::info!(target: "analyze", total = scored.len(), "candidates scored");
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceLink;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 2, 12, 0, 0).unwrap()
    }

    fn candidate(id: &str, age_hours: i64, links: usize, manual: bool) -> Candidate {
        Candidate {
            id: id.into(),
            title: id.into(),
            summary: String::new(),
            why_it_matters: String::new(),
            published_at: now() - Duration::hours(age_hours),
            source: "test".into(),
            url: format!("https://example.org/{id}"),
            score: 0.0,
            tags: vec![],
            corroborating_links: (0..links)
                .map(|i| SourceLink::new("l", format!("https://s{i}.example/{id}")))
                .collect(),
            manual_seed: manual,
        }
    }

    #[test]
    fn fresh_single_link_scores_point_nine() {
        let s = CandidateScorer::default().score_one(&candidate("a", 0, 1, false), now());
        assert!((s - 0.9).abs() < 1e-9);
    }

    #[test]
    fn half_life_halves_the_score() {
        let scorer = CandidateScorer::default();
        let fresh = scorer.score_one(&candidate("a", 0, 2, false), now());
        let day_old = scorer.score_one(&candidate("b", 24, 2, false), now());
        assert!((day_old - fresh / 2.0).abs() < 1e-9);
    }

    #[test]
    fn future_dates_count_as_fresh() {
        let scorer = CandidateScorer::default();
        let future = scorer.score_one(&candidate("a", -5, 1, false), now());
        assert!((future - 0.9).abs() < 1e-9);
    }

    #[test]
    fn link_bonus_saturates_at_five_links() {
        let scorer = CandidateScorer::default();
        let five = scorer.score_one(&candidate("a", 0, 5, false), now());
        let nine = scorer.score_one(&candidate("b", 0, 9, false), now());
        assert!((five - 1.2).abs() < 1e-9);
        assert_eq!(five, nine);
        let none = scorer.score_one(&candidate("c", 0, 0, false), now());
        assert!((none - 0.9).abs() < 1e-9);
    }

    #[test]
    fn manual_boost_and_ranking() {
        let out = CandidateScorer::default().score(
            vec![
                candidate("old", 48, 1, false),
                candidate("manual", 6, 1, true),
                candidate("fresh", 0, 1, false),
            ],
            now(),
        );
        let ids: Vec<_> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["manual", "fresh", "old"]);
        assert!(out.iter().all(|c| c.score > 0.0));
    }

    #[test]
    fn ties_keep_input_order() {
        let out = CandidateScorer::default().score(
            vec![
                candidate("x", 3, 1, false),
                candidate("y", 3, 1, false),
                candidate("z", 3, 1, false),
            ],
            now(),
        );
        let ids: Vec<_> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn ancient_items_stay_positive() {
        let s = CandidateScorer::default().score_one(&candidate("a", 24 * 365 * 50, 1, false), now());
        assert!(s > 0.0);
    }
}
