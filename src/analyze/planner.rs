//! Selection and sequencing of digest items.

use crate::model::{Candidate, DigestItem};

pub const DEFAULT_REQUIRE_CORROBORATION: usize = 2;

#[derive(Clone, Copy, Debug)]
pub struct DigestPlanner {
    items_max: usize,
    /// Minimum corroborating links per candidate; 0 disables the check.
    require_corroboration: usize,
}

impl DigestPlanner {
    pub fn new(items_max: usize, require_corroboration: Option<usize>) -> Self {
        Self {
            items_max,
            require_corroboration: require_corroboration.unwrap_or(DEFAULT_REQUIRE_CORROBORATION),
        }
    }

    /// Walk the first `items_max` ranked candidates and keep those with enough
    /// corroboration. Skipped positions are not refilled from further down.
    pub fn plan(&self, ranked: &[Candidate]) -> Vec<DigestItem> {
        let mut items: Vec<DigestItem> = Vec::new();
        for candidate in ranked.iter().take(self.items_max) {
            let have = candidate.corroborating_links.len();
            if self.require_corroboration > 0 && have < self.require_corroboration {
                tracing::debug!(
                    target: "analyze",
                    candidate_id = %candidate.id,
                    have,
                    need = self.require_corroboration,
                    "candidate skipped: insufficient corroboration"
                );
                continue;
            }
            let summary = candidate.summary.trim();
            let why = candidate.why_it_matters.trim();
            items.push(DigestItem {
                order: items.len() + 1,
                candidate_id: candidate.id.clone(),
                headline: candidate.title.trim().to_string(),
                what_happened: summary.to_string(),
                why_it_matters: if why.is_empty() { summary } else { why }.to_string(),
                links: candidate.corroborating_links.clone(),
            });
        }
        tracing::info!(target: "analyze", count = items.len(), "planner selected items");
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceLink;
    use chrono::Utc;

    fn candidate(id: &str, links: usize) -> Candidate {
        Candidate {
            id: id.into(),
            title: format!("  {id} headline "),
            summary: format!("{id} summary"),
            why_it_matters: String::new(),
            published_at: Utc::now(),
            source: "test".into(),
            url: format!("https://example.org/{id}"),
            score: 1.0,
            tags: vec![],
            corroborating_links: (0..links)
                .map(|i| SourceLink::new("l", format!("https://s{i}.example/{id}")))
                .collect(),
            manual_seed: false,
        }
    }

    #[test]
    fn orders_are_contiguous_after_skips() {
        let ranked = vec![candidate("a", 2), candidate("b", 1), candidate("c", 3)];
        let items = DigestPlanner::new(5, Some(2)).plan(&ranked);
        let orders: Vec<_> = items.iter().map(|i| i.order).collect();
        let ids: Vec<_> = items.iter().map(|i| i.candidate_id.as_str()).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(items[0].headline, "a headline");
        assert_eq!(items[0].why_it_matters, "a summary");
    }

    #[test]
    fn top_n_then_filter_does_not_refill() {
        let ranked = vec![candidate("a", 2), candidate("b", 0), candidate("c", 2)];
        let items = DigestPlanner::new(2, Some(2)).plan(&ranked);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].candidate_id, "a");
    }

    #[test]
    fn zero_threshold_disables_check() {
        let ranked = vec![candidate("a", 0), candidate("b", 0), candidate("c", 0)];
        let items = DigestPlanner::new(2, Some(0)).plan(&ranked);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn default_threshold_is_two() {
        let items = DigestPlanner::new(3, None).plan(&[candidate("a", 1)]);
        assert!(items.is_empty());
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        assert!(DigestPlanner::new(8, Some(2)).plan(&[]).is_empty());
    }
}
