use crate::search::analyzer::flight_codes;
use crate::search::annotate::hybrid_score;
use crate::search::types::{MatchType, SearchError, Strategy};
use crate::vector::{DocumentStore, StoreHit, VectorError};
use std::collections::HashSet;
use std::sync::Arc;

const EXACT_FETCH_CAP: usize = 20;
const HYBRID_FETCH_CAP: usize = 30;
const FLIGHT_NUMBER: &str = "flight_number";

#[derive(Clone, Debug)]
pub struct Candidate {
    pub hit: StoreHit,
    pub match_type: MatchType,
    pub hybrid_score: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plan {
    pub strategy: Strategy,
    pub n: usize,
    pub max_distance: Option<f32>,
}

impl Plan {
    pub fn fetch_k(&self) -> usize {
        match self.strategy {
            Strategy::Exact => self.n.saturating_mul(2).min(EXACT_FETCH_CAP),
            Strategy::Similarity => self.n,
            Strategy::Hybrid => self.n.saturating_mul(3).min(HYBRID_FETCH_CAP),
        }
    }
}

pub struct SearchExecutor {
    store: Arc<dyn DocumentStore>,
}

impl SearchExecutor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn count(&self) -> Result<usize, SearchError> {
        self.blocking(|store| store.count()).await
    }

    pub async fn execute(&self, query: &str, plan: &Plan) -> Result<Vec<Candidate>, SearchError> {
        if plan.n == 0 {
            return Ok(Vec::new());
        }
        let k = plan.fetch_k();
        let text = query.to_string();
        let hits = self.blocking(move |store| store.query(&text, k)).await?;
        tracing::debug!(strategy = %plan.strategy, k, fetched = hits.len(), "store queried");

        let candidates = match plan.strategy {
            Strategy::Exact => {
                let codes: Vec<String> = flight_codes(query).into_iter().map(str::to_string).collect();
                let named = if codes.is_empty() {
                    Vec::new()
                } else {
                    let text = query.to_string();
                    self.blocking(move |store| store.lookup(&text, FLIGHT_NUMBER, &codes))
                        .await?
                };
                tracing::debug!(named = named.len(), "flight numbers looked up");
                exact(query, named, hits, plan.n)
            }
            Strategy::Similarity => similarity(hits, plan.n, plan.max_distance),
            Strategy::Hybrid => hybrid(query, hits, plan.n),
        };
        Ok(candidates)
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, SearchError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> Result<T, VectorError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|err| SearchError::StoreUnavailable(err.to_string()))?
            .map_err(|err| SearchError::StoreUnavailable(err.to_string()))
    }
}

/// Records looked up by flight number first, then the over-fetched
/// neighbours. Any neighbour whose flight number is named in the query is
/// still moved to the front, for stores without a lookup.
fn exact(query: &str, looked_up: Vec<StoreHit>, hits: Vec<StoreHit>, n: usize) -> Vec<Candidate> {
    let codes = flight_codes(query);
    let mut seen = HashSet::new();
    let merged = looked_up
        .into_iter()
        .chain(hits)
        .filter(|hit| seen.insert(hit.id.clone()));
    let (mut named, rest): (Vec<_>, Vec<_>) = merged.partition(|hit| {
        hit.metadata
            .get(FLIGHT_NUMBER)
            .and_then(|v| v.as_str())
            .is_some_and(|num| codes.iter().any(|c| c.eq_ignore_ascii_case(num)))
    });
    named.extend(rest);
    named
        .into_iter()
        .take(n)
        .map(|hit| Candidate {
            hit,
            match_type: MatchType::Exact,
            hybrid_score: None,
        })
        .collect()
}

fn similarity(hits: Vec<StoreHit>, n: usize, max_distance: Option<f32>) -> Vec<Candidate> {
    hits.into_iter()
        .filter(|hit| max_distance.map_or(true, |max| hit.distance <= max))
        .take(n)
        .map(|hit| Candidate {
            hit,
            match_type: MatchType::Semantic,
            hybrid_score: None,
        })
        .collect()
}

fn hybrid(query: &str, hits: Vec<StoreHit>, n: usize) -> Vec<Candidate> {
    let mut scored: Vec<Candidate> = hits
        .into_iter()
        .map(|hit| {
            let score = hybrid_score(query, &hit);
            Candidate {
                hit,
                match_type: MatchType::Hybrid,
                hybrid_score: Some(score),
            }
        })
        .collect();
    scored.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, flight_number: &str, distance: f32) -> StoreHit {
        StoreHit {
            id: id.into(),
            document: format!("flight {flight_number}"),
            metadata: json!({ "flight_number": flight_number, "airline": "Delta Air Lines" }),
            distance,
        }
    }

    #[test]
    fn fetch_widths_are_capped() {
        let plan = |strategy, n| Plan {
            strategy,
            n,
            max_distance: None,
        };
        assert_eq!(plan(Strategy::Exact, 3).fetch_k(), 6);
        assert_eq!(plan(Strategy::Exact, 15).fetch_k(), 20);
        assert_eq!(plan(Strategy::Similarity, 7).fetch_k(), 7);
        assert_eq!(plan(Strategy::Hybrid, 5).fetch_k(), 15);
        assert_eq!(plan(Strategy::Hybrid, 15).fetch_k(), 30);
    }

    #[test]
    fn exact_promotes_named_flight_then_truncates() {
        let hits = vec![
            hit("a", "DL100", 0.1),
            hit("b", "DL101", 0.2),
            hit("c", "AA123", 0.3),
        ];
        let out = exact("where is AA123", Vec::new(), hits, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].hit.id, "c");
        assert_eq!(out[1].hit.id, "a");
        assert!(out.iter().all(|c| c.match_type == MatchType::Exact));
    }

    #[test]
    fn looked_up_flights_lead_without_duplicates() {
        let hits = vec![hit("a", "DL100", 0.1), hit("z", "UA920", 0.95), hit("b", "DL101", 0.2)];
        let looked_up = vec![hit("z", "UA920", 0.95)];
        let out = exact("UA920", looked_up, hits, 2);
        let ids: Vec<&str> = out.iter().map(|c| c.hit.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);

        let out = exact("UA920", vec![hit("z", "UA920", 0.95)], vec![hit("a", "DL100", 0.1)], 3);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn huge_result_counts_do_not_overflow_fetch() {
        let plan = |strategy| Plan {
            strategy,
            n: usize::MAX,
            max_distance: None,
        };
        assert_eq!(plan(Strategy::Exact).fetch_k(), 20);
        assert_eq!(plan(Strategy::Hybrid).fetch_k(), 30);
        assert_eq!(plan(Strategy::Similarity).fetch_k(), usize::MAX);
    }

    #[test]
    fn similarity_drops_far_candidates() {
        let hits = vec![hit("a", "X1", 0.1), hit("b", "X2", 0.5), hit("c", "X3", 0.9)];
        let out = similarity(hits.clone(), 3, Some(0.5));
        assert_eq!(out.len(), 2);
        assert!(similarity(hits.clone(), 3, Some(0.01)).is_empty());
        assert_eq!(similarity(hits, 2, None).len(), 2);
    }

    #[test]
    fn hybrid_reranks_by_blended_score() {
        let mut near = hit("near", "DL1", 0.30);
        near.document = "unrelated words".into();
        let mut lexical = hit("lexical", "DL2", 0.35);
        lexical.document = "delta to miami".into();
        let out = hybrid("delta air lines to miami", vec![near, lexical], 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].hit.id, "lexical");
        assert!(out[0].hybrid_score.unwrap() <= 1.0);
    }
}
