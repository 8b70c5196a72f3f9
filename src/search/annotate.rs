use crate::search::executor::Candidate;
use crate::search::signals::{QueryText, SignalTable};
use crate::search::types::{MatchType, SearchResult};
use crate::vector::StoreHit;
use std::collections::HashSet;
use std::sync::Arc;

const SEMANTIC_WEIGHT: f32 = 0.7;
const KEYWORD_WEIGHT: f32 = 0.2;
const AIRLINE_BONUS: f32 = 0.1;
const HIGH_SIMILARITY: f32 = 0.8;
const GOOD_SIMILARITY: f32 = 0.6;
const FIELD_MATCH: &str = "match:";

/// Blend of vector similarity, keyword overlap and an airline bonus, capped
/// at 1.0 from above only.
pub fn hybrid_score(query: &str, hit: &StoreHit) -> f32 {
    let base = 1.0 - hit.distance;
    let query_lower = query.to_lowercase();
    let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
    let overlap = if query_words.is_empty() {
        0.0
    } else {
        let doc_lower = hit.document.to_lowercase();
        let doc_words: HashSet<&str> = doc_lower.split_whitespace().collect();
        query_words.intersection(&doc_words).count() as f32 / query_words.len() as f32
    };
    let bonus = match meta_str(&hit.metadata, "airline") {
        Some(airline) if !airline.is_empty() && query_lower.contains(&airline.to_lowercase()) => {
            AIRLINE_BONUS
        }
        _ => 0.0,
    };
    (SEMANTIC_WEIGHT * base + KEYWORD_WEIGHT * overlap + bonus).min(1.0)
}

#[derive(Clone)]
pub struct RelevanceAnnotator {
    signals: Arc<SignalTable>,
}

impl RelevanceAnnotator {
    pub fn new(signals: Arc<SignalTable>) -> Self {
        Self { signals }
    }

    pub fn annotate(&self, query: &str, candidates: Vec<Candidate>) -> Vec<SearchResult> {
        let text = QueryText::new(query);
        candidates
            .into_iter()
            .map(|c| self.annotate_one(&text, c))
            .collect()
    }

    fn annotate_one(&self, text: &QueryText, candidate: Candidate) -> SearchResult {
        let Candidate {
            hit,
            match_type,
            hybrid_score,
        } = candidate;
        // Not clamped: cosine distance lies in [0, 2].
        let similarity_score = 1.0 - hit.distance;
        let factors = self.factors(text, &hit.metadata, similarity_score);
        let match_type = finalize_match_type(&factors, match_type);
        SearchResult {
            id: hit.id,
            document: hit.document,
            metadata: hit.metadata,
            distance: hit.distance,
            similarity_score,
            hybrid_score,
            match_type,
            relevance_factors: factors,
        }
    }

    fn factors(
        &self,
        text: &QueryText,
        metadata: &serde_json::Value,
        similarity_score: f32,
    ) -> Vec<String> {
        let lower = text.lower();
        let mut factors = Vec::new();
        for (field, label) in [
            ("airline", "airline"),
            ("departure_city", "departure city"),
            ("arrival_city", "arrival city"),
        ] {
            if let Some(value) = meta_str(metadata, field) {
                if !value.is_empty() && lower.contains(&value.to_lowercase()) {
                    factors.push(format!("{label} {FIELD_MATCH} {value}"));
                }
            }
        }

        if self.signals.is_budget_query(text) {
            if let Some(price) = metadata.get("price").and_then(|v| v.as_f64()) {
                if price < self.signals.budget_price_ceiling {
                    factors.push(format!("budget-friendly price: ${price:.2}"));
                }
            }
        }

        if similarity_score > HIGH_SIMILARITY {
            factors.push("high semantic similarity".to_string());
        } else if similarity_score > GOOD_SIMILARITY {
            factors.push("good semantic match".to_string());
        }
        factors
    }
}

/// More than two factors is a multi-factor match; any matched field makes it
/// exact; otherwise the retrieval path's own label stands.
fn finalize_match_type(factors: &[String], path: MatchType) -> MatchType {
    if factors.len() > 2 {
        MatchType::MultiFactor
    } else if factors.iter().any(|f| f.contains(FIELD_MATCH)) {
        MatchType::Exact
    } else {
        path
    }
}

fn meta_str<'a>(metadata: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    metadata.get(field).and_then(|v| v.as_str())
}
