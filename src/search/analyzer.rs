use crate::search::signals::{QueryText, SignalTable};
use crate::search::types::{Complexity, Strategy};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Two upper-case letters followed by digits, e.g. `AA123`.
fn flight_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[A-Z]{2}\d+\b").expect("static regex"))
}

pub fn flight_codes(query: &str) -> Vec<&str> {
    flight_code_pattern()
        .find_iter(query)
        .map(|m| m.as_str())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Analysis {
    pub score: u32,
    pub complexity: Complexity,
    pub strategy: Strategy,
}

#[derive(Clone)]
pub struct QueryAnalyzer {
    signals: Arc<SignalTable>,
}

impl QueryAnalyzer {
    pub fn new(signals: Arc<SignalTable>) -> Self {
        Self { signals }
    }

    pub fn analyze(&self, query: &str) -> Analysis {
        let text = QueryText::new(query);
        let score = self.signals.score(&text);
        let complexity = complexity_for(score);
        let strategy = if !flight_codes(query).is_empty() {
            Strategy::Exact
        } else if complexity == Complexity::Complex {
            Strategy::Hybrid
        } else {
            Strategy::Similarity
        };
        tracing::debug!(
            score,
            ?complexity,
            %strategy,
            signals = ?self.signals.detect(&text),
            "query analyzed"
        );
        Analysis {
            score,
            complexity,
            strategy,
        }
    }
}

pub fn complexity_for(score: u32) -> Complexity {
    match score {
        0..=1 => Complexity::Simple,
        2..=3 => Complexity::Moderate,
        _ => Complexity::Complex,
    }
}

pub fn result_count(complexity: Complexity, total: usize) -> usize {
    match complexity {
        Complexity::Simple => (total / 50).clamp(1, 3),
        Complexity::Moderate => (total / 25).clamp(3, 8),
        Complexity::Complex => (total / 15).clamp(5, 15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> QueryAnalyzer {
        QueryAnalyzer::new(Arc::new(SignalTable::default()))
    }

    #[test]
    fn flight_codes_force_exact() {
        let a = analyzer();
        assert_eq!(a.analyze("AA123").strategy, Strategy::Exact);
        let busy = a.analyze("compare AA123 vs DL456 from boston to miami cheap business or first");
        assert_eq!(busy.complexity, Complexity::Complex);
        assert_eq!(busy.strategy, Strategy::Exact);
    }

    #[test]
    fn lowercase_codes_are_not_flight_numbers() {
        assert!(flight_codes("aa123").is_empty());
        assert!(flight_codes("AAA123").is_empty());
        assert_eq!(flight_codes("is UA205 on time?"), vec!["UA205"]);
    }

    #[test]
    fn comparison_with_two_more_signals_is_complex_hybrid() {
        let a = analyzer();
        let r = a.analyze("compare cheap flights from boston");
        assert_eq!(r.score, 4);
        assert_eq!(r.complexity, Complexity::Complex);
        assert_eq!(r.strategy, Strategy::Hybrid);

        let r = a.analyze("Delta vs United for a business trip tomorrow");
        assert_eq!(r.complexity, Complexity::Complex);
        assert_eq!(r.strategy, Strategy::Hybrid);
    }

    #[test]
    fn cheap_flights_to_miami_is_moderate_similarity() {
        let r = analyzer().analyze("cheap flights to Miami under $300");
        assert_eq!(r.score, 2);
        assert_eq!(r.complexity, Complexity::Moderate);
        assert_eq!(r.strategy, Strategy::Similarity);
    }

    #[test]
    fn plain_query_is_simple() {
        let r = analyzer().analyze("Seattle");
        assert_eq!(r.complexity, Complexity::Simple);
        assert_eq!(r.strategy, Strategy::Similarity);
    }

    #[test]
    fn tier_bounds_are_inclusive() {
        assert_eq!(complexity_for(0), Complexity::Simple);
        assert_eq!(complexity_for(1), Complexity::Simple);
        assert_eq!(complexity_for(2), Complexity::Moderate);
        assert_eq!(complexity_for(3), Complexity::Moderate);
        assert_eq!(complexity_for(4), Complexity::Complex);
    }

    #[test]
    fn sizing_follows_tiers() {
        assert_eq!(result_count(Complexity::Simple, 500), 3);
        assert_eq!(result_count(Complexity::Simple, 10), 1);
        assert_eq!(result_count(Complexity::Moderate, 1000), 8);
        assert_eq!(result_count(Complexity::Complex, 30), 5);
        assert_eq!(result_count(Complexity::Moderate, 50), 3);
        assert_eq!(result_count(Complexity::Complex, 0), 5);
    }
}
