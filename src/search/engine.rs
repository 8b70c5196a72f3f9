use crate::search::analyzer::{result_count, QueryAnalyzer};
use crate::search::annotate::RelevanceAnnotator;
use crate::search::executor::{Plan, SearchExecutor};
use crate::search::filters::apply_numerical_filters;
use crate::search::signals::SignalTable;
use crate::search::types::{Complexity, SearchError, SearchOptions, SearchResponse, SearchResult};
use crate::vector::DocumentStore;
use std::sync::Arc;

/// Analyze, retrieve, annotate, filter. Read-only against the store.
pub struct SearchEngine {
    analyzer: QueryAnalyzer,
    executor: SearchExecutor,
    annotator: RelevanceAnnotator,
    max_k: usize,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, signals: Arc<SignalTable>, max_k: usize) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(Arc::clone(&signals)),
            executor: SearchExecutor::new(store),
            annotator: RelevanceAnnotator::new(signals),
            max_k: max_k.max(1),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Ok(self.search_detailed(query, options).await?.results)
    }

    pub async fn search_detailed(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        let analysis = self.analyzer.analyze(query);
        let strategy = options.strategy.unwrap_or(analysis.strategy);

        let total = self.executor.count().await?;
        if total == 0 {
            tracing::debug!("empty index, nothing to search");
            return Ok(SearchResponse {
                query: query.to_string(),
                complexity: analysis.complexity,
                strategy,
                result_count: 0,
                total_found: 0,
                results: Vec::new(),
            });
        }

        let n = self.size(analysis.complexity, total, options.result_count);
        let plan = Plan {
            strategy,
            n,
            max_distance: options.max_distance,
        };
        tracing::debug!(total, n, strategy = %strategy, "search planned");

        let candidates = self.executor.execute(query, &plan).await?;
        let annotated = self.annotator.annotate(query, candidates);
        let total_found = annotated.len();
        let results = match &options.numerical_filters {
            Some(filters) => apply_numerical_filters(annotated, filters),
            None => annotated,
        };

        Ok(SearchResponse {
            query: query.to_string(),
            complexity: analysis.complexity,
            strategy,
            result_count: n,
            total_found,
            results,
        })
    }

    fn size(&self, complexity: Complexity, total: usize, requested: Option<usize>) -> usize {
        match requested {
            Some(n) if n > 0 => {
                if n > self.max_k {
                    tracing::warn!(requested = n, max_k = self.max_k, "result count capped");
                }
                n.min(self.max_k)
            }
            _ => result_count(complexity, total),
        }
    }
}
