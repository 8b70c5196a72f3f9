use crate::search::filters::NumericalFilters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Exact,
    Similarity,
    Hybrid,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "similarity" => Ok(Self::Similarity),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!(
                "unknown strategy {other:?} (expected exact, similarity or hybrid)"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Similarity => "similarity",
            Self::Hybrid => "hybrid",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Exact,
    Semantic,
    Hybrid,
    MultiFactor,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
            Self::MultiFactor => "multi-factor",
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Overrides dynamic sizing when greater than zero.
    #[serde(default)]
    pub result_count: Option<usize>,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Only honoured by the similarity path.
    #[serde(default)]
    pub max_distance: Option<f32>,
    #[serde(default)]
    pub numerical_filters: Option<NumericalFilters>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    pub distance: f32,
    pub similarity_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_score: Option<f32>,
    pub match_type: MatchType,
    pub relevance_factors: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub complexity: Complexity,
    pub strategy: Strategy,
    pub result_count: usize,
    /// Results produced by retrieval, before the numerical filter stage.
    pub total_found: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search failed: {0}")]
    StoreUnavailable(String),
}
