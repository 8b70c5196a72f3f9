pub mod analyzer;
pub mod annotate;
pub mod engine;
pub mod executor;
pub mod filters;
pub mod signals;
pub mod types;

pub use engine::SearchEngine;
pub use filters::NumericalFilters;
pub use signals::SignalTable;
pub use types::{
    Complexity, MatchType, SearchError, SearchOptions, SearchResponse, SearchResult, Strategy,
};
