mod metrics;

use crate::config::Config;
use crate::embed::HashEmbedder;
use crate::flight::{FlightError, FlightRecord};
use crate::search::{SearchEngine, SearchError, SearchOptions, SearchResponse, SearchResult, SignalTable};
use crate::vector::{DocumentStore, IndexParams, VectorError, VectorStore};
use anyhow::Context;
use std::sync::Arc;

pub use metrics::Metrics;

/// Entry point for the chat layer: owns the flight collection and the search
/// pipeline built on top of it.
#[derive(Clone)]
pub struct Engine(Arc<Inner>);

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    #[error(transparent)]
    Flight(#[from] FlightError),
    #[error(transparent)]
    Vector(#[from] VectorError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

struct Inner {
    config: Config,
    store: Arc<dyn DocumentStore>,
    search: SearchEngine,
    metrics: Arc<Metrics>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub added: usize,
    pub failed: usize,
}

impl Engine {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let embedder = Arc::new(HashEmbedder::new(config.embed_dim));
        let params = IndexParams::from_config(&config);
        let store = match &config.data_dir {
            Some(dir) => VectorStore::open(dir, &config.collection, embedder, params)
                .context("open vector store")?,
            None => VectorStore::new(embedder, params),
        };
        let signals = match &config.signals_path {
            Some(path) => SignalTable::load(path).context("load signal table")?,
            None => SignalTable::default(),
        };
        Ok(Self::with_store(config, Arc::new(store), signals))
    }

    /// Builds an engine over any store, e.g. a remote index client.
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>, signals: SignalTable) -> Self {
        let search = SearchEngine::new(Arc::clone(&store), Arc::new(signals), config.max_k);
        Self(Arc::new(Inner {
            config,
            store,
            search,
            metrics: Arc::new(Metrics::default()),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.0.metrics.clone()
    }

    pub fn metrics_text(&self) -> String {
        self.0.metrics.render()
    }

    pub fn add_flight(&self, flight: &FlightRecord) -> Result<(), EngineError> {
        let res = flight
            .validate()
            .map_err(EngineError::from)
            .and_then(|()| {
                self.0
                    .store
                    .add(&flight.id, flight.document_text(), flight.metadata())
                    .map_err(EngineError::from)
            });
        match &res {
            Ok(()) => self.0.metrics.inc_flights_added(),
            Err(_) => self.0.metrics.inc_flights_rejected(),
        }
        res
    }

    /// Adds every flight it can; failures are logged and counted, not fatal.
    pub fn add_flights(&self, flights: &[FlightRecord]) -> SeedReport {
        let mut report = SeedReport::default();
        for flight in flights {
            match self.add_flight(flight) {
                Ok(()) => report.added += 1,
                Err(err) => {
                    tracing::warn!(id = %flight.id, flight_number = %flight.flight_number, error = %err, "flight not added");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(added = report.added, failed = report.failed, "flights seeded");
        report
    }

    pub fn count(&self) -> Result<usize, EngineError> {
        Ok(self.0.store.count()?)
    }

    pub fn reset(&self) -> Result<(), EngineError> {
        self.0.store.reset()?;
        self.0.metrics.inc_resets();
        Ok(())
    }

    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, EngineError> {
        Ok(self.search_detailed(query, options).await?.results)
    }

    pub async fn search_detailed(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<SearchResponse, EngineError> {
        self.0.metrics.inc_searches();
        match self.0.search.search_detailed(query, options).await {
            Ok(res) => {
                self.0.metrics.add_results_returned(res.results.len());
                Ok(res)
            }
            Err(err) => {
                tracing::error!(%err, "search failed");
                self.0.metrics.inc_search_failures();
                Err(err.into())
            }
        }
    }
}
