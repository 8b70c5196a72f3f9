use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: Option<String>,
    pub collection: String,
    pub embed_dim: usize,
    pub max_k: usize,
    pub hnsw_max_conn: usize,
    pub hnsw_ef_construction: usize,
    pub bruteforce_limit: usize,
    pub segment_max_items: usize,
    pub signals_path: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("DATA_DIR").ok();

        let collection = std::env::var("COLLECTION").unwrap_or_else(|_| "flights".to_string());
        if collection.is_empty() || collection.contains(['/', '\\']) {
            anyhow::bail!("invalid COLLECTION name: {collection:?}");
        }

        let embed_dim = std::env::var("EMBED_DIM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024);

        let max_k = std::env::var("MAX_K")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        let hnsw_max_conn = std::env::var("HNSW_MAX_CONN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(16);

        let hnsw_ef_construction = std::env::var("HNSW_EF_CONSTRUCTION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);

        let bruteforce_limit = std::env::var("BRUTEFORCE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(512);

        let segment_max_items = std::env::var("SEGMENT_MAX_ITEMS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8_192);

        let signals_path = std::env::var("SIGNALS_PATH").ok();

        if embed_dim == 0 {
            anyhow::bail!("EMBED_DIM must be greater than zero");
        }

        Ok(Self {
            data_dir,
            collection,
            embed_dim,
            max_k: max_k.max(1),
            hnsw_max_conn,
            hnsw_ef_construction,
            bruteforce_limit,
            segment_max_items: segment_max_items.max(1),
            signals_path,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            collection: "flights".to_string(),
            embed_dim: 1024,
            max_k: 100,
            hnsw_max_conn: 16,
            hnsw_ef_construction: 200,
            bruteforce_limit: 512,
            segment_max_items: 8_192,
            signals_path: None,
        }
    }
}
