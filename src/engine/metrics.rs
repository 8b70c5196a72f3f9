use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    flights_added_total: AtomicU64,
    flights_rejected_total: AtomicU64,
    searches_total: AtomicU64,
    search_failures_total: AtomicU64,
    results_returned_total: AtomicU64,
    resets_total: AtomicU64,
}

impl Metrics {
    pub fn inc_flights_added(&self) {
        self.flights_added_total.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_flights_rejected(&self) {
        self.flights_rejected_total.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_searches(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_search_failures(&self) {
        self.search_failures_total.fetch_add(1, Ordering::Relaxed);
    }
    pub fn add_results_returned(&self, n: usize) {
        self.results_returned_total
            .fetch_add(n as u64, Ordering::Relaxed);
    }
    pub fn inc_resets(&self) {
        self.resets_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn searches(&self) -> u64 {
        self.searches_total.load(Ordering::Relaxed)
    }

    pub fn render(&self) -> String {
        let added = self.flights_added_total.load(Ordering::Relaxed);
        let rejected = self.flights_rejected_total.load(Ordering::Relaxed);
        let searches = self.searches_total.load(Ordering::Relaxed);
        let failures = self.search_failures_total.load(Ordering::Relaxed);
        let results = self.results_returned_total.load(Ordering::Relaxed);
        let resets = self.resets_total.load(Ordering::Relaxed);

        format!(
            concat!(
                "# TYPE flights_added_total counter\n",
                "flights_added_total {}\n",
                "# TYPE flights_rejected_total counter\n",
                "flights_rejected_total {}\n",
                "# TYPE searches_total counter\n",
                "searches_total {}\n",
                "# TYPE search_failures_total counter\n",
                "search_failures_total {}\n",
                "# TYPE results_returned_total counter\n",
                "results_returned_total {}\n",
                "# TYPE store_resets_total counter\n",
                "store_resets_total {}\n",
            ),
            added, rejected, searches, failures, results, resets
        )
    }
}
