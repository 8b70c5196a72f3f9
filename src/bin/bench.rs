use flight_vdb::config::Config;
use flight_vdb::engine::Engine;
use flight_vdb::flight::FlightRecord;
use flight_vdb::search::SearchOptions;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

const CITIES: [&str; 10] = [
    "New York", "Los Angeles", "Chicago", "Miami", "Seattle", "Boston", "Denver", "Paris",
    "London", "Tokyo",
];
const AIRLINES: [(&str, &str); 5] = [
    ("American Airlines", "AA"),
    ("Delta Air Lines", "DL"),
    ("United Airlines", "UA"),
    ("Lufthansa", "LH"),
    ("Emirates", "EK"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let n = std::env::var("BENCH_FLIGHTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5_000usize);
    let engine = Engine::new(Config::default())?;
    let mut rng = StdRng::seed_from_u64(7);

    let flights: Vec<FlightRecord> = (0..n).map(|i| synthetic_flight(&mut rng, i)).collect();
    let start = Instant::now();
    let report = engine.add_flights(&flights);
    println!(
        "seed: added={} failed={} in {:?}",
        report.added,
        report.failed,
        start.elapsed()
    );

    let queries = [
        "AA150",
        "Seattle",
        "cheap flights to Miami under $300",
        "compare Delta vs United business class from Boston to Paris tomorrow",
    ];
    for query in queries {
        let mut lat = Vec::with_capacity(500);
        for _ in 0..500usize {
            let start = Instant::now();
            let _ = engine.search(query, SearchOptions::default()).await?;
            lat.push(start.elapsed());
        }
        report_latency(query, &lat);
    }

    print!("{}", engine.metrics_text());
    Ok(())
}

fn synthetic_flight(rng: &mut StdRng, i: usize) -> FlightRecord {
    let from = CITIES[rng.gen_range(0..CITIES.len())];
    let mut to = CITIES[rng.gen_range(0..CITIES.len())];
    while to == from {
        to = CITIES[rng.gen_range(0..CITIES.len())];
    }
    let (airline, code) = AIRLINES[rng.gen_range(0..AIRLINES.len())];
    let dep = rng.gen_range(5 * 60..23 * 60);
    let arr = (dep + rng.gen_range(60..15 * 60)) % (24 * 60);
    FlightRecord {
        id: format!("flight_{:05}", i + 1),
        flight_number: format!("{code}{}", 100 + i),
        airline: airline.to_string(),
        departure_city: from.to_string(),
        arrival_city: to.to_string(),
        departure_airport: String::new(),
        arrival_airport: String::new(),
        departure_time: format!("{:02}:{:02}", dep / 60, dep % 60),
        arrival_time: format!("{:02}:{:02}", arr / 60, arr % 60),
        date: format!("2025-03-{:02}", rng.gen_range(1..=28)),
        price: (rng.gen_range(99.0..1500.0f64) * 100.0).round() / 100.0,
        aircraft_type: "Boeing 737".to_string(),
        available_seats: rng.gen_range(0..150),
        duration_estimate: None,
        class_options: vec!["Economy".to_string()],
    }
}

fn report_latency(name: &str, samples: &[Duration]) {
    let mut v: Vec<u128> = samples.iter().map(|d| d.as_micros()).collect();
    v.sort_unstable();
    let p50 = percentile(&v, 50.0);
    let p95 = percentile(&v, 95.0);
    println!("{name:?}: n={} p50={}us p95={}us", v.len(), p50, p95);
}

fn percentile(sorted: &[u128], p: f64) -> u128 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
