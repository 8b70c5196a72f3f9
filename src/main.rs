use clap::{Args, Parser, Subcommand};
use flight_vdb::config::Config;
use flight_vdb::engine::Engine;
use flight_vdb::flight::load_dataset;
use flight_vdb::search::{NumericalFilters, SearchOptions, SearchResponse, Strategy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flight-vdb", version, about = "Adaptive semantic search over flight records")]
struct Cli {
    /// Directory holding the persisted collection (overrides DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a JSON array of flight records into the collection.
    Seed {
        file: PathBuf,
        /// Wipe the collection before loading.
        #[arg(long)]
        reset: bool,
    },
    /// Run a free-text search.
    Search(SearchArgs),
    /// Print the number of indexed flights.
    Count,
    /// Remove every flight from the collection.
    Reset,
}

#[derive(Args)]
struct SearchArgs {
    query: String,
    /// Fixed number of results instead of complexity-based sizing.
    #[arg(long)]
    results: Option<usize>,
    /// exact, similarity or hybrid.
    #[arg(long)]
    strategy: Option<Strategy>,
    /// Drop similarity results farther than this cosine distance.
    #[arg(long)]
    max_distance: Option<f32>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_price: Option<f64>,
    /// Maximum flight duration in hours.
    #[arg(long)]
    max_duration: Option<f64>,
    #[arg(long)]
    min_seats: Option<u64>,
    #[arg(long)]
    depart_after: Option<String>,
    #[arg(long)]
    depart_before: Option<String>,
    #[arg(long)]
    arrive_after: Option<String>,
    #[arg(long)]
    arrive_before: Option<String>,
    /// Print the full response as JSON.
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        let filters = NumericalFilters {
            max_price: self.max_price,
            min_price: self.min_price,
            max_duration_hours: self.max_duration,
            min_available_seats: self.min_seats,
            departure_after: self.depart_after.clone(),
            departure_before: self.depart_before.clone(),
            arrival_after: self.arrive_after.clone(),
            arrival_before: self.arrive_before.clone(),
        };
        SearchOptions {
            result_count: self.results,
            strategy: self.strategy,
            max_distance: self.max_distance,
            numerical_filters: (!filters.is_empty()).then_some(filters),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }
    if config.data_dir.is_none() {
        tracing::warn!("no DATA_DIR set, using an in-memory collection");
    }
    let engine = Engine::new(config)?;

    match cli.command {
        Command::Seed { file, reset } => {
            let flights = load_dataset(&file)?;
            if reset {
                engine.reset()?;
            }
            let report = engine.add_flights(&flights);
            println!(
                "added {} of {} flights ({} failed), {} now indexed",
                report.added,
                flights.len(),
                report.failed,
                engine.count()?
            );
        }
        Command::Search(args) => {
            let response = engine.search_detailed(&args.query, args.options()).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Command::Count => println!("{}", engine.count()?),
        Command::Reset => {
            engine.reset()?;
            println!("collection reset");
        }
    }
    Ok(())
}

fn print_response(response: &SearchResponse) {
    println!(
        "{:?} query, {} strategy, n={}, {} retrieved, {} after filters",
        response.complexity,
        response.strategy,
        response.result_count,
        response.total_found,
        response.results.len()
    );
    for (i, r) in response.results.iter().enumerate() {
        let field = |name: &str| {
            r.metadata
                .get(name)
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .unwrap_or_default()
        };
        println!(
            "{:>2}. {} {}  {} -> {}  {} {}-{}  ${}  [{} {:.3}]",
            i + 1,
            field("flight_number"),
            field("airline"),
            field("departure_city"),
            field("arrival_city"),
            field("date"),
            field("departure_time"),
            field("arrival_time"),
            field("price"),
            r.match_type,
            r.similarity_score,
        );
        if !r.relevance_factors.is_empty() {
            println!("    {}", r.relevance_factors.join("; "));
        }
    }
}
