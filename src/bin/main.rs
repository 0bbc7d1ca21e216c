use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodflix_rs::browse::{browse_requests, CategoryAggregator, CategoryOutcome};
use moodflix_rs::capture::{CaptureOrchestrator, StillImageCamera};
use moodflix_rs::catalog::{MovieId, MovieSummary};
use moodflix_rs::{load_config, Clients, ServerError};

#[derive(Parser, Debug)]
#[command(name = "moodflix-server")]
#[command(about = "Movie discovery backend with mood-based suggestions", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "moodflix-server.yaml")]
    config: String,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Fetch all browse categories once and print them.
    Browse,
    /// Search movies by title.
    Search { term: String },
    /// Show details for one movie.
    Movie { id: String },
    /// Detect the mood in an image and suggest movies.
    Mood {
        #[arg(long)]
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug {
        "moodflix_rs=debug,tower_http=debug"
    } else {
        "moodflix_rs=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => moodflix_rs::run(&args.config, args.debug).await,
        Command::Browse => browse(&args.config, args.debug).await,
        Command::Search { term } => search(&args.config, args.debug, &term).await,
        Command::Movie { id } => movie(&args.config, args.debug, &id).await,
        Command::Mood { image } => mood(&args.config, args.debug, image).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn browse(config_path: &str, debug: bool) -> Result<(), ServerError> {
    let config = load_config(config_path, debug)?;
    let clients = Clients::from_config(&config)?;
    let requests = browse_requests(clients.catalog, &config.browse.genres);

    let result = CategoryAggregator::new().run(&requests).await;
    for outcome in &result.outcomes {
        match outcome {
            CategoryOutcome::Success { display_name, movies, .. } => {
                println!("{} ({})", display_name, movies.len());
                print_movies(movies);
            }
            CategoryOutcome::Failure { display_name, error_message, .. } => {
                println!("{} (failed: {})", display_name, error_message);
            }
        }
    }
    if result.had_any_failure {
        eprintln!("Some categories could not be loaded.");
    }
    Ok(())
}

async fn search(config_path: &str, debug: bool, term: &str) -> Result<(), ServerError> {
    let config = load_config(config_path, debug)?;
    let clients = Clients::from_config(&config)?;
    let movies = clients.catalog.search(term).await?;
    if movies.is_empty() {
        println!("No movies found matching \"{}\".", term.trim());
    }
    print_movies(&movies);
    Ok(())
}

async fn movie(config_path: &str, debug: bool, id: &str) -> Result<(), ServerError> {
    let config = load_config(config_path, debug)?;
    let clients = Clients::from_config(&config)?;
    let id = MovieId::new(id).ok_or_else(|| ServerError::Server("No movie ID provided.".to_string()))?;
    let detail = clients.catalog.by_id(&id).await?;

    println!("{} ({})", detail.title, detail.release_year);
    if !detail.tagline.is_empty() {
        println!("  {}", detail.tagline);
    }
    let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    println!("  Rating: {:.1}/10", detail.rating);
    if let Some(runtime) = detail.runtime_minutes {
        println!("  Runtime: {} min", runtime);
    }
    println!("  Genres: {}", genres.join(", "));
    println!("  Poster: {}", detail.poster_url);
    if !detail.overview.is_empty() {
        println!();
        println!("{}", detail.overview);
    }
    Ok(())
}

async fn mood(config_path: &str, debug: bool, image: PathBuf) -> Result<(), ServerError> {
    let config = load_config(config_path, debug)?;
    let clients = Clients::from_config(&config)?;
    let camera = Arc::new(StillImageCamera::new(image));
    let mut orchestrator = CaptureOrchestrator::new(camera, clients.classifier, clients.catalog);

    let result = match orchestrator.start().await {
        Ok(()) => orchestrator.capture_and_analyze().await,
        Err(e) => Err(e),
    };
    orchestrator.stop();

    let suggestions = result.map_err(|e| ServerError::Server(e.to_string()))?;
    println!("Suggestions for {} mood:", suggestions.mood);
    print_movies(&suggestions.movies);
    Ok(())
}

fn print_movies(movies: &[MovieSummary]) {
    for movie in movies {
        println!("  [{}] {}", movie.id, movie.title);
    }
}
