use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use movie_client::{Movie, MovieId, MockRecommender, Recommender, RecommenderClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{MovieStore, ResponseOrdering, StoreConfig};
use tracing::{info, warn};

/// ReelPicks - sequence-based movie recommendations
#[derive(Parser)]
#[command(name = "reel-picks")]
#[command(about = "Search movies and get predictions from a sequence of favourites", long_about = None)]
struct Cli {
    /// Base URL of the recommendation service
    #[arg(long, default_value = "http://localhost:5000")]
    api_url: String,

    /// Use the offline mock recommender instead of the service
    #[arg(long)]
    mock: bool,

    /// Artificial response delay of the mock recommender, in milliseconds
    #[arg(long, default_value = "1000")]
    mock_delay_ms: u64,

    /// Drop responses that answer an older request than the latest one issued
    #[arg(long)]
    latest_issued_wins: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for movies by free text
    Search {
        /// Text to search for
        #[arg(long)]
        query: String,
    },

    /// Predict movies for a raw sequence of movie ids
    Predict {
        /// Movie ids in watch order
        #[arg(long, num_args = 1.., value_delimiter = ',', required = true)]
        ids: Vec<MovieId>,
    },

    /// Build a selection from titles and show the predictions for it
    Recommend {
        /// Title to search for; the first hit is selected. Repeat in watch order.
        #[arg(long = "title", required = true)]
        titles: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client: Arc<dyn Recommender> = if cli.mock {
        Arc::new(MockRecommender::new().with_delay(Duration::from_millis(cli.mock_delay_ms)))
    } else {
        Arc::new(
            RecommenderClient::new(&cli.api_url)
                .context("Failed to create recommendation client")?,
        )
    };
    info!("Using {}", client.name());

    let ordering = if cli.latest_issued_wins {
        ResponseOrdering::LatestIssuedWins
    } else {
        ResponseOrdering::LastResolvedWins
    };
    let store = MovieStore::with_config(client.clone(), StoreConfig::default().with_ordering(ordering));

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Search { query } => handle_search(&store, query).await?,
        Commands::Predict { ids } => handle_predict(client.as_ref(), &ids).await?,
        Commands::Recommend { titles } => handle_recommend(&store, titles).await?,
    }

    Ok(())
}

/// Handle the 'search' command
async fn handle_search(store: &MovieStore, query: String) -> Result<()> {
    let start = Instant::now();
    store
        .search_movies(query.clone())
        .await
        .context("Search task panicked")?
        .with_context(|| format!("Search for '{}' failed", query))?;

    let results = store.search_results().await;
    println!(
        "{}",
        format!("Search results for '{}' ({:?}):", query, start.elapsed()).bold().blue()
    );
    if results.is_empty() {
        println!("  no matches");
    }
    for movie in &results {
        println!("  {}", format_movie(movie));
    }
    Ok(())
}

/// Handle the 'predict' command
async fn handle_predict(client: &dyn Recommender, ids: &[MovieId]) -> Result<()> {
    let predicted = client
        .fetch_predicted_movies(ids)
        .await
        .with_context(|| format!("Prediction for {:?} failed", ids))?;

    print_predictions(&predicted);
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(store: &MovieStore, titles: Vec<String>) -> Result<()> {
    if titles.len() > store.max_sequence_length() {
        warn!(
            "{} titles given, the model only looks at sequences of up to {}",
            titles.len(),
            store.max_sequence_length()
        );
    }

    // Resolve each title to the first search hit, in the order given
    let mut selection: Vec<Movie> = Vec::with_capacity(titles.len());
    for title in &titles {
        store
            .search_movies(title.clone())
            .await
            .context("Search task panicked")?
            .with_context(|| format!("Search for '{}' failed", title))?;

        let hit = store
            .search_results()
            .await
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No movie found for '{}'", title))?;
        println!("{} {} -> {}", "✓".green(), title, format_movie(&hit));
        selection.push(hit);
    }

    let pending = store.set_selected_movies(selection).await;
    if let Some(pending) = pending {
        pending
            .await
            .context("Prediction task panicked")?
            .context("Prediction failed")?;
    }

    let state = store.snapshot().await;
    println!("{}", "Selected sequence:".bold().blue());
    for (i, movie) in state.selected_movies.iter().enumerate() {
        println!("{}. {}", (i + 1).to_string().green(), format_movie(movie));
    }
    print_predictions(&state.predicted_movies);
    Ok(())
}

fn format_movie(movie: &Movie) -> String {
    format!("[{}] {} ({})", movie.id, movie.title, movie.year)
}

/// Helper function to format and print predictions
fn print_predictions(predicted: &[Movie]) {
    println!("{}", "Predicted movies:".bold().blue());
    for (i, movie) in predicted.iter().enumerate() {
        match &movie.prob {
            Some(prob) => println!(
                "{}. {} - {}%",
                (i + 1).to_string().green(),
                format_movie(movie),
                prob
            ),
            None => println!("{}. {}", (i + 1).to_string().green(), format_movie(movie)),
        }
    }
}
