//! Catalog importer CLI application.

use anyhow::{bail, Context, Result};
use catalog_importer::{Importer, Pacing, SamehadakuClient};
use clap::{Parser, Subcommand};
use shared::{Anime, Config, Database, LogConfig, SqliteCatalog};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import recently released anime from the catalog API
    Import {
        /// Number of anime to import (defaults to `import.default_limit`)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List the most recently imported anime
    List {
        #[arg(short, long, default_value_t = 12)]
        limit: u32,
    },
    /// Show an anime with its genres and episodes
    Show {
        /// Database id or catalog anime id
        anime_id: String,
    },
    /// Show an episode with its servers and neighbours
    Episode { episode_id: i64 },
    /// Print row counts per table
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let mut log_config = LogConfig::from_settings(&config.logging, &config.log_dir(), "catalog-importer");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!("Catalog importer starting");
    match &config.loaded_from {
        Some(path) => info!(config_file = %path.display(), "Loaded configuration"),
        None => warn!(config_file = %args.config.display(), "Config file not found, using defaults"),
    }

    // Initialize database
    let db_path = config.database_path()?;
    info!(db_path = %db_path.display(), "Opening database");
    let database = Database::open(&db_path).context("Failed to open database")?;
    let catalog = SqliteCatalog::new(database);

    match args.command {
        Command::Import { limit } => run_import(&config, catalog, limit).await,
        Command::List { limit } => list(&catalog, limit),
        Command::Show { anime_id } => show(&catalog, &anime_id),
        Command::Episode { episode_id } => episode(&catalog, episode_id),
        Command::Stats => stats(&catalog),
    }
}

async fn run_import(config: &Config, catalog: SqliteCatalog, limit: Option<usize>) -> Result<()> {
    let client =
        SamehadakuClient::from_config(&config.catalog).context("Failed to create catalog client")?;
    info!(base_url = %client.base_url(), "Using catalog API");

    let limit = limit.unwrap_or(config.import.default_limit);
    let mut importer = Importer::new(client, catalog, Pacing::from(&config.import));

    let summary = importer
        .import_anime_data(limit)
        .await
        .context("Import failed")?;

    info!("=== Import Complete ===");
    info!("Anime imported: {}", summary.anime_count);
    info!("Episodes imported: {}", summary.episode_count);
    info!("New genres: {}", summary.genre_count);
    info!("Video servers imported: {}", summary.server_count);

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn print_anime_line(anime: &Anime) {
    println!(
        "{:>6}  {:<40}  {:<8}  {:>5}  {}",
        anime.id,
        anime.title,
        anime.anime_type.as_deref().unwrap_or("-"),
        anime
            .rating
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string()),
        anime.status.as_deref().unwrap_or("-"),
    );
}

fn list(catalog: &SqliteCatalog, limit: u32) -> Result<()> {
    let anime = catalog.recent_anime(limit)?;
    if anime.is_empty() {
        println!("No anime imported yet");
        return Ok(());
    }

    for entry in &anime {
        print_anime_line(entry);
    }
    Ok(())
}

fn show(catalog: &SqliteCatalog, anime_id: &str) -> Result<()> {
    let Some(anime) = catalog.find_anime(anime_id)? else {
        bail!("Anime {} not found", anime_id);
    };

    print_anime_line(&anime);
    println!("Catalog id: {}", anime.external_id);
    if let Some(date) = anime.release_date {
        println!("Released: {}", date);
    }

    let genres: Vec<String> = catalog
        .genres_for_anime(anime.id)?
        .into_iter()
        .map(|g| g.name)
        .collect();
    if !genres.is_empty() {
        println!("Genres: {}", genres.join(", "));
    }

    if let Some(description) = &anime.description {
        println!();
        println!("{}", description);
    }

    let episodes = catalog.episodes_for_anime(anime.id)?;
    println!();
    println!("Episodes ({}):", episodes.len());
    for episode in &episodes {
        println!("{:>6}  {}", episode.id, episode.title);
    }

    Ok(())
}

fn episode(catalog: &SqliteCatalog, episode_id: i64) -> Result<()> {
    let Some(found) = catalog.episode_by_id(episode_id)? else {
        bail!("Episode {} not found", episode_id);
    };

    println!("{} - {}", found.anime_title, found.episode.title);
    if let Some(url) = &found.episode.video_url {
        println!("Default stream: {}", url);
    }

    let servers = catalog.servers_for_episode(found.episode.id)?;
    let mut current_quality: Option<&str> = None;
    for server in &servers {
        if current_quality != Some(server.quality_name.as_str()) {
            println!("[{}]", server.quality_name);
            current_quality = Some(server.quality_name.as_str());
        }
        let marker = if server.is_default { " (default)" } else { "" };
        println!("  {}{}: {}", server.server_name, marker, server.url);
    }

    let adjacent = catalog.adjacent_episodes(&found.episode)?;
    if let Some(previous) = adjacent.previous {
        println!("Previous episode: {}", previous);
    }
    if let Some(next) = adjacent.next {
        println!("Next episode: {}", next);
    }

    Ok(())
}

fn stats(catalog: &SqliteCatalog) -> Result<()> {
    let stats = catalog.stats()?;
    println!("Anime:           {}", stats.anime);
    println!("Genres:          {}", stats.genres);
    println!("Episodes:        {}", stats.episodes);
    println!("Video qualities: {}", stats.qualities);
    println!("Video servers:   {}", stats.servers);
    Ok(())
}
