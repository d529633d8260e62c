//! Import orchestrator.
//!
//! Walks the catalog sequentially: anime list, then for each anime its
//! details, genres, episodes and the streaming servers of every episode.
//! A failing item is logged and skipped; only a failure to fetch the anime
//! list aborts the run.

use crate::api::{AnimeDetail, AnimeSummary, CatalogSource, EpisodeRef, GenreRef, Scalar, ServerGroups};
use crate::error::ImportError;
use crate::parse::{join_paragraphs, non_empty, parse_episode_number, parse_rating, parse_release_date};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::config::ImportConfig;
use shared::{CatalogRepository, NewAnime, NewEpisode, NewVideoServer};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Counters for one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Anime rows inserted or updated
    pub anime_count: usize,
    /// Episode rows inserted
    pub episode_count: usize,
    /// Genre rows newly created (reused genres are not counted)
    pub genre_count: usize,
    /// Video server rows inserted
    pub server_count: usize,
}

/// Fixed pauses between remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub episode_delay: Duration,
    pub server_delay: Duration,
    pub anime_delay: Duration,
}

impl Pacing {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            episode_delay: Duration::ZERO,
            server_delay: Duration::ZERO,
            anime_delay: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for Pacing {
    fn from(config: &ImportConfig) -> Self {
        Self {
            episode_delay: Duration::from_millis(config.episode_delay_ms),
            server_delay: Duration::from_millis(config.server_delay_ms),
            anime_delay: Duration::from_millis(config.anime_delay_ms),
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

/// Per-anime counters
#[derive(Debug, Default)]
struct AnimeCounts {
    episodes: usize,
    genres: usize,
    servers: usize,
}

/// Drives a catalog import into a repository
pub struct Importer<S, R> {
    source: S,
    repository: R,
    pacing: Pacing,
}

impl<S: CatalogSource, R: CatalogRepository> Importer<S, R> {
    pub fn new(source: S, repository: R, pacing: Pacing) -> Self {
        Self {
            source,
            repository,
            pacing,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_parts(self) -> (S, R) {
        (self.source, self.repository)
    }

    /// Import the first `limit` anime of the catalog's recent list
    pub async fn import_anime_data(&mut self, limit: usize) -> Result<ImportSummary, ImportError> {
        info!(limit = limit, "Starting anime import");

        let anime_list = self
            .source
            .fetch_anime_list()
            .await
            .map_err(ImportError::CatalogList)?;

        info!(found = anime_list.len(), "Found anime to process");

        let selected = &anime_list[..limit.min(anime_list.len())];
        let mut summary = ImportSummary::default();
        let mut attempted = false;

        for (idx, entry) in selected.iter().enumerate() {
            if entry.anime_id.trim().is_empty() {
                warn!(title = %entry.title, "Anime entry has no id, skipping");
                continue;
            }

            if attempted {
                pause(self.pacing.anime_delay).await;
            }
            attempted = true;

            info!(
                progress = format!("{}/{}", idx + 1, selected.len()),
                anime_id = %entry.anime_id,
                title = %entry.title,
                "Processing anime"
            );

            match self.import_anime(entry).await {
                Ok(counts) => {
                    summary.anime_count += 1;
                    summary.episode_count += counts.episodes;
                    summary.genre_count += counts.genres;
                    summary.server_count += counts.servers;
                }
                Err(e) => {
                    let cause = format!("{:#}", e);
                    error!(anime_id = %entry.anime_id, error = %cause, "Failed to import anime, skipping");
                }
            }
        }

        info!(
            anime = summary.anime_count,
            episodes = summary.episode_count,
            genres = summary.genre_count,
            servers = summary.server_count,
            "Anime import complete"
        );

        Ok(summary)
    }

    /// Fetch, upsert and expand one anime
    ///
    /// Errors only before the anime row is stored; later failures are
    /// contained per genre, episode and server.
    async fn import_anime(&mut self, entry: &AnimeSummary) -> Result<AnimeCounts> {
        let detail = self
            .source
            .fetch_anime_detail(&entry.anime_id)
            .await
            .with_context(|| format!("Failed to fetch details for anime {}", entry.anime_id))?;

        let record = anime_record(&entry.anime_id, &detail);
        let anime_id = self
            .repository
            .upsert_anime(&record)
            .context("Failed to upsert anime")?;

        let mut counts = AnimeCounts::default();

        if !detail.genre_list.is_empty() {
            counts.genres = self.import_genres(anime_id, &detail.genre_list);
        }

        if !detail.episode_list.is_empty() {
            let (episodes, servers) = self.import_episodes(anime_id, &detail.episode_list).await;
            counts.episodes = episodes;
            counts.servers = servers;
        }

        info!(
            anime_id = anime_id,
            title = %record.title,
            episodes = counts.episodes,
            new_genres = counts.genres,
            servers = counts.servers,
            "Imported anime"
        );

        Ok(counts)
    }

    /// Returns the number of newly created genres
    fn import_genres(&mut self, anime_id: i64, genres: &[GenreRef]) -> usize {
        let mut created = 0;

        for genre in genres {
            let name = genre.title.trim();
            if name.is_empty() {
                continue;
            }

            let lookup = match self.repository.find_or_create_genre(name) {
                Ok(lookup) => lookup,
                Err(e) => {
                    warn!(genre = %name, error = %e, "Failed to create genre, skipping");
                    continue;
                }
            };

            if lookup.created {
                created += 1;
            }

            if let Err(e) = self.repository.link_anime_genre(anime_id, lookup.id) {
                warn!(anime_id = anime_id, genre = %name, error = %e, "Failed to link anime with genre");
            }
        }

        created
    }

    /// Returns (episodes inserted, servers inserted)
    async fn import_episodes(&mut self, anime_id: i64, episodes: &[EpisodeRef]) -> (usize, usize) {
        let mut episode_count = 0;
        let mut server_count = 0;

        for entry in episodes {
            let title = entry.title.as_ref().map(Scalar::as_text).unwrap_or_default();
            if entry.episode_id.trim().is_empty() {
                warn!(title = %title, "Episode entry has no id, skipping");
                continue;
            }
            let Some(number) = parse_episode_number(&title) else {
                warn!(title = %title, episode_id = %entry.episode_id, "Could not parse episode number, skipping");
                continue;
            };

            if let Some(servers) = self.import_episode(anime_id, number, entry).await {
                episode_count += 1;
                server_count += servers;
            }

            pause(self.pacing.episode_delay).await;
        }

        (episode_count, server_count)
    }

    /// Returns the number of servers inserted, or `None` if the episode was skipped
    async fn import_episode(&mut self, anime_id: i64, number: u32, entry: &EpisodeRef) -> Option<usize> {
        let detail = match self.source.fetch_episode_detail(&entry.episode_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(episode_id = %entry.episode_id, error = %e, "Could not fetch episode details, skipping");
                return None;
            }
        };

        let episode = NewEpisode::numbered(
            anime_id,
            number,
            non_empty(detail.default_streaming_url.as_deref()),
            non_empty(detail.poster.as_deref()),
        );

        let episode_id = match self.repository.insert_episode(&episode) {
            Ok(id) => id,
            Err(e) => {
                warn!(anime_id = anime_id, episode = number, error = %e, "Failed to insert episode, skipping");
                return None;
            }
        };

        debug!(episode_id = episode_id, episode = number, "Inserted episode");

        let servers = match &detail.server {
            Some(groups) => self.import_servers(episode_id, groups).await,
            None => 0,
        };

        if servers > 0 {
            debug!(episode = number, servers = servers, "Added servers for episode");
        }

        Some(servers)
    }

    /// Returns the number of servers inserted
    async fn import_servers(&mut self, episode_id: i64, groups: &ServerGroups) -> usize {
        let mut inserted = 0;

        for quality in &groups.qualities {
            if quality.server_list.is_empty() {
                continue;
            }
            if quality.title.trim().is_empty() {
                warn!(servers = quality.server_list.len(), "Quality group has no name, skipping");
                continue;
            }

            let quality_id = match self.repository.find_or_create_video_quality(&quality.title) {
                Ok(lookup) => lookup.id,
                Err(e) => {
                    warn!(quality = %quality.title, error = %e, "Failed to create video quality, skipping");
                    continue;
                }
            };

            for server in &quality.server_list {
                if server.server_id.trim().is_empty() {
                    warn!(server = %server.title, "Server entry has no id, skipping");
                    continue;
                }

                match self.source.fetch_server_url(&server.server_id).await {
                    None => {
                        warn!(server = %server.title, server_id = %server.server_id, "No URL found for server, skipping");
                    }
                    Some(url) => {
                        let row = NewVideoServer::new(
                            episode_id,
                            quality_id,
                            server.title.as_str(),
                            url,
                            Some(server.server_id.clone()),
                        );
                        match self.repository.insert_video_server(&row) {
                            Ok(_) => inserted += 1,
                            Err(e) => {
                                warn!(server = %server.title, error = %e, "Failed to insert video server");
                            }
                        }
                    }
                }

                pause(self.pacing.server_delay).await;
            }
        }

        inserted
    }
}

/// Map catalog details to the stored anime row
pub fn anime_record(external_id: &str, detail: &AnimeDetail) -> NewAnime {
    NewAnime {
        external_id: external_id.to_string(),
        title: detail.title.clone(),
        image_url: non_empty(detail.poster.as_deref()),
        anime_type: non_empty(detail.anime_type.as_deref()),
        rating: detail
            .score
            .as_ref()
            .and_then(|score| score.value.as_ref())
            .and_then(|value| parse_rating(&value.as_text())),
        status: non_empty(detail.status.as_deref()),
        description: detail
            .synopsis
            .as_ref()
            .and_then(|synopsis| join_paragraphs(&synopsis.paragraphs)),
        release_date: detail.aired.as_deref().and_then(parse_release_date),
    }
}
