//! Catalog repository.
//!
//! [`CatalogRepository`] is the write interface the importer depends on;
//! [`SqliteCatalog`] implements it on top of [`Database`] and also provides the
//! read queries used by the dashboard views.

use crate::error::PersistenceError;
use crate::models::*;
use crate::Database;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// Write operations needed to import the catalog
pub trait CatalogRepository {
    /// Insert the anime, or update it if its external id is already stored
    fn upsert_anime(&mut self, anime: &NewAnime) -> StoreResult<i64>;

    fn find_or_create_genre(&mut self, name: &str) -> StoreResult<Lookup>;

    /// Link an anime to a genre. Linking an already linked pair succeeds.
    fn link_anime_genre(&mut self, anime_id: i64, genre_id: i64) -> StoreResult<()>;

    fn insert_episode(&mut self, episode: &NewEpisode) -> StoreResult<i64>;

    fn find_or_create_video_quality(&mut self, name: &str) -> StoreResult<Lookup>;

    fn insert_video_server(&mut self, server: &NewVideoServer) -> StoreResult<i64>;
}

/// SQLite-backed catalog
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    /// Create a new catalog with the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Atomic find-or-create on a table with a UNIQUE `name` column
    fn find_or_create_named(&mut self, table: &'static str, name: &str) -> StoreResult<Lookup> {
        let conn = self.db.conn_mut();

        let inserted = conn
            .execute(
                &format!("INSERT INTO {table} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"),
                params![name],
            )
            .map_err(|e| PersistenceError::from_sqlite("insert lookup row", e))?;

        let id: i64 = conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE name = ?1"),
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| PersistenceError::from_sqlite("query lookup row", e))?;

        let created = inserted > 0;
        debug!(table, name, id, created, "Resolved lookup row");

        Ok(Lookup { id, created })
    }

    // ========== Dashboard queries ==========

    /// Most recently added anime, newest first
    pub fn recent_anime(&self, limit: u32) -> StoreResult<Vec<Anime>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(&format!("SELECT {ANIME_COLUMNS} FROM anime ORDER BY id DESC LIMIT ?1"))
            .map_err(|e| PersistenceError::from_sqlite("prepare recent anime query", e))?;

        let rows = stmt
            .query_map(params![limit], row_to_anime)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| PersistenceError::from_sqlite("list recent anime", e))?;

        Ok(rows)
    }

    pub fn anime_by_id(&self, id: i64) -> StoreResult<Option<Anime>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {ANIME_COLUMNS} FROM anime WHERE id = ?1"),
                params![id],
                row_to_anime,
            )
            .optional()
            .map_err(|e| PersistenceError::from_sqlite("get anime", e))
    }

    pub fn anime_by_external_id(&self, external_id: &str) -> StoreResult<Option<Anime>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {ANIME_COLUMNS} FROM anime WHERE external_id = ?1"),
                params![external_id],
                row_to_anime,
            )
            .optional()
            .map_err(|e| PersistenceError::from_sqlite("get anime by external id", e))
    }

    /// Anime by database id when `key` is numeric and such a row exists,
    /// otherwise by catalog id
    pub fn find_anime(&self, key: &str) -> StoreResult<Option<Anime>> {
        if let Ok(id) = key.trim().parse::<i64>() {
            if let Some(anime) = self.anime_by_id(id)? {
                return Ok(Some(anime));
            }
        }
        self.anime_by_external_id(key)
    }

    /// Genres linked to an anime, by name
    pub fn genres_for_anime(&self, anime_id: i64) -> StoreResult<Vec<Genre>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(
                "SELECT g.id, g.name FROM anime_genre ag
                 JOIN genre g ON g.id = ag.genre_id
                 WHERE ag.anime_id = ?1
                 ORDER BY g.name",
            )
            .map_err(|e| PersistenceError::from_sqlite("prepare genre query", e))?;

        let rows = stmt
            .query_map(params![anime_id], |row| {
                Ok(Genre {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| PersistenceError::from_sqlite("list genres for anime", e))?;

        Ok(rows)
    }

    /// Episodes of an anime in episode-number order
    pub fn episodes_for_anime(&self, anime_id: i64) -> StoreResult<Vec<Episode>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(&format!(
                "SELECT {EPISODE_COLUMNS} FROM episode WHERE anime_id = ?1 ORDER BY episode_number ASC"
            ))
            .map_err(|e| PersistenceError::from_sqlite("prepare episode query", e))?;

        let rows = stmt
            .query_map(params![anime_id], row_to_episode)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| PersistenceError::from_sqlite("list episodes", e))?;

        Ok(rows)
    }

    pub fn episode_by_id(&self, id: i64) -> StoreResult<Option<EpisodeWithAnime>> {
        self.db
            .conn()
            .query_row(
                "SELECT e.id, e.anime_id, e.episode_number, e.title, e.video_url, e.image_url, a.title
                 FROM episode e JOIN anime a ON a.id = e.anime_id
                 WHERE e.id = ?1",
                params![id],
                |row| {
                    Ok(EpisodeWithAnime {
                        episode: row_to_episode(row)?,
                        anime_title: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(|e| PersistenceError::from_sqlite("get episode", e))
    }

    /// Servers for an episode, grouped by quality
    pub fn servers_for_episode(&self, episode_id: i64) -> StoreResult<Vec<VideoServer>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(
                "SELECT s.id, s.episode_id, s.quality_id, q.name, s.server_name, s.url, s.server_id, s.is_default
                 FROM video_server s JOIN video_quality q ON q.id = s.quality_id
                 WHERE s.episode_id = ?1
                 ORDER BY s.quality_id ASC, s.id ASC",
            )
            .map_err(|e| PersistenceError::from_sqlite("prepare server query", e))?;

        let rows = stmt
            .query_map(params![episode_id], |row| {
                Ok(VideoServer {
                    id: row.get(0)?,
                    episode_id: row.get(1)?,
                    quality_id: row.get(2)?,
                    quality_name: row.get(3)?,
                    server_name: row.get(4)?,
                    url: row.get(5)?,
                    server_id: row.get(6)?,
                    is_default: row.get(7)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| PersistenceError::from_sqlite("list servers", e))?;

        Ok(rows)
    }

    /// Ids of the episodes numbered one below and one above the given episode
    pub fn adjacent_episodes(&self, episode: &Episode) -> StoreResult<AdjacentEpisodes> {
        let find = |number: i64| -> StoreResult<Option<i64>> {
            self.db
                .conn()
                .query_row(
                    "SELECT id FROM episode WHERE anime_id = ?1 AND episode_number = ?2",
                    params![episode.anime_id, number],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| PersistenceError::from_sqlite("find adjacent episode", e))
        };

        let number = i64::from(episode.episode_number);
        Ok(AdjacentEpisodes {
            previous: if number > 0 { find(number - 1)? } else { None },
            next: find(number + 1)?,
        })
    }

    /// Row counts for every catalog table
    pub fn stats(&self) -> StoreResult<CatalogStats> {
        let count = |table: &str| -> StoreResult<u64> {
            let n: i64 = self
                .db
                .conn()
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(|e| PersistenceError::from_sqlite("count rows", e))?;
            Ok(n as u64)
        };

        Ok(CatalogStats {
            anime: count("anime")?,
            genres: count("genre")?,
            episodes: count("episode")?,
            qualities: count("video_quality")?,
            servers: count("video_server")?,
        })
    }
}

impl CatalogRepository for SqliteCatalog {
    fn upsert_anime(&mut self, anime: &NewAnime) -> StoreResult<i64> {
        let conn = self.db.conn_mut();

        let id: i64 = conn
            .query_row(
                "INSERT INTO anime (
                    external_id, title, image_url, type, rating, status, description, release_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(external_id) DO UPDATE SET
                    title = excluded.title,
                    image_url = excluded.image_url,
                    type = excluded.type,
                    rating = excluded.rating,
                    status = excluded.status,
                    description = excluded.description,
                    release_date = excluded.release_date,
                    updated_at = CURRENT_TIMESTAMP
                RETURNING id",
                params![
                    anime.external_id,
                    anime.title,
                    anime.image_url,
                    anime.anime_type,
                    anime.rating,
                    anime.status,
                    anime.description,
                    anime.release_date,
                ],
                |row| row.get(0),
            )
            .map_err(|e| PersistenceError::from_sqlite("upsert anime", e))?;

        info!(external_id = %anime.external_id, db_id = id, title = %anime.title, "Upserted anime");
        Ok(id)
    }

    fn find_or_create_genre(&mut self, name: &str) -> StoreResult<Lookup> {
        self.find_or_create_named("genre", name)
    }

    fn link_anime_genre(&mut self, anime_id: i64, genre_id: i64) -> StoreResult<()> {
        let conn = self.db.conn_mut();

        match conn.execute(
            "INSERT INTO anime_genre (anime_id, genre_id) VALUES (?1, ?2)",
            params![anime_id, genre_id],
        ) {
            Ok(_) => {
                debug!(anime_id, genre_id, "Linked anime to genre");
                Ok(())
            }
            Err(e) => match PersistenceError::from_sqlite("link anime to genre", e) {
                PersistenceError::DuplicateKey { .. } => {
                    debug!(anime_id, genre_id, "Anime already linked to genre");
                    Ok(())
                }
                other => Err(other),
            },
        }
    }

    fn insert_episode(&mut self, episode: &NewEpisode) -> StoreResult<i64> {
        let conn = self.db.conn_mut();

        conn.execute(
            "INSERT INTO episode (anime_id, episode_number, title, video_url, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                episode.anime_id,
                episode.episode_number,
                episode.title,
                episode.video_url,
                episode.image_url,
            ],
        )
        .map_err(|e| PersistenceError::from_sqlite("insert episode", e))?;

        let id = conn.last_insert_rowid();
        debug!(
            episode_id = id,
            anime_id = episode.anime_id,
            episode = episode.episode_number,
            "Inserted episode"
        );
        Ok(id)
    }

    fn find_or_create_video_quality(&mut self, name: &str) -> StoreResult<Lookup> {
        self.find_or_create_named("video_quality", name)
    }

    fn insert_video_server(&mut self, server: &NewVideoServer) -> StoreResult<i64> {
        let conn = self.db.conn_mut();

        conn.execute(
            "INSERT INTO video_server (episode_id, quality_id, server_name, url, server_id, is_default)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                server.episode_id,
                server.quality_id,
                server.server_name,
                server.url,
                server.server_id,
                server.is_default,
            ],
        )
        .map_err(|e| PersistenceError::from_sqlite("insert video server", e))?;

        let id = conn.last_insert_rowid();
        debug!(
            server_id = id,
            episode_id = server.episode_id,
            server = %server.server_name,
            is_default = server.is_default,
            "Inserted video server"
        );
        Ok(id)
    }
}

const ANIME_COLUMNS: &str =
    "id, external_id, title, image_url, type, rating, status, description, release_date";

const EPISODE_COLUMNS: &str = "id, anime_id, episode_number, title, video_url, image_url";

fn row_to_anime(row: &Row) -> rusqlite::Result<Anime> {
    Ok(Anime {
        id: row.get(0)?,
        external_id: row.get(1)?,
        title: row.get(2)?,
        image_url: row.get(3)?,
        anime_type: row.get(4)?,
        rating: row.get(5)?,
        status: row.get(6)?,
        description: row.get(7)?,
        release_date: row.get(8)?,
    })
}

fn row_to_episode(row: &Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        anime_id: row.get(1)?,
        episode_number: row.get(2)?,
        title: row.get(3)?,
        video_url: row.get(4)?,
        image_url: row.get(5)?,
    })
}
