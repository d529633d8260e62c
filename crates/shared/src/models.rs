//! Data models for the anime catalog.
//!
//! Rows as stored in the catalog database, plus the insert payloads the
//! importer hands to the repository.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Anime row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anime {
    pub id: i64,
    pub external_id: String, // Catalog API animeId
    pub title: String,
    pub image_url: Option<String>,
    pub anime_type: Option<String>, // TV, Movie, OVA, etc.
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Anime to insert or update, keyed by `external_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAnime {
    pub external_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub anime_type: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Genre row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Episode row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub id: i64,
    pub anime_id: i64,
    pub episode_number: u32,
    pub title: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

/// Episode to insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEpisode {
    pub anime_id: i64,
    pub episode_number: u32,
    pub title: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

impl NewEpisode {
    /// Episode titled "Episode <n>", the form shown by the dashboard
    pub fn numbered(
        anime_id: i64,
        episode_number: u32,
        video_url: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            anime_id,
            episode_number,
            title: format!("Episode {}", episode_number),
            video_url,
            image_url,
        }
    }
}

/// Video server row, joined with its quality name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoServer {
    pub id: i64,
    pub episode_id: i64,
    pub quality_id: i64,
    pub quality_name: String,
    pub server_name: String,
    pub url: String,
    pub server_id: Option<String>,
    pub is_default: bool,
}

/// Video server to insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewVideoServer {
    pub episode_id: i64,
    pub quality_id: i64,
    pub server_name: String,
    pub url: String,
    pub server_id: Option<String>,
    pub is_default: bool,
}

impl NewVideoServer {
    /// Build a server row, flagging it as default when its display name
    /// contains "default" in any letter case
    pub fn new(
        episode_id: i64,
        quality_id: i64,
        server_name: impl Into<String>,
        url: impl Into<String>,
        server_id: Option<String>,
    ) -> Self {
        let server_name = server_name.into();
        let is_default = is_default_server(&server_name);
        Self {
            episode_id,
            quality_id,
            server_name,
            url: url.into(),
            server_id,
            is_default,
        }
    }
}

/// Whether a server display name marks the default playback choice
pub fn is_default_server(server_name: &str) -> bool {
    server_name.to_lowercase().contains("default")
}

/// Result of a find-or-create lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    pub id: i64,
    /// True when this call inserted the row
    pub created: bool,
}

/// Episode with the title of the anime it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeWithAnime {
    pub episode: Episode,
    pub anime_title: String,
}

/// Neighbouring episodes of the same anime
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjacentEpisodes {
    pub previous: Option<i64>,
    pub next: Option<i64>,
}

/// Row counts per catalog table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub anime: u64,
    pub genres: u64,
    pub episodes: u64,
    pub qualities: u64,
    pub servers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_detection() {
        assert!(is_default_server("Default Server"));
        assert!(is_default_server("Blogspot (DEFAULT)"));
        assert!(is_default_server("nondefault"));
        assert!(!is_default_server("Pixeldrain"));
        assert!(!is_default_server(""));
    }

    #[test]
    fn test_new_video_server_sets_default_flag() {
        let server = NewVideoServer::new(1, 2, "Wibufile Default", "https://x", None);
        assert!(server.is_default);

        let server = NewVideoServer::new(1, 2, "Krakenfiles", "https://y", Some("abc".into()));
        assert!(!server.is_default);
        assert_eq!(server.server_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_numbered_episode_title() {
        let episode = NewEpisode::numbered(3, 12, None, None);
        assert_eq!(episode.title, "Episode 12");
        assert_eq!(episode.episode_number, 12);
    }
}
