//! Samehadaku catalog API response types.
//!
//! Every endpoint wraps its payload in an [`Envelope`]. Field names follow the
//! API's camelCase JSON.

use serde::{Deserialize, Serialize};

/// Response wrapper shared by all endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// A JSON value the API sends either as a string or as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
        }
    }
}

/// `/samehadaku/home`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeData {
    pub recent: Option<RecentSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSection {
    #[serde(default)]
    pub anime_list: Vec<AnimeSummary>,
}

/// Entry of the recent-release list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeSummary {
    #[serde(default)]
    pub anime_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
}

/// `/samehadaku/anime/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetail {
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<Score>,
    /// Free text such as "Oct 4, 2024 to ?"
    #[serde(default)]
    pub aired: Option<String>,
    #[serde(default)]
    pub synopsis: Option<Synopsis>,
    #[serde(default)]
    pub genre_list: Vec<GenreRef>,
    #[serde(default)]
    pub episode_list: Vec<EpisodeRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub value: Option<Scalar>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Synopsis {
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreRef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    /// Usually the bare episode number; sometimes null
    #[serde(default)]
    pub title: Option<Scalar>,
    #[serde(default)]
    pub episode_id: String,
}

/// `/samehadaku/episode/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub default_streaming_url: Option<String>,
    #[serde(default)]
    pub server: Option<ServerGroups>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerGroups {
    #[serde(default)]
    pub qualities: Vec<QualityGroup>,
}

/// Servers offering one video quality
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGroup {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub server_list: Vec<ServerRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub server_id: String,
}

/// `/samehadaku/server/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDetail {
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_envelope() {
        let json = r#"{
            "ok": true,
            "message": "",
            "data": {
                "recent": {
                    "href": "/samehadaku/recent",
                    "animeList": [
                        {"title": "Dandadan", "poster": "https://p/1.jpg", "episodes": "12", "animeId": "dandadan"},
                        {"title": "Frieren", "animeId": "sousou-no-frieren"}
                    ]
                },
                "top10": {"animeList": []}
            }
        }"#;

        let envelope: Envelope<HomeData> = serde_json::from_str(json).unwrap();
        assert!(envelope.ok);
        let list = envelope.data.unwrap().recent.unwrap().anime_list;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].anime_id, "dandadan");
        assert_eq!(list[1].poster, None);
    }

    #[test]
    fn test_anime_detail_with_numeric_episode_titles() {
        let json = r#"{
            "ok": true,
            "data": {
                "title": "Dandadan",
                "poster": "https://p/1.jpg",
                "score": {"value": "8.52", "users": "120,000"},
                "type": "TV",
                "status": "Completed",
                "aired": "Oct 4, 2024 to Dec 20, 2024",
                "synopsis": {"paragraphs": ["One.", "Two."], "connections": []},
                "genreList": [{"title": "Action", "genreId": "action", "href": "/g/action"}],
                "episodeList": [
                    {"title": 12, "episodeId": "dandadan-episode-12"},
                    {"title": "11", "episodeId": "dandadan-episode-11"}
                ]
            }
        }"#;

        let envelope: Envelope<AnimeDetail> = serde_json::from_str(json).unwrap();
        let detail = envelope.data.unwrap();
        assert_eq!(detail.anime_type.as_deref(), Some("TV"));
        assert_eq!(
            detail.score.unwrap().value,
            Some(Scalar::Text("8.52".to_string()))
        );
        assert_eq!(detail.synopsis.unwrap().paragraphs.len(), 2);
        assert_eq!(
            detail.episode_list[0].title.as_ref().map(Scalar::as_text).as_deref(),
            Some("12")
        );
        assert_eq!(
            detail.episode_list[1].title.as_ref().map(Scalar::as_text).as_deref(),
            Some("11")
        );
    }

    #[test]
    fn test_malformed_list_entries_do_not_fail_envelope() {
        let json = r#"{
            "ok": true,
            "data": {
                "recent": {
                    "animeList": [
                        {"animeId": "untitled"},
                        {"title": "No id"},
                        {"title": "Frieren", "animeId": "sousou-no-frieren"}
                    ]
                }
            }
        }"#;

        let envelope: Envelope<HomeData> = serde_json::from_str(json).unwrap();
        let list = envelope.data.unwrap().recent.unwrap().anime_list;
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].title, "");
        assert_eq!(list[1].anime_id, "");
        assert_eq!(list[2].anime_id, "sousou-no-frieren");
    }

    #[test]
    fn test_null_episode_title_keeps_other_episodes() {
        let json = r#"{
            "ok": true,
            "data": {
                "title": "A",
                "episodeList": [
                    {"title": null, "episodeId": "a-sp"},
                    {"episodeId": "a-ova"},
                    {"title": 2, "episodeId": "a-2"}
                ]
            }
        }"#;

        let envelope: Envelope<AnimeDetail> = serde_json::from_str(json).unwrap();
        let episodes = envelope.data.unwrap().episode_list;
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].title, None);
        assert_eq!(episodes[1].title, None);
        assert_eq!(episodes[2].title, Some(Scalar::Number(serde_json::Number::from(2u64))));
    }

    #[test]
    fn test_server_without_title_is_kept() {
        let json = r#"{
            "ok": true,
            "data": {
                "server": {
                    "qualities": [
                        {"title": "720p", "serverList": [{"serverId": "B1"}, {"title": "Mega"}]}
                    ]
                }
            }
        }"#;

        let envelope: Envelope<EpisodeDetail> = serde_json::from_str(json).unwrap();
        let servers = &envelope.data.unwrap().server.unwrap().qualities[0].server_list;
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].title, "");
        assert_eq!(servers[0].server_id, "B1");
        assert_eq!(servers[1].server_id, "");
    }

    #[test]
    fn test_failed_envelope_without_data() {
        let json = r#"{"ok": false, "message": "Not Found"}"#;
        let envelope: Envelope<AnimeDetail> = serde_json::from_str(json).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.message.as_deref(), Some("Not Found"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_episode_detail_servers() {
        let json = r#"{
            "ok": true,
            "data": {
                "title": "Dandadan Episode 12",
                "poster": "https://p/ep12.jpg",
                "defaultStreamingUrl": "https://stream/default",
                "server": {
                    "qualities": [
                        {"title": "360p", "serverList": []},
                        {"title": "1080p", "serverList": [
                            {"title": "Blogspot Default", "serverId": "A1", "href": "/s/A1"},
                            {"title": "Wibufile", "serverId": "A2"}
                        ]}
                    ]
                }
            }
        }"#;

        let envelope: Envelope<EpisodeDetail> = serde_json::from_str(json).unwrap();
        let detail = envelope.data.unwrap();
        let qualities = detail.server.unwrap().qualities;
        assert_eq!(qualities.len(), 2);
        assert!(qualities[0].server_list.is_empty());
        assert_eq!(qualities[1].server_list[1].server_id, "A2");
    }
}
