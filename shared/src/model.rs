use serde::{Deserialize, Deserializer, Serialize};

// Ids arrive as strings from most endpoints and as numbers from a few.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Text(String),
    Number(serde_json::Number),
}

impl From<LooseId> for String {
    fn from(id: LooseId) -> Self {
        match id {
            LooseId::Text(text) => text,
            LooseId::Number(number) => number.to_string(),
        }
    }
}

fn loose_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    LooseId::deserialize(deserializer).map(String::from)
}

fn loose_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<LooseId>::deserialize(deserializer).map(|id| id.map(String::from))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "loose_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "avatar")]
    pub avatar_id: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Track {
    #[serde(deserialize_with = "loose_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "duration", alias = "durationSeconds", default)]
    pub duration_seconds: f64,
    #[serde(rename = "thumbnail", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

/// Authoritative radio state as pushed by the server.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    #[serde(rename = "currentSong", alias = "currentTrack", default)]
    pub current_track: Option<Track>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(rename = "currentPosition", alias = "serverPositionSeconds", default)]
    pub position_seconds: f64,
    /// Only `listenerUpdate` and some status payloads carry this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub playlist: Vec<Track>,
    #[serde(rename = "currentSong", default)]
    pub current_track: Option<Track>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(deserialize_with = "loose_id")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_id")]
    pub user_id: String,
    #[serde(default, alias = "userName")]
    pub username: String,
    #[serde(
        default,
        alias = "userAvatar",
        deserialize_with = "loose_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar: Option<String>,
    #[serde(alias = "text")]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "loose_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    #[serde(default, deserialize_with = "loose_id")]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub is_typing: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NoticeRepr {
    Nothing,
    Text(String),
    Object {
        #[serde(alias = "error", default)]
        message: String,
    },
}

/// Free-form server notice, sent either as a bare string or as `{message}` / `{error}`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "NoticeRepr")]
pub struct Notice {
    pub message: String,
}

impl From<NoticeRepr> for Notice {
    fn from(repr: NoticeRepr) -> Self {
        let message = match repr {
            NoticeRepr::Nothing => String::new(),
            NoticeRepr::Text(message) | NoticeRepr::Object { message } => message,
        };
        Notice { message }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub avatar_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddToQueueRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub song: Option<Track>,
    #[serde(default)]
    pub songs: Vec<Track>,
}

impl SearchResponse {
    pub fn into_tracks(self) -> Vec<Track> {
        let mut tracks = self.songs;
        if let Some(song) = self.song {
            if !tracks.iter().any(|track| track.id == song.id) {
                tracks.insert(0, song);
            }
        }
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn track_accepts_numeric_ids_and_missing_optionals() {
        let track: Track = serde_json::from_value(json!({
            "id": 7,
            "title": "Neon Dreams",
            "artist": "SynthWave",
            "duration": 212.5
        }))
        .unwrap();

        assert_eq!(track.id, "7");
        assert_eq!(track.duration_seconds, 212.5);
        assert_eq!(track.album, None);
        assert_eq!(track.stream_url, None);
    }

    #[test]
    fn playback_state_reads_server_and_aliased_names() {
        let from_server: PlaybackState = serde_json::from_value(json!({
            "currentSong": { "id": "t1", "title": "A", "duration": 180 },
            "isPlaying": true,
            "currentPosition": 30,
            "progress": 16.6,
            "formattedCurrentTime": "0:30"
        }))
        .unwrap();
        let aliased: PlaybackState = serde_json::from_value(json!({
            "currentTrack": { "id": "t1", "title": "A", "duration": 180 },
            "isPlaying": true,
            "serverPositionSeconds": 30,
            "listenerCount": 4
        }))
        .unwrap();

        assert_eq!(from_server.position_seconds, 30.0);
        assert_eq!(from_server.listener_count, None);
        assert_eq!(aliased.current_track, from_server.current_track);
        assert_eq!(aliased.listener_count, Some(4));
    }

    #[test]
    fn queue_snapshot_tolerates_null_current_song() {
        let snapshot: QueueSnapshot =
            serde_json::from_value(json!({ "playlist": [], "currentSong": null })).unwrap();

        assert_eq!(snapshot, QueueSnapshot::default());
    }

    #[test]
    fn chat_message_accepts_text_alias() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": 1718000000000u64,
            "userId": "u1",
            "username": "Player1",
            "text": "hi",
            "timestamp": "2024-06-10T08:15:00.000Z"
        }))
        .unwrap();

        assert_eq!(message.id, "1718000000000");
        assert_eq!(message.message, "hi");
        assert_eq!(message.avatar, None);
    }

    #[test]
    fn notice_shapes() {
        let shapes = vec![
            json!("slow down"),
            json!({ "message": "slow down" }),
            json!({ "error": "slow down" }),
        ];

        for shape in shapes {
            let notice: Notice = serde_json::from_value(shape).unwrap();
            assert_eq!(notice.message, "slow down");
        }

        let empty: Notice = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(empty, Notice::default());
    }

    #[test]
    fn search_response_merges_single_and_list() {
        let response: SearchResponse = serde_json::from_value(json!({
            "song": { "id": "a", "title": "A", "artist": "X", "thumbnail": "https://img/a" },
            "songs": [{ "id": "b", "title": "B" }, { "id": "a", "title": "A" }]
        }))
        .unwrap();

        let ids: Vec<String> = response.into_tracks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn register_request_uses_camel_case() {
        let body = serde_json::to_value(RegisterRequest {
            name: "Ada".into(),
            avatar_id: 2,
        })
        .unwrap();

        assert_eq!(body, json!({ "name": "Ada", "avatarId": 2 }));
    }
}
