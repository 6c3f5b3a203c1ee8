use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::{ChatMessage, Notice, PlaybackState, Track, TypingNotice};
use crate::socket::{Frame, Packet, DEFAULT_NAMESPACE};
use crate::ProtocolError;

/// Events the client emits on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    AuthenticateUser { user_id: String },
    SendMessage { message: String },
    Typing { is_typing: bool },
    RequestRadioState,
    RequestCurrentSong,
    RequestProgress,
}

impl Input {
    pub fn name(&self) -> &'static str {
        match self {
            Input::AuthenticateUser { .. } => "authenticateUser",
            Input::SendMessage { .. } => "sendMessage",
            Input::Typing { .. } => "typing",
            Input::RequestRadioState => "requestRadioState",
            Input::RequestCurrentSong => "requestCurrentSong",
            Input::RequestProgress => "requestProgress",
        }
    }

    pub fn payload(&self) -> Option<Value> {
        match self {
            Input::AuthenticateUser { user_id } => Some(json!({ "userId": user_id })),
            Input::SendMessage { message } => Some(json!({ "message": message })),
            Input::Typing { is_typing } => Some(json!({ "isTyping": is_typing })),
            Input::RequestRadioState | Input::RequestCurrentSong | Input::RequestProgress => None,
        }
    }

    pub fn to_packet(&self) -> Packet {
        Packet::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack: None,
            name: self.name().to_string(),
            args: self.payload().into_iter().collect(),
        }
    }

    /// Wire text ready to hand to the websocket.
    pub fn encode(&self) -> String {
        Frame::Message(self.to_packet()).encode()
    }
}

/// Push events the server delivers on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    ChatHistory(Vec<ChatMessage>),
    NewMessage(ChatMessage),
    MessageError(Notice),
    UserTyping(TypingNotice),
    PlaylistUpdate(Vec<Track>),
    RadioUpdate(PlaybackState),
    ProgressUpdate(PlaybackState),
    CurrentSongUpdate(Option<Track>),
    ListenerUpdate(u32),
    AuthSuccess,
    AuthError(Notice),
    Unknown(String),
}

// Lists show up bare or wrapped depending on the backend revision.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Playlist { playlist: Vec<T> },
    Messages { messages: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Playlist { playlist } => playlist,
            Listing::Messages { messages } => messages,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListenerCount {
    Count(u32),
    Object {
        #[serde(alias = "listenerCount", alias = "listeners")]
        count: u32,
    },
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(data)?)
}

impl Output {
    pub fn decode(name: &str, data: Value) -> Result<Output, ProtocolError> {
        let output = match name {
            "chatHistory" => Output::ChatHistory(decode::<Listing<ChatMessage>>(data)?.into_vec()),
            "newMessage" => Output::NewMessage(decode(data)?),
            "messageError" => Output::MessageError(decode(data)?),
            "userTyping" => Output::UserTyping(decode(data)?),
            "playlistUpdate" => Output::PlaylistUpdate(decode::<Listing<Track>>(data)?.into_vec()),
            "radioUpdate" => Output::RadioUpdate(decode(data)?),
            "progressUpdate" => Output::ProgressUpdate(decode(data)?),
            "currentSongUpdate" => Output::CurrentSongUpdate(decode(data)?),
            "listenerUpdate" => Output::ListenerUpdate(match decode::<ListenerCount>(data)? {
                ListenerCount::Count(count) | ListenerCount::Object { count } => count,
            }),
            "authSuccess" => Output::AuthSuccess,
            "authError" => Output::AuthError(decode(data)?),
            other => Output::Unknown(other.to_string()),
        };

        Ok(output)
    }

    /// Decodes an event packet. Returns `None` for packets that are not events.
    pub fn from_packet(packet: Packet) -> Option<Result<Output, ProtocolError>> {
        match packet {
            Packet::Event { name, args, .. } => {
                let data = args.into_iter().next().unwrap_or(Value::Null);
                Some(Output::decode(&name, data))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_encoding() {
        assert_eq!(
            Input::AuthenticateUser {
                user_id: "u1".into()
            }
            .encode(),
            r#"42["authenticateUser",{"userId":"u1"}]"#
        );
        assert_eq!(
            Input::Typing { is_typing: false }.encode(),
            r#"42["typing",{"isTyping":false}]"#
        );
        assert_eq!(Input::RequestRadioState.encode(), r#"42["requestRadioState"]"#);
    }

    #[test]
    fn test_playlist_update_shapes() {
        let bare = Output::decode("playlistUpdate", json!([{ "id": "a", "title": "A" }])).unwrap();
        let wrapped = Output::decode(
            "playlistUpdate",
            json!({ "playlist": [{ "id": "a", "title": "A" }] }),
        )
        .unwrap();

        assert_eq!(bare, wrapped);
        match bare {
            Output::PlaylistUpdate(tracks) => assert_eq!(tracks[0].id, "a"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_listener_update_shapes() {
        assert_eq!(
            Output::decode("listenerUpdate", json!(3)).unwrap(),
            Output::ListenerUpdate(3)
        );
        assert_eq!(
            Output::decode("listenerUpdate", json!({ "listenerCount": 5 })).unwrap(),
            Output::ListenerUpdate(5)
        );
    }

    #[test]
    fn test_current_song_update_null_clears() {
        assert_eq!(
            Output::decode("currentSongUpdate", Value::Null).unwrap(),
            Output::CurrentSongUpdate(None)
        );
    }

    #[test]
    fn test_auth_events() {
        assert_eq!(
            Output::decode("authSuccess", json!({ "user": { "id": "u1" } })).unwrap(),
            Output::AuthSuccess
        );
        assert_eq!(
            Output::decode("authError", json!({ "message": "unknown user" })).unwrap(),
            Output::AuthError(Notice {
                message: "unknown user".into()
            })
        );
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(Output::decode("newMessage", json!({ "id": "1" })).is_err());
        assert!(Output::decode("userTyping", json!("yes")).is_err());
    }

    #[test]
    fn test_unknown_event_is_reported() {
        assert_eq!(
            Output::decode("confetti", Value::Null).unwrap(),
            Output::Unknown("confetti".into())
        );
    }

    #[test]
    fn test_from_packet_ignores_non_events() {
        let connect = Packet::Connect {
            namespace: "/".into(),
            sid: None,
        };
        assert!(Output::from_packet(connect).is_none());
    }
}
