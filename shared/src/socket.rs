//! Engine.IO v4 framing carrying Socket.IO v5 packets, text transport only.
//!
//! A websocket message holds exactly one [`Frame`]. Message frames wrap a
//! [`Packet`], whose events are `[name, ...args]` JSON arrays optionally
//! preceded by a `/namespace,` prefix and an ack id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ProtocolError;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Query string selecting Engine.IO v4 over a raw websocket.
pub const TRANSPORT_QUERY: &str = "EIO=4&transport=websocket";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(Packet),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect {
        namespace: String,
        sid: Option<String>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl Frame {
    pub fn decode(text: &str) -> Result<Frame, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Frame::Close),
            // "2probe" only shows up during transport upgrades, which we never request.
            '2' => Ok(Frame::Ping),
            '3' => Ok(Frame::Pong),
            '4' => Ok(Frame::Message(Packet::decode(rest)?)),
            '5' => Ok(Frame::Upgrade),
            '6' => Ok(Frame::Noop),
            other => Err(ProtocolError::UnknownFrame(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Frame::Open(handshake) => format!("0{}", json!(handshake)),
            Frame::Close => "1".to_string(),
            Frame::Ping => "2".to_string(),
            Frame::Pong => "3".to_string(),
            Frame::Message(packet) => format!("4{}", packet.encode()),
            Frame::Upgrade => "5".to_string(),
            Frame::Noop => "6".to_string(),
        }
    }
}

impl Packet {
    /// The packet a client sends right after the Engine.IO handshake.
    pub fn connect() -> Packet {
        Packet::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            sid: None,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Packet::Connect { namespace, .. }
            | Packet::Disconnect { namespace }
            | Packet::Event { namespace, .. }
            | Packet::Ack { namespace, .. }
            | Packet::ConnectError { namespace, .. } => namespace,
        }
    }

    fn kind(&self) -> char {
        match self {
            Packet::Connect { .. } => '0',
            Packet::Disconnect { .. } => '1',
            Packet::Event { .. } => '2',
            Packet::Ack { .. } => '3',
            Packet::ConnectError { .. } => '4',
        }
    }

    pub fn decode(text: &str) -> Result<Packet, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
            namespace
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let ack = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| ProtocolError::Malformed(format!("ack id: {}", e)))?;
            Some(id)
        } else {
            None
        };
        let body = &rest[digits..];

        match kind {
            '0' => {
                let sid = if body.is_empty() {
                    None
                } else {
                    let payload: Value = serde_json::from_str(body)?;
                    payload.get("sid").and_then(Value::as_str).map(str::to_owned)
                };
                Ok(Packet::Connect { namespace, sid })
            }
            '1' => Ok(Packet::Disconnect { namespace }),
            '2' => {
                let mut args: Vec<Value> = serde_json::from_str(body)?;
                if args.is_empty() {
                    return Err(ProtocolError::Malformed("event without a name".into()));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(ProtocolError::Malformed(format!(
                            "event name must be a string, got {}",
                            other
                        )))
                    }
                };
                Ok(Packet::Event {
                    namespace,
                    ack,
                    name,
                    args,
                })
            }
            '3' => {
                let id = ack.ok_or_else(|| ProtocolError::Malformed("ack without an id".into()))?;
                let args: Vec<Value> = serde_json::from_str(body)?;
                Ok(Packet::Ack {
                    namespace,
                    id,
                    args,
                })
            }
            '4' => {
                let payload: Value = if body.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(body)?
                };
                let message = match payload {
                    Value::String(message) => message,
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                };
                Ok(Packet::ConnectError { namespace, message })
            }
            '5' | '6' => Err(ProtocolError::Unsupported("binary packets")),
            other => Err(ProtocolError::UnknownPacket(other)),
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind());

        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            Packet::Connect { sid, .. } => {
                if let Some(sid) = sid {
                    out.push_str(&json!({ "sid": sid }).to_string());
                }
            }
            Packet::Disconnect { .. } => {}
            Packet::Event {
                ack, name, args, ..
            } => {
                if let Some(id) = ack {
                    out.push_str(&id.to_string());
                }
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                out.push_str(&Value::Array(array).to_string());
            }
            Packet::Ack { id, args, .. } => {
                out.push_str(&id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            Packet::ConnectError { message, .. } => {
                out.push_str(&json!({ "message": message }).to_string());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_frame() {
        let frame = Frame::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        match frame {
            Frame::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.ping_interval, 25000);
                assert_eq!(handshake.ping_timeout, 20000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_heartbeat_frames() {
        assert_eq!(Frame::decode("2").unwrap(), Frame::Ping);
        assert_eq!(Frame::decode("2probe").unwrap(), Frame::Ping);
        assert_eq!(Frame::Pong.encode(), "3");
    }

    #[test]
    fn test_connect_packets() {
        assert_eq!(Frame::Message(Packet::connect()).encode(), "40");

        let ack = Frame::decode(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(
            ack,
            Frame::Message(Packet::Connect {
                namespace: "/".into(),
                sid: Some("wZX3oN0bSVIhsaknAAAI".into()),
            })
        );
    }

    #[test]
    fn test_event_with_namespace_and_ack() {
        let frame = Frame::decode(r#"42/radio,17["newMessage",{"id":"1","message":"yo"}]"#).unwrap();

        match frame {
            Frame::Message(Packet::Event {
                namespace,
                ack,
                name,
                args,
            }) => {
                assert_eq!(namespace, "/radio");
                assert_eq!(ack, Some(17));
                assert_eq!(name, "newMessage");
                assert_eq!(args, vec![json!({ "id": "1", "message": "yo" })]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_event_encoding_keeps_namespace_and_ack() {
        let packet = Packet::Event {
            namespace: "/radio".into(),
            ack: Some(3),
            name: "typing".into(),
            args: vec![json!({ "isTyping": true })],
        };

        assert_eq!(packet.encode(), r#"2/radio,3["typing",{"isTyping":true}]"#);
    }

    #[test]
    fn test_connect_error() {
        let frame = Frame::decode(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Message(Packet::ConnectError {
                namespace: "/".into(),
                message: "Not authorized".into(),
            })
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(Frame::decode(""), Err(ProtocolError::Empty)));
        assert!(matches!(Frame::decode("9"), Err(ProtocolError::UnknownFrame('9'))));
        assert!(matches!(
            Frame::decode(r#"451-["upload",{"_placeholder":true,"num":0}]"#),
            Err(ProtocolError::Unsupported(_))
        ));
        assert!(matches!(Frame::decode("42[]"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(Frame::decode("42[7]"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(Frame::decode("42{"), Err(ProtocolError::Json(_))));
    }
}
