use crate::channel::Payload;
use serde_json::{json, Map, Value};
use std::fmt;

pub const DOCUMENT_SAVED: &str = "DOCUMENT_SAVED";
pub const DOCUMENT_RENAMED: &str = "DOCUMENT_RENAMED";
pub const VERSIONS_REQUESTED: &str = "VERSIONS_REQUESTED";

const KIND_KEYS: &[&str] = &["type", "kind"];
const DOCUMENT_KEYS: &[&str] = &["fileId", "documentId"];
const ACTOR_KEYS: &[&str] = &["userId", "actorId"];
const NAME_KEYS: &[&str] = &["newName", "name"];

/// The closed set of event kinds listeners can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DocumentSaved,
    DocumentRenamed,
    VersionsRequested,
}

impl EventKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            DOCUMENT_SAVED => Some(EventKind::DocumentSaved),
            DOCUMENT_RENAMED => Some(EventKind::DocumentRenamed),
            VERSIONS_REQUESTED => Some(EventKind::VersionsRequested),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DocumentSaved => DOCUMENT_SAVED,
            EventKind::DocumentRenamed => DOCUMENT_RENAMED,
            EventKind::VersionsRequested => VERSIONS_REQUESTED,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The document was saved by `actor_id`. Fields other than kind,
    /// document and actor are kept in `fields`.
    DocumentSaved {
        document_id: String,
        actor_id: Option<String>,
        fields: Map<String, Value>,
    },
    /// The editor renamed the document.
    DocumentRenamed {
        document_id: String,
        new_name: String,
    },
    /// The editor asked for the version history.
    VersionsRequested { document_id: String },
    /// Anything else, with its kind tag when it had one.
    Unrecognized {
        kind: Option<String>,
        payload: Payload,
    },
}

impl Event {
    pub fn saved(document_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Event::DocumentSaved {
            document_id: document_id.into(),
            actor_id: Some(actor_id.into()),
            fields: Map::new(),
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::DocumentSaved { .. } => Some(EventKind::DocumentSaved),
            Event::DocumentRenamed { .. } => Some(EventKind::DocumentRenamed),
            Event::VersionsRequested { .. } => Some(EventKind::VersionsRequested),
            Event::Unrecognized { .. } => None,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            Event::DocumentSaved { document_id, .. }
            | Event::DocumentRenamed { document_id, .. }
            | Event::VersionsRequested { document_id } => Some(document_id.as_str()),
            Event::Unrecognized { .. } => None,
        }
    }

    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Event::DocumentSaved { actor_id, .. } => actor_id.as_deref(),
            _ => None,
        }
    }

    /// Classifies a decoded channel payload. Never fails: whatever cannot be
    /// recognized comes back as [`Event::Unrecognized`].
    pub fn from_payload(payload: Payload) -> Self {
        match payload {
            Payload::Json(Value::Object(fields)) => Self::from_object(fields),
            other => Event::Unrecognized {
                kind: None,
                payload: other,
            },
        }
    }

    fn from_object(mut fields: Map<String, Value>) -> Self {
        let kind = str_field(&fields, KIND_KEYS);
        let recognized = kind.as_deref().and_then(EventKind::parse);
        let document_id = str_field(&fields, DOCUMENT_KEYS);

        match (recognized, document_id) {
            (Some(EventKind::DocumentSaved), Some(document_id)) => {
                let actor_id = str_field(&fields, ACTOR_KEYS);
                for key in KIND_KEYS.iter().chain(DOCUMENT_KEYS).chain(ACTOR_KEYS) {
                    fields.remove(*key);
                }
                Event::DocumentSaved {
                    document_id,
                    actor_id,
                    fields,
                }
            }
            (Some(EventKind::DocumentRenamed), Some(document_id)) => {
                match str_field(&fields, NAME_KEYS) {
                    Some(new_name) => Event::DocumentRenamed {
                        document_id,
                        new_name,
                    },
                    None => Event::Unrecognized {
                        kind,
                        payload: Payload::Json(Value::Object(fields)),
                    },
                }
            }
            (Some(EventKind::VersionsRequested), Some(document_id)) => {
                Event::VersionsRequested { document_id }
            }
            _ => Event::Unrecognized {
                kind,
                payload: Payload::Json(Value::Object(fields)),
            },
        }
    }

    /// Channel representation, in the shape the server publishes.
    pub fn to_wire(&self) -> Option<Value> {
        match self {
            Event::DocumentSaved {
                document_id,
                actor_id,
                fields,
            } => {
                let mut map = fields.clone();
                map.insert("type".to_string(), Value::from(DOCUMENT_SAVED));
                map.insert("fileId".to_string(), Value::from(document_id.as_str()));
                if let Some(actor_id) = actor_id {
                    map.insert("userId".to_string(), Value::from(actor_id.as_str()));
                }
                Some(Value::Object(map))
            }
            Event::DocumentRenamed {
                document_id,
                new_name,
            } => Some(json!({
                "type": DOCUMENT_RENAMED,
                "fileId": document_id,
                "newName": new_name,
            })),
            Event::VersionsRequested { document_id } => Some(json!({
                "type": VERSIONS_REQUESTED,
                "fileId": document_id,
            })),
            Event::Unrecognized { .. } => None,
        }
    }
}

fn str_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
