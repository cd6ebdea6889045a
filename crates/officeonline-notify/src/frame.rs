use crate::channel::Payload;
use crate::dispatcher::EventDispatcher;
use crate::error::FrameError;
use crate::event::Event;
use serde::Deserialize;
use serde_json::Value;

pub const FILE_RENAME: &str = "File_Rename";
pub const UI_FILE_VERSIONS: &str = "UI_FileVersions";

/// WOPI postMessage envelope sent by the embedded editor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PostMessage {
    message_id: String,
    #[serde(default)]
    values: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    Rename { new_name: String },
    FileVersions,
    Other(String),
}

impl FrameMessage {
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let message: PostMessage = serde_json::from_str(raw)?;
        match message.message_id.as_str() {
            FILE_RENAME => {
                let new_name = message
                    .values
                    .get("NewName")
                    .and_then(Value::as_str)
                    .ok_or_else(|| FrameError::MissingValue {
                        message_id: message.message_id.clone(),
                        field: "NewName",
                    })?;
                Ok(FrameMessage::Rename {
                    new_name: new_name.to_string(),
                })
            }
            UI_FILE_VERSIONS => Ok(FrameMessage::FileVersions),
            _ => Ok(FrameMessage::Other(message.message_id)),
        }
    }
}

/// Feeds the editor frame's postMessages for one document into the
/// dispatcher. The frame may post any number of times, or never.
#[derive(Clone)]
pub struct FrameBinding {
    document_id: String,
    dispatcher: EventDispatcher,
}

impl FrameBinding {
    pub fn new(document_id: impl Into<String>, dispatcher: EventDispatcher) -> Self {
        Self {
            document_id: document_id.into(),
            dispatcher,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn on_post_message(&self, raw: &str) {
        let event = match FrameMessage::parse(raw) {
            Ok(FrameMessage::Rename { new_name }) => Event::DocumentRenamed {
                document_id: self.document_id.clone(),
                new_name,
            },
            Ok(FrameMessage::FileVersions) => Event::VersionsRequested {
                document_id: self.document_id.clone(),
            },
            Ok(FrameMessage::Other(message_id)) => Event::Unrecognized {
                kind: Some(message_id),
                payload: Payload::from_text(raw.to_string()),
            },
            Err(err) => {
                tracing::warn!(
                    document_id = %self.document_id,
                    error = %err,
                    "ignoring frame message"
                );
                return;
            }
        };
        self.dispatcher.dispatch(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventFilter;
    use crate::event::EventKind;
    use std::sync::{Arc, Mutex};

    #[test]
    fn parses_wopi_messages() {
        let rename = r#"{"MessageId": "File_Rename", "SendTime": 1700000000000,
            "Values": {"NewName": "Q3 report"}}"#;
        assert_eq!(
            FrameMessage::parse(rename).unwrap(),
            FrameMessage::Rename {
                new_name: "Q3 report".to_string()
            }
        );
        assert_eq!(
            FrameMessage::parse(r#"{"MessageId": "UI_FileVersions", "SendTime": 1}"#).unwrap(),
            FrameMessage::FileVersions
        );
        assert_eq!(
            FrameMessage::parse(r#"{"MessageId": "App_LoadingStatus", "Values": {}}"#).unwrap(),
            FrameMessage::Other("App_LoadingStatus".to_string())
        );
    }

    #[test]
    fn rename_without_name_is_an_error() {
        let err = FrameMessage::parse(r#"{"MessageId": "File_Rename", "Values": {}}"#).unwrap_err();
        assert!(matches!(err, FrameError::MissingValue { field: "NewName", .. }));
        assert!(matches!(
            FrameMessage::parse("garbage").unwrap_err(),
            FrameError::Malformed(_)
        ));
    }

    #[test]
    fn frame_events_reach_listeners_of_the_document() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        dispatcher.subscribe_filtered(
            EventFilter::kind(EventKind::DocumentRenamed).for_document("doc-7"),
            move |event| {
                sink.lock().unwrap().push(event.clone());
                Ok(())
            },
        );
        let frame = FrameBinding::new("doc-7", dispatcher.clone());

        frame.on_post_message(
            r#"{"MessageId": "File_Rename", "Values": {"NewName": "Plan.docx"}}"#,
        );
        frame.on_post_message(r#"{"MessageId": "UI_FileVersions"}"#);
        frame.on_post_message("not a message");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::DocumentRenamed {
                document_id: "doc-7".to_string(),
                new_name: "Plan.docx".to_string(),
            }]
        );
        assert_eq!(
            dispatcher.current(),
            Some(Event::VersionsRequested {
                document_id: "doc-7".to_string()
            })
        );
    }
}
