use std::fmt;

/// Channel prefix the server publishes editor events under.
pub const CHANNEL_PREFIX: &str = "/eXo/Application/OfficeOnline/editor/";

/// One document's update channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentTopic {
    document_id: String,
    channel: String,
}

impl DocumentTopic {
    pub fn new(document_id: impl Into<String>) -> Self {
        let document_id = document_id.into();
        let channel = format!("{}{}", CHANNEL_PREFIX, document_id);
        Self {
            document_id,
            channel,
        }
    }

    /// Recovers the topic from a full channel name.
    pub fn parse(channel: &str) -> Option<Self> {
        let document_id = channel.strip_prefix(CHANNEL_PREFIX)?;
        if document_id.is_empty() || document_id.contains('/') {
            return None;
        }
        Some(Self::new(document_id))
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Display for DocumentTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel)
    }
}
