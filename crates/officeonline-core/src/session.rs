use crate::config::ChannelConfig;
use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;

/// Per-login state shared by everything the client sets up for the user:
/// identity, push channel settings and the i18n message bundle.
#[derive(Debug, Clone)]
pub struct SessionContext {
    user_id: String,
    channel: ChannelConfig,
    messages: HashMap<String, String>,
}

impl SessionContext {
    pub fn new(
        user_id: impl Into<String>,
        channel: ChannelConfig,
        messages: HashMap<String, String>,
    ) -> CoreResult<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(CoreError::Session("authenticated user required".to_string()));
        }
        channel.validate()?;
        Ok(Self {
            user_id,
            channel,
            messages,
        })
    }

    /// Builds a session from what the server renders into the page: the user
    /// id, the channel config JSON and the message bundle JSON.
    ///
    /// A broken message bundle is not fatal; the session starts with no
    /// translations and lookups fall back to the key.
    pub fn init(user_id: &str, channel_json: &str, messages_json: &str) -> CoreResult<Self> {
        let channel = ChannelConfig::from_json(channel_json)?;
        let messages = match serde_json::from_str::<HashMap<String, String>>(messages_json) {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read messages bundle, using keys");
                HashMap::new()
            }
        };
        let session = Self::new(user_id, channel, messages)?;
        tracing::info!(user_id = %session.user_id, "session initialised");
        Ok(session)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn channel(&self) -> &ChannelConfig {
        &self.channel
    }

    /// Localised message for `key`, or the key itself when missing.
    pub fn message<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(String::as_str).unwrap_or(key)
    }
}
