use crate::error::TransportError;
use crate::topic::DocumentTopic;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque token a transport hands back for a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(String);

impl SubscriptionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a transport delivers: already structured data, or text that may
/// hold JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Data(Value),
    Text(String),
}

pub type MessageHandler = Arc<dyn Fn(RawMessage) + Send + Sync>;
pub type SubscribeAck = Box<dyn FnOnce(Result<SubscriptionHandle, TransportError>) + Send>;
pub type UnsubscribeAck = Box<dyn FnOnce(Result<(), TransportError>) + Send>;
pub type PublishAck = Box<dyn FnOnce(Result<(), TransportError>) + Send>;

/// A publish/subscribe transport (CometD or anything shaped like it).
///
/// Every request is answered by exactly one call of its acknowledgement,
/// either before the method returns or later from the transport's own loop.
/// Failures are reported through the acknowledgement only.
pub trait MessageChannel: Send + Sync {
    fn subscribe(&self, channel: &str, on_message: MessageHandler, on_ack: SubscribeAck);
    fn unsubscribe(&self, handle: SubscriptionHandle, on_ack: UnsubscribeAck);
    fn publish(&self, channel: &str, data: RawMessage, on_ack: PublishAck);
}

/// Decoded message content.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn decode(raw: RawMessage) -> Self {
        match raw {
            RawMessage::Data(Value::String(text)) | RawMessage::Text(text) => Self::from_text(text),
            RawMessage::Data(value) => Payload::Json(value),
        }
    }

    /// Parses text that looks like JSON (leading `{` or `[`). Anything else,
    /// or JSON that fails to parse, is kept as the original text.
    pub fn from_text(text: String) -> Self {
        let head = text.trim_start();
        if !(head.starts_with('{') || head.starts_with('[')) {
            return Payload::Text(text);
        }
        match serde_json::from_str(head) {
            Ok(value) => Payload::Json(value),
            Err(err) => {
                tracing::warn!(error = %err, "malformed channel message, keeping raw text");
                Payload::Text(text)
            }
        }
    }
}

/// Thin pass-through over a [`MessageChannel`] that decodes payloads before
/// handing them to the subscriber.
#[derive(Clone)]
pub struct ChannelAdapter {
    transport: Arc<dyn MessageChannel>,
}

impl ChannelAdapter {
    pub fn new(transport: Arc<dyn MessageChannel>) -> Self {
        Self { transport }
    }

    pub fn subscribe<M, A>(&self, topic: &DocumentTopic, on_message: M, on_ack: A)
    where
        M: Fn(Payload) + Send + Sync + 'static,
        A: FnOnce(Result<SubscriptionHandle, TransportError>) + Send + 'static,
    {
        tracing::debug!(channel = %topic, "subscribing");
        let handler: MessageHandler =
            Arc::new(move |raw: RawMessage| on_message(Payload::decode(raw)));
        self.transport
            .subscribe(topic.channel(), handler, Box::new(on_ack));
    }

    pub fn unsubscribe<A>(&self, handle: SubscriptionHandle, on_ack: A)
    where
        A: FnOnce(Result<(), TransportError>) + Send + 'static,
    {
        tracing::debug!(handle = %handle, "unsubscribing");
        self.transport.unsubscribe(handle, Box::new(on_ack));
    }

    pub fn publish<A>(&self, topic: &DocumentTopic, data: Value, on_ack: A)
    where
        A: FnOnce(Result<(), TransportError>) + Send + 'static,
    {
        self.transport
            .publish(topic.channel(), RawMessage::Data(data), Box::new(on_ack));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::memory::MemoryChannel;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn structured_data_passes_through() {
        let payload = Payload::decode(RawMessage::Data(json!({"type": "DOCUMENT_SAVED"})));
        assert_eq!(payload, Payload::Json(json!({"type": "DOCUMENT_SAVED"})));
    }

    #[test]
    fn json_text_is_parsed() {
        let payload = Payload::decode(RawMessage::Text(
            r#"  {"type": "DOCUMENT_SAVED", "fileId": "a"}"#.to_string(),
        ));
        assert_eq!(payload, Payload::Json(json!({"type": "DOCUMENT_SAVED", "fileId": "a"})));

        let payload = Payload::decode(RawMessage::Data(Value::String("[1, 2]".to_string())));
        assert_eq!(payload, Payload::Json(json!([1, 2])));
    }

    #[test]
    fn invalid_json_falls_back_to_text() {
        for raw in ["not json {", "{not json", "[1, 2"] {
            let payload = Payload::decode(RawMessage::Text(raw.to_string()));
            assert_eq!(payload, Payload::Text(raw.to_string()));
        }
    }

    #[test]
    fn adapter_decodes_deliveries() {
        let transport = Arc::new(MemoryChannel::new());
        let adapter = ChannelAdapter::new(transport.clone());
        let topic = DocumentTopic::new("doc-1");
        let received = Arc::new(Mutex::new(Vec::new()));
        let acked = Arc::new(Mutex::new(None));

        let sink = received.clone();
        let ack = acked.clone();
        adapter.subscribe(
            &topic,
            move |payload| sink.lock().unwrap().push(payload),
            move |result| *ack.lock().unwrap() = Some(result),
        );
        assert!(matches!(*acked.lock().unwrap(), Some(Ok(_))));

        transport.publish(
            topic.channel(),
            RawMessage::Text(r#"{"type": "DOCUMENT_SAVED"}"#.to_string()),
            Box::new(|_: Result<(), TransportError>| {}),
        );
        assert_eq!(
            *received.lock().unwrap(),
            vec![Payload::Json(json!({"type": "DOCUMENT_SAVED"}))]
        );
    }

    #[test]
    fn adapter_publishes_to_topic_subscribers() {
        let transport = Arc::new(MemoryChannel::new());
        let adapter = ChannelAdapter::new(transport.clone());
        let saved = DocumentTopic::new("doc-1");
        let other = DocumentTopic::new("doc-2");
        let received = Arc::new(Mutex::new(Vec::new()));
        let published = Arc::new(Mutex::new(None));

        let sink = received.clone();
        adapter.subscribe(
            &saved,
            move |payload| sink.lock().unwrap().push(Event::from_payload(payload)),
            |_: Result<SubscriptionHandle, TransportError>| {},
        );
        adapter.subscribe(
            &other,
            |_: Payload| panic!("delivered to the wrong document"),
            |_: Result<SubscriptionHandle, TransportError>| {},
        );

        let event = Event::saved("doc-1", "u1");
        let ack = published.clone();
        adapter.publish(
            &saved,
            event.to_wire().expect("saved events have a wire form"),
            move |result| *ack.lock().unwrap() = Some(result),
        );

        assert_eq!(*published.lock().unwrap(), Some(Ok(())));
        assert_eq!(*received.lock().unwrap(), vec![event]);
    }
}
