use crate::channel::{
    MessageChannel, MessageHandler, PublishAck, RawMessage, SubscribeAck, SubscriptionHandle,
    UnsubscribeAck,
};
use crate::error::TransportError;
use officeonline_core::logging::{MemorySink, SinkLayer};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;

/// Runs `f` with a thread-local subscriber and returns every line it logged.
pub(crate) fn capture_logs<F: FnOnce()>(f: F) -> Vec<String> {
    let sink = MemorySink::new();
    let subscriber = tracing_subscriber::registry().with(SinkLayer::new(sink.clone()));
    tracing::subscriber::with_default(subscriber, f);
    sink.lines()
}

/// Transport whose subscribe acknowledgements are held until the test
/// completes them. Unsubscribes are acknowledged immediately.
#[derive(Default)]
pub(crate) struct ManualChannel {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    subscribed: Vec<(String, MessageHandler)>,
    pending: VecDeque<SubscribeAck>,
    unsubscribed: Vec<SubscriptionHandle>,
    unsubscribe_failures: VecDeque<TransportError>,
}

impl ManualChannel {
    pub(crate) fn subscribe_count(&self) -> usize {
        self.state.lock().unwrap().subscribed.len()
    }

    pub(crate) fn subscribed_channels(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.subscribed.iter().map(|(channel, _)| channel.clone()).collect()
    }

    pub(crate) fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
        self.state.lock().unwrap().unsubscribed.clone()
    }

    /// Makes the next unsubscribe acknowledge with `error`.
    pub(crate) fn fail_next_unsubscribe(&self, error: TransportError) {
        self.state.lock().unwrap().unsubscribe_failures.push_back(error);
    }

    /// Resolves the oldest pending subscribe.
    pub(crate) fn complete_next(&self, result: Result<SubscriptionHandle, TransportError>) {
        let ack = self
            .state
            .lock()
            .unwrap()
            .pending
            .pop_front()
            .expect("no pending subscribe");
        ack(result);
    }

    /// Delivers `raw` through the handler of the `index`-th subscribe request.
    pub(crate) fn deliver(&self, index: usize, raw: RawMessage) {
        let handler = self.state.lock().unwrap().subscribed[index].1.clone();
        handler(raw);
    }
}

impl MessageChannel for ManualChannel {
    fn subscribe(&self, channel: &str, on_message: MessageHandler, on_ack: SubscribeAck) {
        let mut state = self.state.lock().unwrap();
        state.subscribed.push((channel.to_string(), on_message));
        state.pending.push_back(on_ack);
    }

    fn unsubscribe(&self, handle: SubscriptionHandle, on_ack: UnsubscribeAck) {
        let failure = {
            let mut state = self.state.lock().unwrap();
            state.unsubscribed.push(handle);
            state.unsubscribe_failures.pop_front()
        };
        match failure {
            Some(error) => on_ack(Err(error)),
            None => on_ack(Ok(())),
        }
    }

    fn publish(&self, _channel: &str, _data: RawMessage, on_ack: PublishAck) {
        on_ack(Ok(()));
    }
}
