use crate::channel::{
    MessageChannel, MessageHandler, PublishAck, RawMessage, SubscribeAck, SubscriptionHandle,
    UnsubscribeAck,
};
use crate::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process transport. Acknowledges every request before returning and
/// fans publications out to the subscribers of the channel.
#[derive(Default)]
pub struct MemoryChannel {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_handle: u64,
    subscriptions: HashMap<SubscriptionHandle, (String, MessageHandler)>,
    subscribe_requests: usize,
    unsubscribe_requests: usize,
    failures: VecDeque<TransportError>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next subscribe request fail with `error`.
    pub fn fail_next_subscribe(&self, error: TransportError) {
        self.state().failures.push_back(error);
    }

    pub fn subscribe_requests(&self) -> usize {
        self.state().subscribe_requests
    }

    pub fn unsubscribe_requests(&self) -> usize {
        self.state().unsubscribe_requests
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state()
            .subscriptions
            .values()
            .filter(|(subscribed, _)| subscribed == channel)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageChannel for MemoryChannel {
    fn subscribe(&self, channel: &str, on_message: MessageHandler, on_ack: SubscribeAck) {
        let result = {
            let mut state = self.state();
            state.subscribe_requests += 1;
            match state.failures.pop_front() {
                Some(error) => Err(error),
                None => {
                    state.next_handle += 1;
                    let handle = SubscriptionHandle::new(format!("sub-{}", state.next_handle));
                    state
                        .subscriptions
                        .insert(handle.clone(), (channel.to_string(), on_message));
                    Ok(handle)
                }
            }
        };
        on_ack(result);
    }

    fn unsubscribe(&self, handle: SubscriptionHandle, on_ack: UnsubscribeAck) {
        let removed = {
            let mut state = self.state();
            state.unsubscribe_requests += 1;
            state.subscriptions.remove(&handle).is_some()
        };
        if removed {
            on_ack(Ok(()));
        } else {
            on_ack(Err(TransportError::UnknownHandle(handle.to_string())));
        }
    }

    fn publish(&self, channel: &str, data: RawMessage, on_ack: PublishAck) {
        let handlers: Vec<MessageHandler> = self
            .state()
            .subscriptions
            .values()
            .filter(|(subscribed, _)| subscribed == channel)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(data.clone());
        }
        on_ack(Ok(()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn expect_subscribed() -> SubscribeAck {
        Box::new(|result: Result<SubscriptionHandle, TransportError>| assert!(result.is_ok()))
    }

    fn counting_handler(counter: &Arc<AtomicUsize>) -> MessageHandler {
        let counter = counter.clone();
        Arc::new(move |_: RawMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn publish_reaches_only_channel_subscribers() {
        let channel = MemoryChannel::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let misses = Arc::new(AtomicUsize::new(0));
        channel.subscribe("/a", counting_handler(&hits), expect_subscribed());
        channel.subscribe("/b", counting_handler(&misses), expect_subscribed());

        channel.publish(
            "/a",
            RawMessage::Text("x".to_string()),
            Box::new(|result: Result<(), TransportError>| assert!(result.is_ok())),
        );

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 0);
        assert_eq!(channel.subscriber_count("/a"), 1);
    }

    #[test]
    fn injected_failure_is_acknowledged() {
        let channel = MemoryChannel::new();
        channel.fail_next_subscribe(TransportError::Network("timeout".to_string()));
        let hits = Arc::new(AtomicUsize::new(0));

        channel.subscribe(
            "/a",
            counting_handler(&hits),
            Box::new(|result: Result<SubscriptionHandle, TransportError>| {
                assert_eq!(result, Err(TransportError::Network("timeout".to_string())))
            }),
        );

        assert_eq!(channel.subscribe_requests(), 1);
        assert_eq!(channel.subscriber_count("/a"), 0);
    }

    #[test]
    fn unsubscribe_unknown_handle_fails() {
        let channel = MemoryChannel::new();
        channel.unsubscribe(
            SubscriptionHandle::new("sub-9"),
            Box::new(|result: Result<(), TransportError>| {
                assert!(matches!(result, Err(TransportError::UnknownHandle(_))))
            }),
        );
        assert_eq!(channel.unsubscribe_requests(), 1);
    }
}
