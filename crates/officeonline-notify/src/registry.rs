use crate::channel::{ChannelAdapter, SubscriptionHandle};
use crate::dispatcher::EventDispatcher;
use crate::error::TransportError;
use crate::event::Event;
use crate::topic::DocumentTopic;
use officeonline_core::log_error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Entry {
    /// Subscribe sent, acknowledgement not yet back.
    Pending { release_requested: bool },
    Active(SubscriptionHandle),
}

struct RegistryInner {
    adapter: ChannelAdapter,
    dispatcher: EventDispatcher,
    entries: Mutex<HashMap<String, Entry>>,
}

/// At most one transport subscription per document.
///
/// Requests are idempotent: while a subscribe is in flight further requests
/// for the same document are absorbed, and a release issued in that window
/// is applied once the subscription is established. Inbound messages are
/// decoded into [`Event`]s and handed to the dispatcher.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new(adapter: ChannelAdapter, dispatcher: EventDispatcher) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                adapter,
                dispatcher,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn ensure_subscribed(&self, document_id: &str) {
        {
            let mut entries = self.inner.entries();
            match entries.get_mut(document_id) {
                Some(Entry::Active(_)) => return,
                Some(Entry::Pending { release_requested }) => {
                    if *release_requested {
                        tracing::debug!(document_id, "pending release cancelled");
                        *release_requested = false;
                    }
                    return;
                }
                None => {
                    entries.insert(
                        document_id.to_string(),
                        Entry::Pending {
                            release_requested: false,
                        },
                    );
                }
            }
        }

        let topic = DocumentTopic::new(document_id);
        let dispatcher = self.inner.dispatcher.clone();
        let inner = Arc::clone(&self.inner);
        let document = document_id.to_string();
        self.inner.adapter.subscribe(
            &topic,
            move |payload| dispatcher.dispatch(Event::from_payload(payload)),
            move |result| inner.subscribed(document, result),
        );
    }

    /// Drops the document's subscription without waiting for the transport.
    pub fn release(&self, document_id: &str) {
        let handle = {
            let mut entries = self.inner.entries();
            match entries.remove(document_id) {
                Some(Entry::Active(handle)) => Some(handle),
                Some(Entry::Pending { .. }) => {
                    entries.insert(
                        document_id.to_string(),
                        Entry::Pending {
                            release_requested: true,
                        },
                    );
                    None
                }
                None => None,
            }
        };
        if let Some(handle) = handle {
            self.inner.unsubscribe(document_id, handle);
        }
    }

    pub fn release_all(&self) {
        let documents: Vec<String> = self.inner.entries().keys().cloned().collect();
        for document_id in documents {
            self.release(&document_id);
        }
    }

    pub fn is_subscribed(&self, document_id: &str) -> bool {
        matches!(
            self.inner.entries().get(document_id),
            Some(Entry::Active(_))
        )
    }

    pub fn is_pending(&self, document_id: &str) -> bool {
        matches!(
            self.inner.entries().get(document_id),
            Some(Entry::Pending { .. })
        )
    }

    /// The transport handle of an established subscription.
    pub fn handle(&self, document_id: &str) -> Option<SubscriptionHandle> {
        match self.inner.entries().get(document_id) {
            Some(Entry::Active(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn subscribed_documents(&self) -> Vec<String> {
        let mut documents: Vec<String> = self
            .inner
            .entries()
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Active(_)))
            .map(|(document_id, _)| document_id.clone())
            .collect();
        documents.sort();
        documents
    }
}

impl RegistryInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribed(&self, document_id: String, result: Result<SubscriptionHandle, TransportError>) {
        match result {
            Ok(handle) => {
                let stale = {
                    let mut entries = self.entries();
                    match entries.get(&document_id) {
                        Some(Entry::Pending {
                            release_requested: false,
                        }) => {
                            tracing::info!(
                                document_id = %document_id,
                                handle = %handle,
                                "subscribed"
                            );
                            entries.insert(document_id.clone(), Entry::Active(handle));
                            None
                        }
                        Some(Entry::Pending {
                            release_requested: true,
                        }) => {
                            entries.remove(&document_id);
                            Some(handle)
                        }
                        Some(Entry::Active(_)) | None => Some(handle),
                    }
                };
                if let Some(handle) = stale {
                    tracing::debug!(
                        document_id = %document_id,
                        "released before subscribe completed"
                    );
                    self.unsubscribe(&document_id, handle);
                }
            }
            Err(err) => {
                let mut entries = self.entries();
                if matches!(entries.get(&document_id), Some(Entry::Pending { .. })) {
                    entries.remove(&document_id);
                }
                drop(entries);
                tracing::warn!(
                    document_id = %document_id,
                    "subscribe failed, will retry on next request"
                );
                log_error("subscribe", &err);
            }
        }
    }

    fn unsubscribe(&self, document_id: &str, handle: SubscriptionHandle) {
        let document = document_id.to_string();
        self.adapter.unsubscribe(handle, move |result| match result {
            Ok(()) => tracing::debug!(document_id = %document, "unsubscribed"),
            Err(err) => {
                tracing::warn!(document_id = %document, "unsubscribe failed");
                log_error("unsubscribe", &err);
            }
        });
    }
}
