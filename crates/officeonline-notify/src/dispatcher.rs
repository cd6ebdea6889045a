use crate::event::{Event, EventKind};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub type ListenerFn = dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync;

/// Which events a listener wants. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub document_id: Option<String>,
}

impl EventFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind(kind: EventKind) -> Self {
        Self {
            kind: Some(kind),
            document_id: None,
        }
    }

    pub fn saved(document_id: impl Into<String>) -> Self {
        Self::kind(EventKind::DocumentSaved).for_document(document_id)
    }

    pub fn for_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        let Some(kind) = event.kind() else {
            return false;
        };
        if self.kind.is_some_and(|wanted| wanted != kind) {
            return false;
        }
        match &self.document_id {
            Some(wanted) => event.document_id() == Some(wanted.as_str()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    filter: EventFilter,
    action: Arc<ListenerFn>,
}

#[derive(Default)]
struct DispatcherState {
    next_id: u64,
    listeners: Vec<Listener>,
    current: Option<Event>,
}

/// Last-value broadcast of recognized events.
///
/// Listeners run synchronously inside [`EventDispatcher::dispatch`], in
/// registration order, against a snapshot of the listener list taken when
/// the dispatch starts. Listeners may register or remove listeners while
/// running; the change applies from the next dispatch.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<Mutex<DispatcherState>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_listener<F>(&self, action: F) -> ListenerHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_filtered(EventFilter::any(), action)
    }

    pub fn subscribe_filtered<F>(&self, filter: EventFilter, action: F) -> ListenerHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut state = self.state();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state.listeners.push(Listener {
            id,
            filter,
            action: Arc::new(action),
        });
        ListenerHandle {
            id,
            state: Arc::downgrade(&self.inner),
        }
    }

    pub fn dispatch(&self, event: Event) {
        if let Event::Unrecognized { kind, .. } = &event {
            tracing::debug!(
                kind = kind.as_deref().unwrap_or("<none>"),
                "dropping unrecognized event"
            );
            return;
        }

        let targets: Vec<(ListenerId, Arc<ListenerFn>)> = {
            let mut state = self.state();
            state.current = Some(event.clone());
            state
                .listeners
                .iter()
                .filter(|listener| listener.filter.matches(&event))
                .map(|listener| (listener.id, Arc::clone(&listener.action)))
                .collect()
        };

        for (id, action) in targets {
            match catch_unwind(AssertUnwindSafe(|| action(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(
                    listener = id.0,
                    error = %format!("{:#}", err),
                    "listener failed"
                ),
                Err(_) => tracing::warn!(listener = id.0, "listener panicked"),
            }
        }
    }

    /// The last recognized event dispatched, if any.
    pub fn current(&self) -> Option<Event> {
        self.state().current.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    fn state(&self) -> MutexGuard<'_, DispatcherState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deregistration handle returned by the dispatcher. Dropping it keeps the
/// listener registered.
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    state: Weak<Mutex<DispatcherState>>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the listener. Returns false when it was already gone.
    pub fn remove(self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.listeners.len();
        state.listeners.retain(|listener| listener.id != self.id);
        state.listeners.len() != before
    }
}
