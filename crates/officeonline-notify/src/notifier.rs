use crate::bindings::{RefreshSurface, SurfaceBinding, SurfaceKind};
use crate::channel::{ChannelAdapter, MessageChannel};
use crate::dispatcher::{EventDispatcher, ListenerId};
use crate::frame::FrameBinding;
use crate::registry::SubscriptionRegistry;
use officeonline_core::SessionContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything one logged-in user's page needs to learn about document
/// saves: created at login with the session context, closed on logout or
/// navigation.
pub struct Notifier {
    session: Arc<SessionContext>,
    dispatcher: EventDispatcher,
    registry: SubscriptionRegistry,
    bindings: Mutex<HashMap<String, Vec<SurfaceBinding>>>,
}

impl Notifier {
    pub fn new(session: SessionContext, transport: Arc<dyn MessageChannel>) -> Self {
        let dispatcher = EventDispatcher::new();
        let adapter = ChannelAdapter::new(transport);
        let registry = SubscriptionRegistry::new(adapter, dispatcher.clone());
        tracing::info!(
            user_id = session.user_id(),
            channel = %session.channel().path,
            "notifier started"
        );
        Self {
            session: Arc::new(session),
            dispatcher,
            registry,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Refreshes `surface` whenever `document_id` is saved, subscribing to
    /// the document's channel if nothing else did yet. The surface stays
    /// bound until the document is released.
    pub fn watch(
        &self,
        document_id: &str,
        kind: SurfaceKind,
        surface: Arc<dyn RefreshSurface>,
    ) -> ListenerId {
        // Bind first: an in-process transport may deliver during subscribe.
        let binding = SurfaceBinding::bind(&self.dispatcher, kind, document_id, surface);
        let id = binding.id();
        self.bindings()
            .entry(document_id.to_string())
            .or_default()
            .push(binding);
        self.registry.ensure_subscribed(document_id);
        id
    }

    /// Number of surfaces currently bound to `document_id`.
    pub fn watch_count(&self, document_id: &str) -> usize {
        self.bindings().get(document_id).map_or(0, Vec::len)
    }

    /// Unbinds every surface of the document and drops its subscription.
    pub fn release(&self, document_id: &str) {
        let bindings = self.bindings().remove(document_id).unwrap_or_default();
        for binding in bindings {
            binding.unbind();
        }
        self.registry.release(document_id);
    }

    pub fn frame(&self, document_id: &str) -> FrameBinding {
        FrameBinding::new(document_id, self.dispatcher.clone())
    }

    /// Ends the session, releasing every subscription.
    pub fn close(self) {
        let bindings = std::mem::take(&mut *self.bindings());
        for binding in bindings.into_values().flatten() {
            binding.unbind();
        }
        self.registry.release_all();
        tracing::info!(user_id = self.session.user_id(), "notifier closed");
    }

    fn bindings(&self) -> MutexGuard<'_, HashMap<String, Vec<SurfaceBinding>>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
