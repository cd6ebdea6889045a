use crate::dispatcher::{EventDispatcher, EventFilter, ListenerHandle, ListenerId};
use anyhow::Context;
use std::fmt;
use std::sync::Arc;

/// A piece of UI showing a document that must be re-rendered once the
/// document changes elsewhere.
pub trait RefreshSurface: Send + Sync {
    fn refresh(&self) -> anyhow::Result<()>;
}

impl<F> RefreshSurface for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn refresh(&self) -> anyhow::Result<()> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// File preview inside an activity stream entry.
    ActivityStream,
    /// PDF / no-preview fallback panel.
    PdfPreview,
    /// Document view of the explorer.
    Explorer,
}

impl SurfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::ActivityStream => "activity-stream",
            SurfaceKind::PdfPreview => "pdf-preview",
            SurfaceKind::Explorer => "explorer",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refreshes one surface whenever its document is saved. The listener stays
/// registered until [`SurfaceBinding::unbind`].
#[derive(Debug)]
#[must_use = "the surface keeps refreshing until unbound"]
pub struct SurfaceBinding {
    kind: SurfaceKind,
    document_id: String,
    handle: ListenerHandle,
}

impl SurfaceBinding {
    pub fn bind(
        dispatcher: &EventDispatcher,
        kind: SurfaceKind,
        document_id: impl Into<String>,
        surface: Arc<dyn RefreshSurface>,
    ) -> Self {
        let document_id = document_id.into();
        let document = document_id.clone();
        let handle = dispatcher.subscribe_filtered(EventFilter::saved(&document_id), move |event| {
            tracing::debug!(
                surface = %kind,
                document_id = %document,
                actor_id = event.actor_id().unwrap_or("<unknown>"),
                "document saved, refreshing"
            );
            surface
                .refresh()
                .with_context(|| format!("refreshing {} for {}", kind, document))
        });
        Self {
            kind,
            document_id,
            handle,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.handle.id()
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn unbind(self) -> bool {
        self.handle.remove()
    }
}
