pub mod bindings;
pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod frame;
pub mod memory;
pub mod notifier;
pub mod registry;
pub mod topic;

#[cfg(test)]
mod testing;

pub use bindings::{RefreshSurface, SurfaceBinding, SurfaceKind};
pub use channel::{ChannelAdapter, MessageChannel, Payload, RawMessage, SubscriptionHandle};
pub use dispatcher::{EventDispatcher, EventFilter, ListenerHandle, ListenerId};
pub use error::{FrameError, TransportError};
pub use event::{Event, EventKind};
pub use frame::{FrameBinding, FrameMessage};
pub use memory::MemoryChannel;
pub use notifier::Notifier;
pub use registry::SubscriptionRegistry;
pub use topic::DocumentTopic;
