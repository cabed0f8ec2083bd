mod child;
mod parent;
mod transport;

pub use child::ForkedActorChild;
pub use parent::ForkedActorParent;
pub use transport::{ChildTransport, StdioTransport, Transport, TransportEvent};
