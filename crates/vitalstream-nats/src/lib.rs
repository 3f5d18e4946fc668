mod client;
mod consumer;
mod raw_event_forwarder;
mod traits;

pub use client::{JetStreamContext, NatsClient};
pub use consumer::{Disposition, MessageProcessor, NatsConsumer};
pub use raw_event_forwarder::NatsRawEventForwarder;
pub use traits::JetStreamPublisher;

#[cfg(any(test, feature = "testing"))]
pub use traits::MockJetStreamPublisher;
