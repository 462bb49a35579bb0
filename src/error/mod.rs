pub mod pubsub;

pub use pubsub::{DeliveryError, PubSubError, PubSubResult, TopicError};
