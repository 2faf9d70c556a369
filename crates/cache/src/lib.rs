pub mod pubsub;
pub mod values;

pub use pubsub::{INSERT_CHANNEL, Notifier, RedisNotifier, Subscription};
pub use values::{CacheError, PLACEHOLDER, RedisValueCache, Result, VALUES_KEY, ValueCache, connect_with_retry, open_client};
