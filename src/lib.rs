//! Внутрипроцессная шина сообщений с иерархическими топиками.
//!
//! Подписчик на `a` получает всё, что публикуется в `a`, `a.b`, `a.b.c`.
//! Доставка отложенная: `publish` ставит задачи в очередь, обработчики
//! вызываются при `drain` (вручную или из [`spawn_driver`]). Изменения
//! реестра анонсируются служебными топиками `@sub.*`, `@unsub.*`,
//! `@firstsub.*`, `@lastunsub.*` и `@unsuball`.
//!
//! ```
//! use topicbus::{Broker, Callback};
//!
//! let broker = Broker::new();
//! broker
//!     .subscribe("orders", Callback::new(|topic, payload| {
//!         println!("{topic}: {payload:?}");
//!     }))
//!     .unwrap();
//!
//! assert!(broker.publish("orders.created", "id=42").unwrap());
//! assert_eq!(broker.drain(), 1);
//! ```

/// Settings loading: broker behaviour and logging.
pub mod config;
/// Error types: topic validation, API errors, delivery failures.
pub mod error;
/// Logging setup (filters, formatting).
pub mod logging;
/// Pub/Sub: Broker, Registry, Dispatcher, lifecycle events.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use self::config::{BrokerConfig, ConfigError, Settings};
/// Operation errors and result types.
pub use error::{DeliveryError, PubSubError, PubSubResult, TopicError};
/// logging
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Pub/Sub API.
pub use pubsub::{
    spawn_driver, Broker, BrokerBuilder, BrokerStats, Callback, DispatchDriver, ErrorHandler,
    LifecycleEvent, Payload, Selector, SubscriptionInfo, Token,
};
