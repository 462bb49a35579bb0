//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Внутрипроцессный брокер с иерархическими топиками:
//!
//! - `topic`: разбор топиков и цепочки предков.
//! - `subscriber`: токены, обработчики и селекторы отписки.
//! - `message`: полезная нагрузка сообщений.
//! - `registry` (приватный): хранилище подписок.
//! - `dispatcher` (приватный): очередь отложенных доставок.
//! - `lifecycle`: служебные события `@sub`, `@unsub` и другие.
//! - `broker`: публичный фасад.
//! - `driver`: фоновая задача tokio, разбирающая очередь.

pub mod broker;
mod dispatcher;
pub mod driver;
pub mod lifecycle;
pub mod message;
mod registry;
pub mod subscriber;
pub mod topic;

pub use broker::*;
pub use driver::*;
pub use lifecycle::LifecycleEvent;
pub use message::*;
pub use subscriber::*;
