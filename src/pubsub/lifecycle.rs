//! Служебные события жизненного цикла подписок.
//!
//! Реестр описывает каждое своё изменение значением [`LifecycleEvent`].
//! Брокер превращает эти значения в обычные публикации в служебные
//! топики, которые проходят тем же иерархическим путём, что и
//! пользовательские сообщения:
//!
//! - `@firstsub.<topic>`: у топика появился первый подписчик;
//! - `@sub.<topic>`: добавлена подписка (`{token, callback}`);
//! - `@unsub.<topic>`: снята подписка (`{token, callback}` при отписке
//!   по токену или обработчику, пусто при отписке по имени топика);
//! - `@lastunsub.<topic>`: у топика не осталось подписчиков;
//! - `@unsuball`: плоское событие на каждую подписку, удалённую
//!   `clear_all_subscriptions`.
//!
//! Изменения топиков из служебных пространств имён не анонсируются,
//! иначе подписка на `@sub.foo` породила бы `@sub.@sub.foo` и так далее.

use std::sync::Arc;

use super::{topic, Callback, Payload, SubscriptionInfo, Token};

pub const FIRSTSUB: &str = "@firstsub";
pub const SUB: &str = "@sub";
pub const UNSUB: &str = "@unsub";
pub const LASTUNSUB: &str = "@lastunsub";
pub const UNSUBALL: &str = "@unsuball";

const RESERVED_ROOTS: [&str; 5] = [FIRSTSUB, SUB, UNSUB, LASTUNSUB, UNSUBALL];

/// `true`, если топик лежит в одном из служебных пространств имён.
pub fn is_reserved(topic: &str) -> bool {
    RESERVED_ROOTS.contains(&topic::root(topic))
}

/// Изменение состояния реестра.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    FirstSubscriber {
        topic: Arc<str>,
    },
    Subscribed {
        topic: Arc<str>,
        token: Token,
        callback: Callback,
    },
    Unsubscribed {
        topic: Arc<str>,
        token: Token,
        callback: Callback,
        /// Отписка по токену или обработчику, а не по имени топика.
        explicit: bool,
    },
    LastUnsubscribed {
        topic: Arc<str>,
    },
    /// Подписка удалена массовой очисткой.
    Cleared {
        topic: Arc<str>,
        token: Token,
    },
}

impl LifecycleEvent {
    /// Топик, изменение которого описывает событие.
    pub fn subject(&self) -> &str {
        match self {
            Self::FirstSubscriber { topic }
            | Self::Subscribed { topic, .. }
            | Self::Unsubscribed { topic, .. }
            | Self::LastUnsubscribed { topic }
            | Self::Cleared { topic, .. } => &**topic,
        }
    }

    /// Служебный топик, в который публикуется событие.
    pub fn meta_topic(&self) -> String {
        match self {
            Self::FirstSubscriber { topic } => format!("{FIRSTSUB}.{topic}"),
            Self::Subscribed { topic, .. } => format!("{SUB}.{topic}"),
            Self::Unsubscribed { topic, .. } => format!("{UNSUB}.{topic}"),
            Self::LastUnsubscribed { topic } => format!("{LASTUNSUB}.{topic}"),
            Self::Cleared { .. } => UNSUBALL.to_string(),
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            Self::Subscribed {
                token, callback, ..
            }
            | Self::Unsubscribed {
                token,
                callback,
                explicit: true,
                ..
            } => Payload::Subscription(SubscriptionInfo {
                token: *token,
                callback: callback.clone(),
            }),
            _ => Payload::Empty,
        }
    }

    /// Подавляется ли анонс события защитой от рекурсии.
    ///
    /// `@unsuball` плоский и не подавляется: его слушатели узнают и об
    /// удалении собственных подписок.
    pub fn is_suppressed(&self) -> bool {
        match self {
            Self::Cleared { .. } => false,
            other => is_reserved(other.subject()),
        }
    }
}
