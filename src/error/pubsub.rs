use std::{any::Any, sync::Arc};

use thiserror::Error;

use crate::pubsub::Token;

/// Ошибка формата топика.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic must not be empty")]
    Empty,

    #[error("topic '{topic}' has an empty segment at position {position}")]
    EmptySegment { topic: String, position: usize },
}

/// Ошибки публичного API брокера.
///
/// Отписка по неизвестному селектору ошибкой не считается:
/// `unsubscribe` просто возвращает `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PubSubError {
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),
}

pub type PubSubResult<T> = Result<T, PubSubError>;

/// Сбой подписчика во время доставки.
///
/// Не возвращается вызывающему `publish`: уходит в обработчик ошибок
/// брокера и в лог, доставка остальным продолжается.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("subscriber {token} on '{topic}' failed: {reason}")]
pub struct DeliveryError {
    pub topic: Arc<str>,
    pub token: Token,
    pub reason: String,
}

impl DeliveryError {
    /// Собирает ошибку из полезной нагрузки перехваченной паники.
    pub(crate) fn from_panic(
        topic: Arc<str>,
        token: Token,
        panic: Box<dyn Any + Send>,
    ) -> Self {
        let reason = if let Some(msg) = panic.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = panic.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        Self {
            topic,
            token,
            reason,
        }
    }
}
