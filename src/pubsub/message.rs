use std::sync::Arc;

use bytes::Bytes;

use super::{Callback, Token};

/// Данные о подписке, передаваемые в событиях `@sub.*` и `@unsub.*`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    pub token: Token,
    pub callback: Callback,
}

/// Полезная нагрузка сообщения.
///
/// Клонирование дешёвое: все варианты разделяют данные.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Пустые данные (`{}` в служебных событиях).
    #[default]
    Empty,
    Bytes(Bytes),
    Text(Arc<str>),
    Json(serde_json::Value),
    /// Данные служебных событий о подписке.
    Subscription(SubscriptionInfo),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn subscription(&self) -> Option<&SubscriptionInfo> {
        match self {
            Payload::Subscription(info) => Some(info),
            _ => None,
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Bytes(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(v))
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(Arc::from(s))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(Arc::from(s))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

impl From<SubscriptionInfo> for Payload {
    fn from(info: SubscriptionInfo) -> Self {
        Payload::Subscription(info)
    }
}
