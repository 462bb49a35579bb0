use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use super::Payload;

/// Счётчик токенов, общий для всех брокеров процесса.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Непрозрачный идентификатор живой подписки.
///
/// Уникален в пределах процесса и никогда не переиспользуется,
/// даже после удаления подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub(crate) fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Числовое значение токена.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "uid_{}", self.0)
    }
}

type CallbackFn = dyn Fn(&str, &Payload) + Send + Sync;

/// Обработчик сообщений, вызываемый с `(topic, payload)`.
///
/// Клоны разделяют одну и ту же идентичность: отписка по
/// `Callback` удаляет все подписки, созданные с любым его клоном.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &Payload) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Вызывает обработчик.
    pub fn call(
        &self,
        topic: &str,
        payload: &Payload,
    ) {
        (self.0)(topic, payload)
    }

    /// Сравнение по ссылке: `true`, если оба значения указывают на один
    /// и тот же обработчик.
    pub fn ptr_eq(
        &self,
        other: &Callback,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<F> From<F> for Callback
where
    F: Fn(&str, &Payload) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl PartialEq for Callback {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Что именно снимать при отписке.
///
/// Вид селектора задаётся явно; `From`-преобразования позволяют
/// передавать `Token`, `Callback` или имя топика напрямую.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Ровно одна подписка с этим токеном.
    Token(Token),
    /// Все подписки с этим обработчиком во всех топиках.
    Callback(Callback),
    /// Все подписки на топик и на всех его потомков.
    Topic(String),
}

impl Selector {
    /// `true` для отписки по токену или обработчику. Такие отписки
    /// анонсируются с данными о подписке.
    pub fn is_explicit(&self) -> bool {
        !matches!(self, Selector::Topic(_))
    }
}

impl From<Token> for Selector {
    fn from(token: Token) -> Self {
        Selector::Token(token)
    }
}

impl From<Callback> for Selector {
    fn from(callback: Callback) -> Self {
        Selector::Callback(callback)
    }
}

impl From<&Callback> for Selector {
    fn from(callback: &Callback) -> Self {
        Selector::Callback(callback.clone())
    }
}

impl From<&str> for Selector {
    fn from(topic: &str) -> Self {
        Selector::Topic(topic.to_string())
    }
}

impl From<String> for Selector {
    fn from(topic: String) -> Self {
        Selector::Topic(topic)
    }
}

/// Живая подписка в реестре.
#[derive(Debug, Clone)]
pub(crate) struct Subscription {
    pub token: Token,
    pub topic: Arc<str>,
    pub callback: Callback,
    /// Порядковый номер регистрации в пределах реестра.
    pub seq: u64,
    /// Подписка снимается при первой доставке.
    pub once: bool,
}
