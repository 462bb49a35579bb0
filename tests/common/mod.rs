//! Общие помощники интеграционных тестов.
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use topicbus::{Callback, Payload, SubscriptionInfo, Token};

/// Общий журнал вызовов нескольких шпионов: позволяет проверять
/// относительный порядок срабатываний.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(
        &self,
        label: &str,
    ) {
        self.0.lock().push(label.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Индекс первой записи с этой меткой.
    pub fn first(
        &self,
        label: &str,
    ) -> Option<usize> {
        self.0.lock().iter().position(|l| l == label)
    }

    pub fn called_before(
        &self,
        a: &str,
        b: &str,
    ) -> bool {
        matches!((self.first(a), self.first(b)), (Some(x), Some(y)) if x < y)
    }
}

/// Обработчик, записывающий каждый вызов. Клон шпиона делит с ним и
/// обработчик (та же идентичность), и список вызовов.
#[derive(Clone)]
pub struct Spy {
    callback: Callback,
    calls: Arc<Mutex<Vec<(String, Payload)>>>,
}

impl Spy {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Шпион, который дополнительно отмечается в журнале.
    pub fn logged(
        label: &str,
        journal: &Journal,
    ) -> Self {
        Self::build(Some((label.to_string(), journal.clone())))
    }

    fn build(journal: Option<(String, Journal)>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let callback = Callback::new(move |topic, payload| {
            sink.lock().push((topic.to_string(), payload.clone()));
            if let Some((label, journal)) = &journal {
                journal.mark(label);
            }
        });
        Self { callback, calls }
    }

    pub fn callback(&self) -> Callback {
        self.callback.clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<(String, Payload)> {
        self.calls.lock().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn called_with(
        &self,
        topic: &str,
        payload: &Payload,
    ) -> bool {
        self.calls
            .lock()
            .iter()
            .any(|(t, p)| t == topic && p == payload)
    }
}

/// Данные служебного события о подписке.
pub fn info(
    token: Token,
    spy: &Spy,
) -> Payload {
    Payload::Subscription(SubscriptionInfo {
        token,
        callback: spy.callback(),
    })
}
