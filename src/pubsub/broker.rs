use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::{futures::Notified, Notify};
use tracing::{debug, error, trace, warn};

use super::{
    dispatcher::{Delivery, Dispatcher, DrainGate},
    lifecycle::{self, LifecycleEvent},
    registry::Registry,
    topic, Callback, Payload, Selector, Subscription, Token,
};
use crate::{
    config::BrokerConfig,
    error::{DeliveryError, PubSubResult},
};

/// Внешний обработчик сбоев доставки.
pub type ErrorHandler = Arc<dyn Fn(&DeliveryError) + Send + Sync>;

static GLOBAL: Lazy<Broker> = Lazy::new(Broker::new);

/// Реестр и очередь под одной блокировкой: изменение реестра и постановка
/// его служебных событий в очередь атомарны относительно других потоков.
#[derive(Default)]
struct State {
    registry: Registry,
    dispatcher: Dispatcher,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Снимок статистики брокера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerStats {
    /// Вызовов `publish`/`publish_sync` с корректным топиком.
    pub published: u64,
    /// Успешных вызовов обработчиков.
    pub delivered: u64,
    /// Обработчиков, завершившихся паникой.
    pub failed: u64,
    /// Доставок одноразовым подписчикам, которые уже сработали.
    pub skipped: u64,
    /// Доставок, ожидающих разбора очереди.
    pub pending: usize,
    /// Живых подписок.
    pub subscriptions: usize,
}

/// Иерархический Pub/Sub брокер.
///
/// Поддерживает:
/// - Подписки на точный топик с доставкой по всей цепочке предков
///   (`a` получает публикации в `a.b.c`)
/// - Отписку по токену, обработчику или имени топика (с потомками)
/// - Отложенную доставку через FIFO-очередь и явный [`Broker::drain`]
/// - Служебные события `@sub`, `@unsub`, `@firstsub`, `@lastunsub`,
///   `@unsuball`
pub struct Broker {
    state: Mutex<State>,
    gate: DrainGate,
    wakeup: Notify,
    config: BrokerConfig,
    error_handler: Option<ErrorHandler>,
    counters: Counters,
}

impl Broker {
    /// Создаёт брокер с конфигурацией по умолчанию.
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            state: Mutex::new(State::default()),
            gate: DrainGate::default(),
            wakeup: Notify::new(),
            config,
            error_handler: None,
            counters: Counters::default(),
        }
    }

    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Общий экземпляр процесса. Удобство, а не единственный способ:
    /// независимые брокеры создаются через [`Broker::new`].
    pub fn global() -> &'static Broker {
        &GLOBAL
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Подписка на топик.
    ///
    /// Ставит в очередь `@firstsub.<topic>` (если это первая подписка на
    /// точный топик) и затем `@sub.<topic>`.
    ///
    /// Через `impl Into<Callback>` типы аргументов замыкания не выводятся:
    /// либо указывайте их (`|t: &str, p: &Payload| ..`), либо оборачивайте
    /// в [`Callback::new`], либо используйте [`Broker::subscribe_fn`].
    pub fn subscribe(
        &self,
        topic: &str,
        callback: impl Into<Callback>,
    ) -> PubSubResult<Token> {
        self.insert(topic, callback.into(), false)
    }

    /// Подписка, которая снимается при первой доставке.
    pub fn subscribe_once(
        &self,
        topic: &str,
        callback: impl Into<Callback>,
    ) -> PubSubResult<Token> {
        self.insert(topic, callback.into(), true)
    }

    /// Подписка голым замыканием с выводом типов аргументов.
    pub fn subscribe_fn<F>(
        &self,
        topic: &str,
        callback: F,
    ) -> PubSubResult<Token>
    where
        F: Fn(&str, &Payload) + Send + Sync + 'static,
    {
        self.insert(topic, Callback::new(callback), false)
    }

    /// Снимает подписки по селектору. Возвращает `true`, если что-то
    /// было удалено; неизвестный селектор не является ошибкой.
    pub fn unsubscribe(
        &self,
        selector: impl Into<Selector>,
    ) -> bool {
        let selector = selector.into();
        let mut state = self.state.lock();
        let events = state.registry.remove(&selector);
        let removed = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Unsubscribed { .. }))
            .count();
        self.announce(&mut state, events);
        drop(state);

        debug!(?selector, removed, "unsubscribe");
        removed > 0
    }

    /// Публикация с отложенной доставкой.
    ///
    /// Возвращает `true`, если на момент вызова в цепочке предков топика
    /// был хотя бы один подписчик. Сами обработчики вызываются при
    /// следующем [`Broker::drain`].
    pub fn publish(
        &self,
        topic: &str,
        payload: impl Into<Payload>,
    ) -> PubSubResult<bool> {
        topic::validate(topic)?;
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        let matched = self.enqueue_matching(&mut state, topic, payload.into());
        drop(state);

        debug!(topic, matched, "publish");
        Ok(matched > 0)
    }

    /// Публикация с немедленным вызовом обработчиков, минуя очередь.
    pub fn publish_sync(
        &self,
        topic: &str,
        payload: impl Into<Payload>,
    ) -> PubSubResult<bool> {
        topic::validate(topic)?;
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let matched = self.state.lock().registry.resolve(topic);
        debug!(topic, matched = matched.len(), "publish_sync");
        if matched.is_empty() {
            return Ok(false);
        }

        let payload = payload.into();
        let topic: Arc<str> = Arc::from(topic);
        for sub in matched {
            self.deliver(Delivery {
                callback: sub.callback,
                topic: Arc::clone(&topic),
                payload: payload.clone(),
                token: sub.token,
                once: sub.once,
            });
        }
        Ok(true)
    }

    /// Удаляет все подписки (или только `prefix` и его потомков).
    ///
    /// На каждую удалённую подписку в порядке регистрации ставит в очередь
    /// плоское `@unsuball`. Слушатели `@unsuball` определяются до очистки,
    /// каждый обработчик учитывается один раз, даже если подписан
    /// несколько раз. Одноразовый слушатель получает только первое событие
    /// и снимается сразу, даже если очистка его не затронула.
    /// Возвращает число удалённых подписок.
    pub fn clear_all_subscriptions(
        &self,
        prefix: Option<&str>,
    ) -> usize {
        let mut state = self.state.lock();

        let mut audience: Vec<Subscription> = Vec::new();
        for sub in state.registry.resolve(lifecycle::UNSUBALL) {
            if !audience.iter().any(|l| l.callback.ptr_eq(&sub.callback)) {
                audience.push(sub);
            }
        }

        let events = state.registry.clear(prefix);
        let removed = events.len();
        if self.config.lifecycle_events && !audience.is_empty() && removed > 0 {
            let topic: Arc<str> = Arc::from(lifecycle::UNSUBALL);
            let mut consumed: Vec<Token> = Vec::new();
            for event in &events {
                for listener in &audience {
                    if listener.once && consumed.contains(&listener.token) {
                        continue;
                    }
                    state.dispatcher.enqueue(Delivery {
                        callback: listener.callback.clone(),
                        topic: Arc::clone(&topic),
                        payload: event.payload(),
                        token: listener.token,
                        once: false,
                    });
                    if listener.once {
                        consumed.push(listener.token);
                    }
                }
            }
            for token in consumed {
                let events = state.registry.remove(&Selector::Token(token));
                self.announce(&mut state, events);
            }
            self.wakeup.notify_one();
        }
        drop(state);

        debug!(?prefix, removed, "subscriptions cleared");
        removed
    }

    /// Один проход разбора очереди.
    ///
    /// Обрабатывает ровно те доставки, что были в очереди на момент
    /// начала прохода; поставленные обработчиками во время прохода ждут
    /// следующего. Повторный вызов во время прохода (из обработчика или
    /// другого потока) ничего не делает и возвращает 0.
    pub fn drain(&self) -> usize {
        let Some(pass) = self.gate.try_enter() else {
            warn!("drain already in progress, skipping");
            return 0;
        };

        let budget = self.state.lock().dispatcher.len();
        let mut processed = 0;
        while processed < budget {
            let next = self.state.lock().dispatcher.pop();
            let Some(task) = next else {
                break;
            };
            self.deliver(task);
            processed += 1;
        }

        if processed > 0 {
            trace!(processed, "drain pass finished");
        }
        // Задачи, поставленные во время прохода, могли разбудить драйвер,
        // пока ворота были заняты: открываем ворота и будим его снова.
        drop(pass);
        if self.state.lock().dispatcher.len() > 0 {
            self.wakeup.notify_one();
        }
        processed
    }

    /// Идёт ли сейчас проход разбора очереди.
    pub fn is_draining(&self) -> bool {
        self.gate.is_busy()
    }

    /// Доставок в очереди.
    pub fn pending(&self) -> usize {
        self.state.lock().dispatcher.len()
    }

    /// Есть ли подписчики в цепочке предков топика. Ничего не публикует.
    pub fn has_subscribers(
        &self,
        topic: &str,
    ) -> bool {
        topic::validate(topic).is_ok() && self.state.lock().registry.has_subscribers(topic)
    }

    /// Подписок на точный топик.
    pub fn count_subscriptions(
        &self,
        topic: &str,
    ) -> usize {
        self.state.lock().registry.count(topic)
    }

    /// Токены подписок на точный топик в порядке регистрации.
    pub fn subscriptions(
        &self,
        topic: &str,
    ) -> Vec<Token> {
        self.state.lock().registry.tokens(topic)
    }

    pub fn is_subscribed(
        &self,
        token: Token,
    ) -> bool {
        self.state.lock().registry.contains(token)
    }

    /// Топики с живыми подписками.
    pub fn topics(&self) -> Vec<Arc<str>> {
        self.state.lock().registry.topics()
    }

    pub fn stats(&self) -> BrokerStats {
        let (pending, subscriptions) = {
            let state = self.state.lock();
            (state.dispatcher.len(), state.registry.len())
        };
        BrokerStats {
            published: self.counters.published.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            pending,
            subscriptions,
        }
    }

    /// Будущее, которое завершится после следующей постановки в очередь.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.wakeup.notified()
    }

    fn insert(
        &self,
        topic: &str,
        callback: Callback,
        once: bool,
    ) -> PubSubResult<Token> {
        topic::validate(topic)?;

        let mut state = self.state.lock();
        let (token, events) = state.registry.insert(topic, callback, once);
        self.announce(&mut state, events);
        drop(state);

        debug!(%token, topic, once, "subscribe");
        Ok(token)
    }

    /// Публикует служебные события изменения реестра.
    fn announce(
        &self,
        state: &mut State,
        events: Vec<LifecycleEvent>,
    ) {
        if !self.config.lifecycle_events {
            return;
        }
        for event in events {
            if event.is_suppressed() {
                continue;
            }
            let meta = event.meta_topic();
            self.enqueue_matching(state, &meta, event.payload());
        }
    }

    /// Ставит в очередь доставку каждому подписчику цепочки предков.
    /// Возвращает число поставленных доставок.
    fn enqueue_matching(
        &self,
        state: &mut State,
        topic: &str,
        payload: Payload,
    ) -> usize {
        let matched = state.registry.resolve(topic);
        if matched.is_empty() {
            return 0;
        }

        let count = matched.len();
        let topic: Arc<str> = Arc::from(topic);
        for sub in matched {
            state.dispatcher.enqueue(Delivery {
                callback: sub.callback,
                topic: Arc::clone(&topic),
                payload: payload.clone(),
                token: sub.token,
                once: sub.once,
            });
        }
        self.wakeup.notify_one();
        count
    }

    fn deliver(
        &self,
        task: Delivery,
    ) {
        if task.once && !self.unsubscribe(task.token) {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        trace!(topic = %task.topic, token = %task.token, "deliver");
        if !self.config.catch_panics {
            task.callback.call(&task.topic, &task.payload);
            self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let callback = &task.callback;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            callback.call(&task.topic, &task.payload)
        }));
        match outcome {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(panic) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                let err = DeliveryError::from_panic(Arc::clone(&task.topic), task.token, panic);
                self.report(&err);
            }
        }
    }

    fn report(
        &self,
        err: &DeliveryError,
    ) {
        error!(
            topic = %err.topic,
            token = %err.token,
            reason = %err.reason,
            "subscriber panicked during delivery"
        );
        if let Some(handler) = &self.error_handler {
            handler(err);
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// Построитель брокера с необязательными настройками.
#[derive(Default)]
pub struct BrokerBuilder {
    config: BrokerConfig,
    error_handler: Option<ErrorHandler>,
}

impl BrokerBuilder {
    pub fn config(
        mut self,
        config: BrokerConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Обработчик сбоев подписчиков, вызываемый вне пути `publish`.
    pub fn on_delivery_error<F>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: Fn(&DeliveryError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Broker {
        let mut broker = Broker::with_config(self.config);
        broker.error_handler = self.error_handler;
        broker
    }
}
