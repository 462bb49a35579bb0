use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{topic, Callback, LifecycleEvent, Selector, Subscription, Token};

/// Реестр подписок: точный топик → подписки в порядке регистрации.
///
/// Топик присутствует в индексе только пока у него есть хотя бы одна
/// живая подписка; пустые списки удаляются сразу, поэтому переходы
/// 0 ↔ 1 наблюдаемы и сообщаются как события жизненного цикла.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    topics: FxHashMap<Arc<str>, Vec<Subscription>>,
    tokens: FxHashMap<Token, Arc<str>>,
    next_seq: u64,
}

impl Registry {
    /// Добавляет подписку в хвост списка точного топика.
    ///
    /// Топик должен быть уже провалидирован.
    pub fn insert(
        &mut self,
        topic: &str,
        callback: Callback,
        once: bool,
    ) -> (Token, Vec<LifecycleEvent>) {
        let token = Token::next();
        let seq = self.next_seq;
        self.next_seq += 1;

        let key = match self.topics.get_key_value(topic) {
            Some((key, _)) => Arc::clone(key),
            None => Arc::from(topic),
        };

        let mut events = Vec::with_capacity(2);
        let list = self.topics.entry(Arc::clone(&key)).or_default();
        if list.is_empty() {
            events.push(LifecycleEvent::FirstSubscriber {
                topic: Arc::clone(&key),
            });
        }
        list.push(Subscription {
            token,
            topic: Arc::clone(&key),
            callback: callback.clone(),
            seq,
            once,
        });
        self.tokens.insert(token, Arc::clone(&key));

        events.push(LifecycleEvent::Subscribed {
            topic: key,
            token,
            callback,
        });
        (token, events)
    }

    /// Снимает подписки, выбранные селектором.
    ///
    /// Возвращает `Unsubscribed` на каждую удалённую подписку в порядке
    /// регистрации, затем `LastUnsubscribed` на каждый опустевший топик
    /// в порядке, в котором они опустели.
    pub fn remove(
        &mut self,
        selector: &Selector,
    ) -> Vec<LifecycleEvent> {
        let (mut removed, emptied) = match selector {
            Selector::Token(token) => self.take_token(*token),
            Selector::Callback(callback) => self.take_where(|_, sub| sub.callback.ptr_eq(callback)),
            Selector::Topic(name) => {
                self.take_where(|key, _| topic::is_self_or_descendant(key, name))
            }
        };
        if removed.is_empty() {
            return Vec::new();
        }
        removed.sort_by_key(|sub| sub.seq);

        let explicit = selector.is_explicit();
        let last_index: FxHashMap<&str, usize> = removed
            .iter()
            .enumerate()
            .map(|(idx, sub)| (&*sub.topic, idx))
            .collect();

        let mut events = Vec::with_capacity(removed.len() + emptied.len());
        let mut drained = Vec::with_capacity(emptied.len());
        for (idx, sub) in removed.iter().enumerate() {
            events.push(LifecycleEvent::Unsubscribed {
                topic: Arc::clone(&sub.topic),
                token: sub.token,
                callback: sub.callback.clone(),
                explicit,
            });
            if last_index.get(&*sub.topic) == Some(&idx) && emptied.contains(&sub.topic) {
                drained.push(Arc::clone(&sub.topic));
            }
        }
        events.extend(
            drained
                .into_iter()
                .map(|topic| LifecycleEvent::LastUnsubscribed { topic }),
        );
        events
    }

    /// Удаляет все подписки или только подписки на `prefix` и его потомков.
    ///
    /// Возвращает `Cleared` на каждую удалённую подписку в порядке
    /// регистрации.
    pub fn clear(
        &mut self,
        prefix: Option<&str>,
    ) -> Vec<LifecycleEvent> {
        let (mut removed, _) = match prefix {
            Some(prefix) => self.take_where(|key, _| topic::is_self_or_descendant(key, prefix)),
            None => self.take_where(|_, _| true),
        };
        removed.sort_by_key(|sub| sub.seq);
        removed
            .into_iter()
            .map(|sub| LifecycleEvent::Cleared {
                topic: sub.topic,
                token: sub.token,
            })
            .collect()
    }

    /// Подписки по всей цепочке предков топика: от корня к листу,
    /// внутри уровня в порядке регистрации.
    pub fn resolve(
        &self,
        topic: &str,
    ) -> Vec<Subscription> {
        topic::chain(topic)
            .filter_map(|level| self.topics.get(level))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn has_subscribers(
        &self,
        topic: &str,
    ) -> bool {
        topic::chain(topic).any(|level| self.topics.contains_key(level))
    }

    /// Количество подписок на точный топик.
    pub fn count(
        &self,
        topic: &str,
    ) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn contains(
        &self,
        token: Token,
    ) -> bool {
        self.tokens.contains_key(&token)
    }

    /// Токены подписок на точный топик в порядке регистрации.
    pub fn tokens(
        &self,
        topic: &str,
    ) -> Vec<Token> {
        self.topics
            .get(topic)
            .map(|subs| subs.iter().map(|sub| sub.token).collect())
            .unwrap_or_default()
    }

    /// Топики с живыми подписками, отсортированные по имени.
    pub fn topics(&self) -> Vec<Arc<str>> {
        let mut topics: Vec<_> = self.topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    fn take_token(
        &mut self,
        token: Token,
    ) -> (Vec<Subscription>, FxHashSet<Arc<str>>) {
        let mut emptied = FxHashSet::default();
        let Some(topic) = self.tokens.remove(&token) else {
            return (Vec::new(), emptied);
        };
        let Some(subs) = self.topics.get_mut(&topic) else {
            return (Vec::new(), emptied);
        };
        let Some(idx) = subs.iter().position(|sub| sub.token == token) else {
            return (Vec::new(), emptied);
        };
        let sub = subs.remove(idx);
        if subs.is_empty() {
            self.topics.remove(&topic);
            emptied.insert(topic);
        }
        (vec![sub], emptied)
    }

    fn take_where<F>(
        &mut self,
        mut pred: F,
    ) -> (Vec<Subscription>, FxHashSet<Arc<str>>)
    where
        F: FnMut(&str, &Subscription) -> bool,
    {
        let mut removed = Vec::new();
        let mut emptied = FxHashSet::default();

        self.topics.retain(|key, subs| {
            let (gone, kept): (Vec<_>, Vec<_>) =
                std::mem::take(subs).into_iter().partition(|sub| pred(&**key, sub));
            *subs = kept;
            if !gone.is_empty() && subs.is_empty() {
                emptied.insert(Arc::clone(key));
            }
            removed.extend(gone);
            !subs.is_empty()
        });

        for sub in &removed {
            self.tokens.remove(&sub.token);
        }
        (removed, emptied)
    }
}
