use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::{Callback, Payload, Token};

/// Отложенная доставка одного сообщения одному подписчику.
///
/// Неизменяема после создания, потребляется ровно один раз.
#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub callback: Callback,
    /// Топик публикации (а не топик подписки).
    pub topic: Arc<str>,
    pub payload: Payload,
    pub token: Token,
    pub once: bool,
}

/// FIFO-очередь отложенных доставок.
#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    queue: VecDeque<Delivery>,
}

impl Dispatcher {
    pub fn enqueue(
        &mut self,
        task: Delivery,
    ) {
        self.queue.push_back(task);
    }

    pub fn pop(&mut self) -> Option<Delivery> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Не даёт двум проходам разбора очереди идти одновременно:
/// ни повторно из обработчика, ни из другого потока.
#[derive(Debug, Default)]
pub(crate) struct DrainGate {
    busy: AtomicBool,
}

impl DrainGate {
    /// Занимает ворота. `None`, если проход уже идёт.
    pub fn try_enter(&self) -> Option<DrainPass<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| DrainPass { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Открытый проход; освобождает ворота при drop, в том числе при панике.
pub(crate) struct DrainPass<'a> {
    gate: &'a DrainGate,
}

impl Drop for DrainPass<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
