use std::sync::Arc;

use tokio::{
    sync::oneshot,
    task::{JoinError, JoinHandle},
};
use tracing::{debug, info};

use super::Broker;

////////////////////////////////////////////////////////////////////////////////
// Внешние функции
////////////////////////////////////////////////////////////////////////////////

/// Запускает фоновую задачу, которая разбирает очередь брокера после
/// каждой публикации.
///
/// Брокер сам по себе ничего не вызывает вне [`Broker::drain`]; драйвер
/// делает доставку «асинхронной» в обычном смысле. Обработчики выполняются
/// на рабочем потоке tokio и должны быть короткими.
pub fn spawn_driver(broker: Arc<Broker>) -> DispatchDriver {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let mut processed = 0;
        info!("dispatch driver started");

        loop {
            while let n @ 1.. = broker.drain() {
                processed += n;
                tokio::task::yield_now().await;
            }

            tokio::select! {
                _ = &mut stop_rx => break,
                _ = broker.notified() => {}
            }
        }

        while let n @ 1.. = broker.drain() {
            processed += n;
        }
        debug!(processed, "dispatch driver stopped");
        processed
    });

    DispatchDriver {
        stop: Some(stop_tx),
        handle,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Структуры
////////////////////////////////////////////////////////////////////////////////

/// Дескриптор фоновой задачи доставки.
///
/// Drop без [`DispatchDriver::shutdown`] тоже останавливает задачу, но без
/// ожидания последнего прохода.
#[derive(Debug)]
pub struct DispatchDriver {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<usize>,
}

impl DispatchDriver {
    /// Останавливает драйвер после финального разбора очереди.
    /// Возвращает число доставок, обработанных за всё время работы.
    pub async fn shutdown(mut self) -> Result<usize, JoinError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.handle).await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
