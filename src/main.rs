use std::sync::Arc;

use topicbus::{init_logging, spawn_driver, Broker, Callback, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.logging).map_err(|e| anyhow::anyhow!(e))?;

    let broker = Arc::new(Broker::with_config(settings.broker));
    let driver = spawn_driver(Arc::clone(&broker));

    broker.subscribe(
        "@firstsub",
        Callback::new(|topic, _| tracing::info!(topic, "first subscriber")),
    )?;
    broker.subscribe(
        "@lastunsub",
        Callback::new(|topic, _| tracing::info!(topic, "last subscriber gone")),
    )?;

    let orders = broker.subscribe(
        "orders",
        Callback::new(|topic, payload| tracing::info!(topic, ?payload, "order event")),
    )?;
    broker.publish("orders.created", "id=1")?;
    broker.publish("orders.shipped", serde_json::json!({ "id": 1, "carrier": "post" }))?;
    broker.unsubscribe(orders);

    let processed = driver.shutdown().await?;
    let stats = broker.stats();
    tracing::info!(processed, ?stats, "shutting down");
    Ok(())
}
