//! Pipeline Integration Tests
//!
//! Full in-process stack: store → queue → executor → simulated venues →
//! notification hub, with instant venue latency.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use order_engine::application::services::RouterTimeouts;
use order_engine::infrastructure::persistence::InMemoryOrderStore;
use order_engine::infrastructure::sink::{ChannelSink, SinkMessage};
use order_engine::infrastructure::venues::{SimulatedVenueAdapter, SimulatedVenueConfig};
use order_engine::queue::QueueEvent;
use order_engine::{
    JobQueue, NewOrder, NotificationHub, Order, OrderId, OrderStatus, OrderStore, OrderExecutor,
    QueueConfig, RecoverOrdersUseCase, SubmitOrderUseCase, Venue, VenueRouter,
};

struct Pipeline {
    store: Arc<InMemoryOrderStore>,
    hub: Arc<NotificationHub>,
    queue: JobQueue,
    venues: Arc<SimulatedVenueAdapter>,
}

impl Pipeline {
    fn start() -> Self {
        Self::with_venues(SimulatedVenueConfig::instant())
    }

    fn with_venues(config: SimulatedVenueConfig) -> Self {
        let store = Arc::new(InMemoryOrderStore::new());
        let hub = Arc::new(NotificationHub::new());
        let venues = Arc::new(SimulatedVenueAdapter::new(config));
        let router = VenueRouter::new(
            Arc::clone(&venues),
            Venue::ALL.to_vec(),
            RouterTimeouts::default(),
        );
        let executor = Arc::new(OrderExecutor::new(
            Arc::clone(&store),
            router,
            Arc::clone(&hub),
        ));
        let queue = JobQueue::start(QueueConfig::default(), executor);

        Self {
            store,
            hub,
            queue,
            venues,
        }
    }

    fn submit_use_case(&self) -> SubmitOrderUseCase<InMemoryOrderStore> {
        SubmitOrderUseCase::new(
            Arc::clone(&self.store),
            self.queue.clone(),
            Arc::clone(&self.hub),
        )
    }

    /// Persist an order without queuing it.
    async fn stored_order(&self, limit_price: Decimal) -> Order {
        let order = Order::new(sol_usdc(limit_price)).unwrap();
        self.store.save(&order).await.unwrap();
        order
    }

    async fn wait_for_job(
        events: &mut tokio::sync::broadcast::Receiver<QueueEvent>,
        order_id: OrderId,
    ) -> QueueEvent {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = events.recv().await.unwrap();
                let matches = match &event {
                    QueueEvent::Completed { order_id: id, .. }
                    | QueueEvent::Failed { order_id: id, .. } => *id == order_id,
                    _ => false,
                };
                if matches {
                    return event;
                }
            }
        })
        .await
        .expect("job did not finish in time")
    }
}

fn sol_usdc(limit_price: Decimal) -> NewOrder {
    NewOrder {
        token_in: "SOL".to_string(),
        token_out: "USDC".to_string(),
        amount_in: Decimal::ONE,
        limit_price,
    }
}

fn drain(rx: &mut UnboundedReceiver<SinkMessage>) -> (Vec<Value>, bool) {
    let mut events = Vec::new();
    let mut closed = false;
    while let Ok(message) = rx.try_recv() {
        match message {
            SinkMessage::Event(text) => events.push(serde_json::from_str(&text).unwrap()),
            SinkMessage::Close => closed = true,
        }
    }
    (events, closed)
}

fn statuses(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn trivially_satisfied_limit_confirms() {
    let pipeline = Pipeline::start();
    let mut queue_events = pipeline.queue.subscribe();

    let order = pipeline
        .submit_use_case()
        .execute(sol_usdc(dec!(0.01)))
        .await
        .unwrap();

    let finished = Pipeline::wait_for_job(&mut queue_events, order.id()).await;
    assert!(matches!(finished, QueueEvent::Completed { .. }));

    let stored = pipeline.store.find_by_id(&order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Confirmed);
    assert!(stored.executed_price().unwrap() >= dec!(0.01));
    assert!(!stored.transaction_hash().unwrap().is_empty());
    assert!(Venue::ALL.contains(&stored.chosen_venue().unwrap()));
    assert_eq!(pipeline.venues.swap_calls(), 1);
}

#[tokio::test]
async fn unreachable_limit_fails_with_both_prices_and_no_swap() {
    let pipeline = Pipeline::start();
    let mut queue_events = pipeline.queue.subscribe();

    let order = pipeline
        .submit_use_case()
        .execute(sol_usdc(dec!(1000000)))
        .await
        .unwrap();

    let finished = Pipeline::wait_for_job(&mut queue_events, order.id()).await;
    match finished {
        QueueEvent::Failed { attempts, .. } => assert_eq!(attempts, 1),
        other => panic!("expected failure, got {other:?}"),
    }

    let stored = pipeline.store.find_by_id(&order.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Failed);
    let reason = stored.failure_reason().unwrap();
    assert!(reason.contains("1000000"), "{reason}");
    assert!(reason.contains("best price"), "{reason}");
    assert_eq!(pipeline.venues.swap_calls(), 0);
}

#[tokio::test]
async fn early_subscriber_sees_every_transition_in_order() {
    let pipeline = Pipeline::start();
    let order = pipeline.stored_order(dec!(0.01)).await;
    let (sink, mut rx) = ChannelSink::channel();
    pipeline.hub.subscribe(order.id(), sink).unwrap();

    let mut queue_events = pipeline.queue.subscribe();
    pipeline.queue.enqueue_default(order.id()).unwrap();
    Pipeline::wait_for_job(&mut queue_events, order.id()).await;

    let (events, _) = drain(&mut rx);
    assert_eq!(
        statuses(&events),
        vec!["routing", "building", "submitted", "confirmed"]
    );
    for event in &events {
        assert_eq!(event["orderId"], order.id().to_string());
    }

    let confirmed = events.last().unwrap();
    let dex = confirmed["dex"].as_str().unwrap();
    assert!(dex == "Raydium" || dex == "Meteora");
    assert_eq!(events[1]["dex"], confirmed["dex"]);
    let executed: Decimal = confirmed["executedPrice"].as_str().unwrap().parse().unwrap();
    assert!(executed >= dec!(0.01));
    assert!(confirmed["txHash"].as_str().unwrap().starts_with("0x"));
}

#[tokio::test]
async fn late_subscriber_misses_past_events() {
    let pipeline = Pipeline::start();
    let mut queue_events = pipeline.queue.subscribe();
    let order = pipeline
        .submit_use_case()
        .execute(sol_usdc(dec!(0.01)))
        .await
        .unwrap();
    Pipeline::wait_for_job(&mut queue_events, order.id()).await;

    let (sink, mut rx) = ChannelSink::channel();
    pipeline.hub.subscribe(order.id(), sink).unwrap();

    let (events, closed) = drain(&mut rx);
    assert!(events.is_empty());
    assert!(!closed);
}

#[tokio::test]
async fn mid_pipeline_subscriber_sees_only_later_events() {
    let swap = Duration::from_millis(400);
    let pipeline = Pipeline::with_venues(SimulatedVenueConfig {
        quote_latency: (Duration::ZERO, Duration::ZERO),
        swap_latency: (swap, swap),
    });
    let mut queue_events = pipeline.queue.subscribe();
    let order = pipeline
        .submit_use_case()
        .execute(sol_usdc(dec!(0.01)))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stored = pipeline.store.find_by_id(&order.id()).await.unwrap().unwrap();
            if stored.status() == OrderStatus::Submitted {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("order never reached submitted");

    let (sink, mut rx) = ChannelSink::channel();
    pipeline.hub.subscribe(order.id(), sink).unwrap();
    Pipeline::wait_for_job(&mut queue_events, order.id()).await;

    let (events, _) = drain(&mut rx);
    assert_eq!(statuses(&events), vec!["confirmed"]);
}

#[tokio::test]
async fn recovery_finishes_interrupted_orders() {
    let pipeline = Pipeline::start();
    let mut queue_events = pipeline.queue.subscribe();

    let mut routing = Order::new(sol_usdc(dec!(0.01))).unwrap();
    routing.start_routing().unwrap();
    pipeline.store.save(&routing).await.unwrap();
    let pending = pipeline.stored_order(dec!(0.01)).await;

    let report = RecoverOrdersUseCase::new(Arc::clone(&pipeline.store), pipeline.queue.clone())
        .execute()
        .await
        .unwrap();
    assert_eq!(report.found, 2);
    assert_eq!(report.enqueued, 2);

    let mut outstanding = HashSet::from([routing.id(), pending.id()]);
    tokio::time::timeout(Duration::from_secs(10), async {
        while !outstanding.is_empty() {
            if let QueueEvent::Completed { order_id, .. } = queue_events.recv().await.unwrap() {
                outstanding.remove(&order_id);
            }
        }
    })
    .await
    .expect("recovered jobs did not finish in time");

    for id in [routing.id(), pending.id()] {
        let stored = pipeline.store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Confirmed);
    }
}

#[tokio::test]
async fn shutdown_closes_subscribers_and_rejects_new_orders() {
    let pipeline = Pipeline::start();
    let order = pipeline.stored_order(dec!(0.01)).await;
    let (sink, mut rx) = ChannelSink::channel();
    pipeline.hub.subscribe(order.id(), sink).unwrap();

    let report = pipeline.queue.shutdown(Duration::from_secs(1)).await;
    assert!(report.drained);
    pipeline.hub.close_all();

    let (_, closed) = drain(&mut rx);
    assert!(closed);
    assert!(pipeline.submit_use_case().execute(sol_usdc(dec!(1))).await.is_err());
}
