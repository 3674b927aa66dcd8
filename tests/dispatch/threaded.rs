//! One dispatcher shared across threads.

use std::sync::Arc;
use std::thread;

use typed_dispatch::{Dispatcher, InMemoryTransactionManager};

use crate::support::{
    entries, new_log, CreateOrder, CreateOrderHandler, OrderCreated, Ping, PingHandler, Pong,
    Recorder,
};

#[test]
fn concurrent_dispatches_get_independent_responses() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(PingHandler)
        .handler(CreateOrderHandler::default())
        .interceptor::<Ping, Pong, _>(Recorder::new("audit", 0, &log))
        .transaction_manager(manager.clone())
        .build()
        .unwrap();

    let created: Vec<OrderCreated> = thread::scope(|scope| {
        let workers: Vec<_> = (1..=8u32)
            .map(|quantity| {
                let dispatcher = &dispatcher;
                scope.spawn(move || {
                    let body: String = dispatcher.execute_body(&Ping).unwrap();
                    assert_eq!(body, "pong");

                    let request = CreateOrder {
                        tenant: "acme".into(),
                        sku: format!("sku-{quantity}"),
                        quantity,
                    };
                    dispatcher
                        .execute_as::<_, OrderCreated>(&request)
                        .unwrap()
                        .into_data()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    // Each response reflects its own request.
    for order in &created {
        assert_eq!(order.sku, format!("sku-{}", order.quantity));
    }
    // Ids were handed out once each.
    let mut ids: Vec<u64> = created.iter().map(|o| o.order_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());

    assert_eq!(manager.committed(), 16);
    assert_eq!(manager.active(), 0);
    assert_eq!(
        entries(&log).iter().filter(|e| *e == "audit:before").count(),
        8
    );
}

#[test]
fn dispatcher_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Dispatcher>();
}
