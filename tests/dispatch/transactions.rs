//! Transactional wrapping of dispatches.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use typed_dispatch::{
    Dispatcher, DispatcherConfig, ErrorKind, Filter, FilterChain, HandlerError,
    InMemoryTransactionManager, TransactionError, TransactionEvent,
};

use crate::support::{
    new_log, CreateOrder, CreateOrderHandler, OrderCreated, Ping, PingHandler, Pong, Recorder,
};

fn order(quantity: u32) -> CreateOrder {
    CreateOrder {
        tenant: "acme".into(),
        sku: "widget".into(),
        quantity,
    }
}

fn transactional(manager: &Arc<InMemoryTransactionManager>) -> Dispatcher {
    Dispatcher::builder()
        .handler(PingHandler)
        .handler(CreateOrderHandler::default())
        .transaction_manager(manager.clone())
        .build()
        .unwrap()
}

#[test]
fn successful_dispatch_commits() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let dispatcher = transactional(&manager);

    dispatcher.execute(&Ping).unwrap();

    assert_eq!(
        manager.events(),
        vec![TransactionEvent::Begin(1), TransactionEvent::Commit(1)]
    );
    assert_eq!(manager.active(), 0);
}

#[test]
fn failed_dispatch_rolls_back_and_keeps_the_error() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let dispatcher = transactional(&manager);

    let err = dispatcher.execute(&order(0)).unwrap_err();

    assert!(matches!(err, HandlerError::Rejected(_)));
    assert_eq!(
        manager.events(),
        vec![TransactionEvent::Begin(1), TransactionEvent::Rollback(1)]
    );
}

#[test]
fn each_dispatch_gets_its_own_transaction() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let dispatcher = transactional(&manager);

    dispatcher.execute(&order(1)).unwrap();
    dispatcher.execute(&order(0)).unwrap_err();
    dispatcher.execute(&order(2)).unwrap();

    assert_eq!(manager.committed(), 2);
    assert_eq!(manager.rolled_back(), 1);
    assert_eq!(manager.active(), 0);
}

#[test]
fn failed_commit_surfaces_as_transaction_error() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    manager.fail_commits(true);
    let dispatcher = transactional(&manager);

    let err = dispatcher.execute(&Ping).unwrap_err();

    assert!(matches!(
        err,
        HandlerError::Transaction(TransactionError::CommitFailed { id: 1, .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert_eq!(err.status_code(), 500);
    assert_eq!(manager.committed(), 0);
    assert_eq!(manager.active(), 0);
}

#[test]
fn suppressed_errors_commit() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(CreateOrderHandler::default())
        .interceptor::<CreateOrder, OrderCreated, _>(
            Recorder::new("swallow", 0, &log).suppressing(),
        )
        .transaction_manager(manager.clone())
        .build()
        .unwrap();

    dispatcher.execute(&order(0)).unwrap();

    assert_eq!(manager.committed(), 1);
    assert_eq!(manager.rolled_back(), 0);
}

#[test]
fn transactions_can_be_switched_off() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let config = DispatcherConfig::from_json_str(r#"{ "transactional": false }"#).unwrap();
    let dispatcher = Dispatcher::builder()
        .handler(PingHandler)
        .transaction_manager(manager.clone())
        .config(config)
        .build()
        .unwrap();

    let body: String = dispatcher.execute_body(&Ping).unwrap();

    assert_eq!(body, "pong");
    assert!(manager.events().is_empty());
}

#[test]
fn before_stop_still_commits() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(PingHandler)
        .interceptor::<Ping, Pong, _>(Recorder::new("gate", 0, &log).stopping_before())
        .transaction_manager(manager.clone())
        .build()
        .unwrap();

    dispatcher.execute(&Ping).unwrap();

    assert_eq!(manager.committed(), 1);
}

struct Exploding {
    destroyed: Arc<AtomicUsize>,
}

impl Filter<Ping, Pong> for Exploding {
    fn do_filter(
        &self,
        _request: &Ping,
        _response: &mut Pong,
        _chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError> {
        panic!("filter blew up");
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn panic_in_the_pipeline_rolls_back() {
    let manager = Arc::new(InMemoryTransactionManager::new());
    let destroyed = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder()
        .handler(PingHandler)
        .filter(Exploding {
            destroyed: destroyed.clone(),
        })
        .transaction_manager(manager.clone())
        .build()
        .unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| dispatcher.execute(&Ping)));

    assert!(outcome.is_err());
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(
        manager.events(),
        vec![TransactionEvent::Begin(1), TransactionEvent::Rollback(1)]
    );
    assert_eq!(manager.active(), 0);
}
