//! Requests, responses and components shared by the dispatch tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use serde::Serialize;
use typed_dispatch::{BodyResponse, Flow, Handler, HandlerError, Interceptor, Next};

/// Install a test subscriber once. Set `RUST_LOG=typed_dispatch=debug` to
/// see the pipeline.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Requests and responses
// ============================================================================

#[derive(Debug)]
pub struct Ping;

pub type Pong = BodyResponse<String>;

#[derive(Debug)]
pub struct CreateOrder {
    pub tenant: String,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct OrderCreated {
    pub order_id: u64,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug)]
pub struct Unrouted;

// ============================================================================
// Handlers
// ============================================================================

pub struct PingHandler;

impl Handler<Ping> for PingHandler {
    type Response = Pong;

    fn handle(&self, _request: &Ping, response: &mut Pong) -> Result<(), HandlerError> {
        response.body = "pong".into();
        Ok(())
    }
}

/// Creates orders with increasing ids; rejects empty quantities.
#[derive(Default)]
pub struct CreateOrderHandler {
    next_id: Mutex<u64>,
}

impl Handler<CreateOrder> for CreateOrderHandler {
    type Response = OrderCreated;

    fn handle(
        &self,
        request: &CreateOrder,
        response: &mut OrderCreated,
    ) -> Result<(), HandlerError> {
        if request.quantity == 0 {
            return Err(HandlerError::Rejected("quantity must be positive".into()));
        }
        let mut next_id = self
            .next_id
            .lock()
            .map_err(|e| HandlerError::other(e.to_string()))?;
        *next_id += 1;
        response.order_id = *next_id;
        response.sku = request.sku.clone();
        response.quantity = request.quantity;
        Ok(())
    }
}

// ============================================================================
// Recording interceptor
// ============================================================================

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Appends `<name>:<phase>` for every phase it runs.
pub struct Recorder {
    pub name: &'static str,
    pub order: i32,
    pub log: Log,
    pub stop_before: bool,
    pub suppress: bool,
}

impl Recorder {
    pub fn new(name: &'static str, order: i32, log: &Log) -> Self {
        Self {
            name,
            order,
            log: log.clone(),
            stop_before: false,
            suppress: false,
        }
    }

    pub fn stopping_before(mut self) -> Self {
        self.stop_before = true;
        self
    }

    pub fn suppressing(mut self) -> Self {
        self.suppress = true;
        self
    }

    fn record(&self, phase: &str) {
        self.log.lock().unwrap().push(format!("{}:{phase}", self.name));
    }
}

impl<Q: typed_dispatch::Request, P: typed_dispatch::Response> Interceptor<Q, P> for Recorder {
    fn order(&self) -> i32 {
        self.order
    }

    fn before(&self, _request: &Q, _response: &mut P) -> Result<Flow, HandlerError> {
        self.record("before");
        Ok(if self.stop_before { Flow::Stop } else { Flow::Continue })
    }

    fn around(
        &self,
        request: &Q,
        response: &mut P,
        next: Next<'_, Q, P>,
    ) -> Result<Flow, HandlerError> {
        self.record("around");
        next.proceed(request, response)
    }

    fn after_return(&self, _request: &Q, _response: &mut P) -> Result<Flow, HandlerError> {
        self.record("after_return");
        Ok(Flow::Continue)
    }

    fn after_throwing(
        &self,
        _request: &Q,
        _response: &mut P,
        _error: &HandlerError,
    ) -> Result<Flow, HandlerError> {
        self.record("after_throwing");
        Ok(if self.suppress { Flow::Stop } else { Flow::Continue })
    }
}
