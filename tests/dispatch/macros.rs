//! Attribute macros and `register_handlers!`.

use typed_dispatch::{
    filter, handler, interceptor, register_handlers, BodyResponse, Dispatcher, FilterChain, Flow,
    HandlerError, Next,
};

use crate::support::{entries, new_log, CreateOrder, CreateOrderHandler, Log, PingHandler};

pub struct Greet {
    pub name: String,
}

pub type Greeting = BodyResponse<String>;

struct GreetHandler {
    salutation: &'static str,
}

#[handler]
impl GreetHandler {
    fn handle(&self, request: &Greet, response: &mut Greeting) -> Result<(), HandlerError> {
        if request.name.is_empty() {
            return Err(HandlerError::Rejected("name is required".into()));
        }
        response.body = format!("{}, {}", self.salutation, request.name);
        Ok(())
    }
}

struct Shout {
    log: Log,
}

#[interceptor(order = 5)]
impl Shout {
    fn before(&self, request: &Greet, _response: &mut Greeting) -> Result<Flow, HandlerError> {
        self.log.lock().unwrap().push(format!("shout:before:{}", request.name));
        Ok(Flow::Continue)
    }

    fn after_return(
        &self,
        _request: &Greet,
        response: &mut Greeting,
    ) -> Result<Flow, HandlerError> {
        response.body = response.body.to_uppercase();
        Ok(Flow::Continue)
    }
}

struct Timing {
    log: Log,
}

#[interceptor]
impl Timing {
    fn order(&self) -> i32 {
        1
    }

    fn around(
        &self,
        request: &Greet,
        response: &mut Greeting,
        next: Next<'_, Greet, Greeting>,
    ) -> Result<Flow, HandlerError> {
        self.log.lock().unwrap().push("timing:start".into());
        let flow = next.proceed(request, response);
        self.log.lock().unwrap().push("timing:end".into());
        flow
    }

    fn after_throwing(
        &self,
        _request: &Greet,
        response: &mut Greeting,
        _error: &HandlerError,
    ) -> Result<Flow, HandlerError> {
        response.body = "hello, stranger".into();
        Ok(Flow::Stop)
    }
}

struct Punctuate {
    log: Log,
}

#[filter(order = 1)]
impl Punctuate {
    fn init(&self) {
        self.log.lock().unwrap().push("punctuate:init".into());
    }

    fn do_filter(
        &self,
        request: &Greet,
        response: &mut Greeting,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError> {
        chain.do_filter(request, response)?;
        response.body.push('!');
        Ok(())
    }

    fn destroy(&self) {
        self.log.lock().unwrap().push("punctuate:destroy".into());
    }
}

fn greet(name: &str) -> Greet {
    Greet { name: name.into() }
}

// ============================================================================
// Test 1: #[handler]
// ============================================================================

#[test]
fn handler_attribute_implements_handler() {
    let dispatcher = Dispatcher::builder()
        .handler(GreetHandler { salutation: "hello" })
        .build()
        .unwrap();

    let body: String = dispatcher.execute_body(&greet("ada")).unwrap();
    assert_eq!(body, "hello, ada");

    // The inherent method stays callable.
    let mut response = Greeting::default();
    GreetHandler { salutation: "hi" }
        .handle(&greet("bob"), &mut response)
        .unwrap();
    assert_eq!(response.body, "hi, bob");
}

// ============================================================================
// Test 2: #[interceptor] and #[filter]
// ============================================================================

#[test]
fn generated_components_run_in_the_pipeline() {
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(GreetHandler { salutation: "hello" })
        .interceptor(Shout { log: log.clone() })
        .interceptor(Timing { log: log.clone() })
        .filter(Punctuate { log: log.clone() })
        .build()
        .unwrap();

    let body: String = dispatcher.execute_body(&greet("ada")).unwrap();

    assert_eq!(body, "HELLO, ADA!");
    assert_eq!(
        entries(&log),
        vec![
            "shout:before:ada",
            "timing:start",
            "punctuate:init",
            "punctuate:destroy",
            "timing:end",
        ]
    );
}

#[test]
fn generated_after_throwing_can_recover() {
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(GreetHandler { salutation: "hello" })
        .interceptor(Timing { log: log.clone() })
        .build()
        .unwrap();

    let body: String = dispatcher.execute_body(&greet("")).unwrap();

    assert_eq!(body, "hello, stranger");
}

#[test]
fn attribute_order_is_used() {
    let dispatcher = Dispatcher::builder()
        .handler(GreetHandler { salutation: "hello" })
        .interceptor(Shout { log: new_log() })
        .interceptor(Timing { log: new_log() })
        .build()
        .unwrap();

    let orders: Vec<i32> = dispatcher
        .interceptors()
        .chain_for(
            typed_dispatch::TypeKey::of::<Greet>(),
            typed_dispatch::TypeKey::of::<GreetHandler>(),
        )
        .iter()
        .map(|registered| registered.order())
        .collect();
    assert_eq!(orders, vec![1, 5]);
}

// ============================================================================
// Test 3: register_handlers!
// ============================================================================

#[test]
fn register_handlers_binds_every_handler() {
    let dispatcher = register_handlers!(
        Dispatcher::builder(),
        PingHandler,
        CreateOrderHandler::default(),
        GreetHandler { salutation: "hey" },
    )
    .build()
    .unwrap();

    assert_eq!(dispatcher.handlers().len(), 3);
    assert!(dispatcher.handlers().contains::<CreateOrder>());
    let body: String = dispatcher.execute_body(&greet("you")).unwrap();
    assert_eq!(body, "hey, you");
}
