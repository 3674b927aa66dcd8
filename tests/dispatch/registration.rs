//! Build-time validation of handler, interceptor and filter bindings.

use typed_dispatch::{
    handler_fn, Dispatcher, DispatcherConfig, Filter, FilterChain, FilterRegistry, Flow, Handler,
    HandlerError, HandlerRegistration, HandlerRegistry, Interceptor, InterceptorRegistration,
    InterceptorRegistry, RegistryError,
};

use crate::support::{
    new_log, CreateOrder, CreateOrderHandler, OrderCreated, Ping, PingHandler, Pong, Recorder,
    Unrouted,
};

/// Serves two request types, which a handler may not do.
struct Both;

impl Handler<Ping> for Both {
    type Response = Pong;

    fn handle(&self, _request: &Ping, _response: &mut Pong) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl Handler<CreateOrder> for Both {
    type Response = OrderCreated;

    fn handle(
        &self,
        _request: &CreateOrder,
        _response: &mut OrderCreated,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}

struct WrongResponse;

impl Interceptor<Ping, OrderCreated> for WrongResponse {
    fn before(&self, _request: &Ping, _response: &mut OrderCreated) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }
}

struct PassThrough;

impl Filter<Ping, OrderCreated> for PassThrough {
    fn do_filter(
        &self,
        request: &Ping,
        response: &mut OrderCreated,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), HandlerError> {
        chain.do_filter(request, response)
    }
}

// ============================================================================
// Test 1: Duplicate bindings are fatal
// ============================================================================

#[test]
fn second_handler_for_a_request_is_rejected() {
    let err = Dispatcher::builder()
        .handler(PingHandler)
        .handler(handler_fn(|_: &Ping, _: &mut Pong| Ok(())))
        .build()
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateRequestBinding { .. }));
}

#[test]
fn duplicate_leaves_the_first_binding_in_place() {
    let mut registry = HandlerRegistry::new();
    registry.register(PingHandler).unwrap();

    let err = registry
        .register(handler_fn(|_: &Ping, response: &mut Pong| {
            response.body = "impostor".into();
            Ok(())
        }))
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateRequestBinding { .. }));
    assert_eq!(registry.len(), 1);
    assert!(registry.resolve::<Ping>().unwrap().name().ends_with("PingHandler"));
}

#[test]
fn one_handler_type_cannot_serve_two_requests() {
    let err = Dispatcher::builder()
        .handler::<Ping, _>(Both)
        .handler::<CreateOrder, _>(Both)
        .build()
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateResponseBinding { .. }));
}

// ============================================================================
// Test 2: Components must fit the handler they wrap
// ============================================================================

#[test]
fn interceptor_with_the_wrong_response_is_rejected() {
    let err = Dispatcher::builder()
        .handler(PingHandler)
        .interceptor(WrongResponse)
        .build()
        .unwrap_err();

    assert!(matches!(err, RegistryError::ResponseMismatch { .. }));
}

#[test]
fn filter_with_the_wrong_response_is_rejected() {
    let err = Dispatcher::builder()
        .handler(PingHandler)
        .filter(PassThrough)
        .build()
        .unwrap_err();

    match err {
        RegistryError::ResponseMismatch { component, .. } => {
            assert!(component.ends_with("PassThrough"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn handler_interceptor_for_another_request_is_rejected() {
    let log = new_log();
    // PingHandler is registered for Ping, so it never sees CreateOrder.
    let valid = Dispatcher::builder()
        .handler(PingHandler)
        .handler(CreateOrderHandler::default())
        .interceptors([InterceptorRegistration::for_handler::<PingHandler, Ping, _>(
            Recorder::new("ping", 0, &log),
        )])
        .handler_interceptor::<CreateOrderHandler, CreateOrder, _>(Recorder::new("ok", 0, &log))
        .build();
    assert!(valid.is_ok());

    let err = Dispatcher::builder()
        .handler::<Ping, _>(Both)
        .handler(CreateOrderHandler::default())
        .handler_interceptor::<Both, CreateOrder, _>(Recorder::new("stray", 0, &log))
        .build()
        .unwrap_err();
    assert!(matches!(err, RegistryError::RequestMismatch { .. }));
}

// ============================================================================
// Test 3: Unbound components
// ============================================================================

#[test]
fn unbound_components_are_tolerated_by_default() {
    let log = new_log();
    let dispatcher = Dispatcher::builder()
        .handler(PingHandler)
        .interceptor::<Unrouted, Pong, _>(Recorder::new("orphan", 0, &log))
        .build()
        .unwrap();

    dispatcher.execute(&Ping).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn strict_mode_rejects_unbound_components() {
    let log = new_log();
    let err = Dispatcher::builder()
        .handler(PingHandler)
        .interceptor::<Unrouted, Pong, _>(Recorder::new("orphan", 0, &log))
        .strict_bindings(true)
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::UnboundComponent {
            component: std::any::type_name::<Recorder>(),
            target: std::any::type_name::<Unrouted>(),
        }
    );
}

#[test]
fn strict_mode_from_config() {
    let config = DispatcherConfig::from_json_str(r#"{ "strict_bindings": true }"#).unwrap();
    let log = new_log();
    let err = Dispatcher::builder()
        .config(config)
        .handler_interceptor::<PingHandler, Ping, _>(Recorder::new("early", 0, &log))
        .build()
        .unwrap_err();

    assert!(matches!(err, RegistryError::UnboundComponent { .. }));
}

// ============================================================================
// Test 4: Assembling from registries
// ============================================================================

#[test]
fn dispatcher_from_populated_registries() {
    let log = new_log();
    let handlers = HandlerRegistry::from_registrations([
        HandlerRegistration::new::<Ping, _>(PingHandler),
        HandlerRegistration::new::<CreateOrder, _>(CreateOrderHandler::default()),
    ])
    .unwrap();
    let mut interceptors = InterceptorRegistry::new();
    interceptors.bind_request::<Ping, Pong, _>(Recorder::new("r", 0, &log));
    let filters = FilterRegistry::new();

    let dispatcher = Dispatcher::new(handlers, interceptors, filters).unwrap();

    assert_eq!(dispatcher.handlers().len(), 2);
    assert_eq!(dispatcher.interceptors().len(), 1);
    assert!(dispatcher.filters().is_empty());
    assert!(dispatcher.handlers().contains::<CreateOrder>());

    let body: String = dispatcher.execute_body(&Ping).unwrap();
    assert_eq!(body, "pong");
    assert_eq!(log.lock().unwrap().len(), 3);
}
