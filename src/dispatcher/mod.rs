//! Dispatcher - request in, envelope out.
//!
//! ## Quick Start
//!
//! ```ignore
//! use typed_dispatch::{BodyResponse, Dispatcher, Handler, HandlerError};
//!
//! struct Ping;
//! struct PingHandler;
//!
//! impl Handler<Ping> for PingHandler {
//!     type Response = BodyResponse<String>;
//!
//!     fn handle(&self, _: &Ping, response: &mut Self::Response) -> Result<(), HandlerError> {
//!         response.body = "pong".into();
//!         Ok(())
//!     }
//! }
//!
//! let dispatcher = Dispatcher::builder().handler(PingHandler).build()?;
//! let envelope = dispatcher.execute(&Ping)?;
//! assert_eq!(envelope.status_code, 200);
//! assert_eq!(dispatcher.execute_body::<Ping, String>(&Ping)?, "pong");
//! ```

mod builder;
mod config;
mod dispatcher;
mod envelope;

pub use builder::DispatcherBuilder;
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use envelope::{Envelope, ErrorEnvelope, JsonResponse};
