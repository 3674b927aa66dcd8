//! Error types for registration and dispatch.
//!
//! Two families: [`RegistryError`] is raised while the lookup tables are
//! built and is always fatal to startup, [`HandlerError`] is raised per
//! dispatch and reaches the caller unchanged (after any rollback).

use std::error::Error;

use thiserror::Error;

/// Configuration errors raised while registries are populated.
///
/// None of these are recoverable: a dispatcher that fails to build must not
/// serve requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A second handler was bound to a request type that already has one.
    #[error("request {request} is already bound to {existing}, cannot bind {handler}")]
    DuplicateRequestBinding {
        request: &'static str,
        existing: &'static str,
        handler: &'static str,
    },
    /// A handler was bound to a second response type.
    #[error("handler {handler} is already bound to response {existing}, cannot bind {response}")]
    DuplicateResponseBinding {
        handler: &'static str,
        existing: &'static str,
        response: &'static str,
    },
    /// An interceptor or filter expects a different response type than the
    /// handler registered for its request.
    #[error("{component} expects response {found} for {request}, but the handler produces {expected}")]
    ResponseMismatch {
        component: &'static str,
        request: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// A handler-bound interceptor expects a request type other than the one
    /// its handler is registered for.
    #[error("{component} intercepts {found} on {handler}, which is registered for {expected}")]
    RequestMismatch {
        component: &'static str,
        handler: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// An interceptor or filter is bound to a request or handler that has no
    /// registration (strict mode only).
    #[error("{component} is bound to {target}, which has no registered handler")]
    UnboundComponent {
        component: &'static str,
        target: &'static str,
    },
}

/// Errors raised by transaction managers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("failed to begin transaction: {0}")]
    BeginFailed(String),
    #[error("failed to commit transaction {id}: {reason}")]
    CommitFailed { id: u64, reason: String },
    #[error("failed to roll back transaction {id}: {reason}")]
    RollbackFailed { id: u64, reason: String },
    /// The token does not belong to an active transaction.
    #[error("transaction {0} is not active")]
    NotActive(u64),
    #[error("transaction manager lock poisoned: {0}")]
    Poisoned(String),
}

/// Coarse classification of a [`HandlerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wiring problems surfaced at call time (missing response type, type
    /// mismatches, misused filter chains).
    Configuration,
    /// No handler for the request.
    Routing,
    /// Raised by handler, interceptor or filter code.
    Business,
    /// The transaction boundary failed.
    Transaction,
}

/// Error type for a single dispatch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler registered for this request type.
    #[error("no handler registered for request {request}")]
    HandlerNotFound { request: &'static str },
    /// The handler has no response type binding.
    #[error("no response type bound to handler {handler}")]
    ResponseTypeNotFound { handler: &'static str },
    /// A pipeline component received a value of an unexpected type.
    #[error("{component} expected a value of type {expected}")]
    TypeMismatch {
        component: &'static str,
        expected: &'static str,
    },
    /// The produced response is not of the requested type.
    #[error("response is {actual}, not {expected}")]
    ResponseMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// `do_filter` reached the end of a chain that has no target.
    #[error("filter chain has no target handler")]
    MissingTarget,
    /// `do_filter` reached the end of a chain whose target already ran.
    #[error("filter chain already invoked its target; call reset_position before reuse")]
    ChainExhausted,
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the request (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),
    /// A resource the handler needed does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or invalid authentication / authorization.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The transaction boundary failed.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
    /// Other error.
    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl HandlerError {
    /// Wrap an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        HandlerError::Other(err.into())
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::HandlerNotFound { .. } => 404,
            HandlerError::ResponseTypeNotFound { .. } => 500,
            HandlerError::TypeMismatch { .. } => 500,
            HandlerError::ResponseMismatch { .. } => 500,
            HandlerError::MissingTarget => 500,
            HandlerError::ChainExhausted => 500,
            HandlerError::DecodeFailed(_) => 400,
            HandlerError::Rejected(_) => 422,
            HandlerError::NotFound(_) => 404,
            HandlerError::Unauthorized(_) => 401,
            HandlerError::Transaction(_) => 500,
            HandlerError::Other(_) => 500,
        }
    }

    /// Stable identifier for this error, suitable for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            HandlerError::HandlerNotFound { .. } => "HANDLER_NOT_FOUND",
            HandlerError::ResponseTypeNotFound { .. } => "RESPONSE_TYPE_NOT_FOUND",
            HandlerError::TypeMismatch { .. } => "TYPE_MISMATCH",
            HandlerError::ResponseMismatch { .. } => "RESPONSE_MISMATCH",
            HandlerError::MissingTarget => "MISSING_TARGET",
            HandlerError::ChainExhausted => "CHAIN_EXHAUSTED",
            HandlerError::DecodeFailed(_) => "DECODE_FAILED",
            HandlerError::Rejected(_) => "REJECTED",
            HandlerError::NotFound(_) => "NOT_FOUND",
            HandlerError::Unauthorized(_) => "UNAUTHORIZED",
            HandlerError::Transaction(_) => "TRANSACTION_FAILED",
            HandlerError::Other(_) => "INTERNAL",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::HandlerNotFound { .. } => ErrorKind::Routing,
            HandlerError::ResponseTypeNotFound { .. }
            | HandlerError::TypeMismatch { .. }
            | HandlerError::ResponseMismatch { .. }
            | HandlerError::MissingTarget
            | HandlerError::ChainExhausted => ErrorKind::Configuration,
            HandlerError::Transaction(_) => ErrorKind::Transaction,
            HandlerError::DecodeFailed(_)
            | HandlerError::Rejected(_)
            | HandlerError::NotFound(_)
            | HandlerError::Unauthorized(_)
            | HandlerError::Other(_) => ErrorKind::Business,
        }
    }
}
