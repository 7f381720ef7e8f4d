//! Caller-supplied request/response transforms.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::message::{Request, Response};

/// A request/response transform pair wrapped around the dispatcher.
///
/// Both halves are optional: the provided methods pass the request through
/// unchanged and propagate the outcome (success or error) unchanged.
///
/// Ordering, for interceptors registered as `[A, B]`:
/// - `A.on_request`, `B.on_request`, then discovery and dispatch;
/// - once the dispatcher reached its final outcome, `A.on_response`,
///   `B.on_response`.
///
/// Each half runs exactly once per call. Retries happen inside the dispatcher
/// and are never visible here, so interceptors must not retry or re-dispatch on
/// their own.
///
/// Returning an error from [`Interceptor::on_request`] skips dispatch; the
/// error still flows through every [`Interceptor::on_response`].
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
	/// Transform an outgoing request.
	async fn on_request(&self, request: Request) -> Result<Request> {
		Ok(request)
	}

	/// Transform the final outcome of a call.
	async fn on_response(&self, outcome: Result<Response>) -> Result<Response> {
		outcome
	}
}

/// Shared interceptor handle.
pub type SharedInterceptor = Arc<dyn Interceptor>;
