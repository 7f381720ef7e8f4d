//! Per-service call handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower_service::Service;

use crate::Result;
use crate::dispatcher::FailoverClient;
use crate::message::{Request, Response};

/// Boxed future returned by the [`Service`] impl of [`ServiceHandle`].
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

/// Calls bound to one service name.
///
/// Obtained from [`FailoverClient::service`]. Also usable as a
/// [`tower_service::Service`], which is always ready: backpressure lives in the
/// transport.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
	client: FailoverClient,
	name: Arc<str>,
}

impl ServiceHandle {
	pub(crate) fn new(client: FailoverClient, name: String) -> Self {
		Self {
			client,
			name: name.into(),
		}
	}

	/// Target service name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Send `request` to this service.
	pub async fn call(&self, request: Request) -> Result<Response> {
		self.client.call(&self.name, request).await
	}

	/// Shorthand for a `GET` of `path`.
	pub async fn get(&self, path: impl Into<String>) -> Result<Response> {
		self.call(Request::get(path)).await
	}
}

impl Service<Request> for ServiceHandle {
	type Response = Response;
	type Error = crate::Error;
	type Future = ResponseFuture;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, request: Request) -> Self::Future {
		let handle = self.clone();
		Box::pin(async move { ServiceHandle::call(&handle, request).await })
	}
}
