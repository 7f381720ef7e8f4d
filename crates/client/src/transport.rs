//! Transport port.

use std::fmt;

use async_trait::async_trait;

use crate::message::{Request, Response};

/// Executes one request attempt against the host encoded in [`Request::path`].
///
/// Connection pooling, TLS, DNS and timeouts are the transport's concern; a
/// timeout surfaces as a [`TransportError`] like any other failure.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	/// Send the request.
	///
	/// # Errors
	///
	/// On failure the returned [`TransportError`] must carry the request it was
	/// given, including its [`Request::discovery`] state; the dispatcher reads
	/// the remaining candidates from there.
	async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
	/// The peer answered with a 4xx status.
	ClientError,
	/// The peer answered with a 5xx status.
	ServerError,
	/// No usable answer: connect failure, reset, timeout.
	Network,
}

impl StatusClass {
	/// Classify a status code. Returns `None` for anything below 400.
	pub fn from_status(status: u16) -> Option<Self> {
		match status {
			400..=499 => Some(Self::ClientError),
			500..=599 => Some(Self::ServerError),
			_ => None,
		}
	}
}

impl fmt::Display for StatusClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::ClientError => "client error",
			Self::ServerError => "server error",
			Self::Network => "network error",
		})
	}
}

/// A failed request attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{class}{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
pub struct TransportError {
	/// The request as sent, with its discovery state.
	pub request: Box<Request>,
	/// Failure classification.
	pub class: StatusClass,
	/// Response status, when the peer answered.
	pub status: Option<u16>,
	/// Human-readable detail.
	pub message: String,
}

impl TransportError {
	/// Failure for a response with an error status.
	///
	/// Statuses below 400 are classified as [`StatusClass::ServerError`], since
	/// the transport only reports them when it considers them failures.
	pub fn status(request: Request, status: u16, message: impl Into<String>) -> Self {
		Self {
			request: Box::new(request),
			class: StatusClass::from_status(status).unwrap_or(StatusClass::ServerError),
			status: Some(status),
			message: message.into(),
		}
	}

	/// Failure without a response.
	pub fn network(request: Request, message: impl Into<String>) -> Self {
		Self {
			request: Box::new(request),
			class: StatusClass::Network,
			status: None,
			message: message.into(),
		}
	}

	/// Returns true for a 5xx status or a network failure.
	pub fn is_server_or_network(&self) -> bool {
		matches!(self.class, StatusClass::ServerError | StatusClass::Network)
	}
}
