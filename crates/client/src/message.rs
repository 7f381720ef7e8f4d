//! Request and response descriptors handed to the transport.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::state::DiscoveryState;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
	/// `GET`
	#[default]
	Get,
	/// `HEAD`
	Head,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `OPTIONS`
	Options,
}

impl Method {
	/// Canonical upper-case name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Head => "HEAD",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Options => "OPTIONS",
		}
	}
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Outgoing request descriptor.
///
/// `path` is relative to the service (e.g. `/invoices/42`) when the caller
/// builds the request. While an attempt is in flight the dispatcher rewrites it
/// to `host + path` and keeps the original in [`Request::discovery`].
#[derive(Debug, Clone, Default)]
pub struct Request {
	/// Request method.
	pub method: Method,
	/// Request path, or absolute target while dispatched.
	pub path: String,
	/// Request headers.
	pub headers: HashMap<String, String>,
	/// Optional request body.
	pub body: Option<Bytes>,
	/// Discovery state attached by the dispatcher; `None` on a fresh request.
	pub discovery: Option<DiscoveryState>,
}

impl Request {
	/// Create a request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			..Self::default()
		}
	}

	/// Create a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Create a `POST` request with a body.
	pub fn post(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
		Self::new(Method::Post, path).body(body)
	}

	/// Set a header, replacing any previous value.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	/// Set the body.
	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = Some(body.into());
		self
	}

	/// Set a JSON body and the matching content type.
	pub fn json<T: Serialize>(self, value: &T) -> Result<Self> {
		let body = serde_json::to_vec(value)?;
		Ok(self.header("Content-Type", "application/json").body(body))
	}
}

/// Response descriptor returned by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
	/// Status code.
	pub status: u16,
	/// Response headers.
	pub headers: HashMap<String, String>,
	/// Response body.
	pub body: Bytes,
}

impl Response {
	/// Create a response with a status code and body.
	pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
		Self {
			status,
			headers: HashMap::new(),
			body: body.into(),
		}
	}

	/// Returns true for a 2xx status.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decode the body as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_json::from_slice(&self.body)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_request_builder() {
		let request = Request::get("/invoices/42").header("Accept", "application/json");

		assert_eq!(request.method, Method::Get);
		assert_eq!(request.path, "/invoices/42");
		assert_eq!(request.headers.get("Accept").map(String::as_str), Some("application/json"));
		assert!(request.body.is_none());
		assert!(request.discovery.is_none());
	}

	#[test]
	fn test_request_json_body() {
		let request = Request::new(Method::Put, "/invoices/42")
			.json(&serde_json::json!({"paid": true}))
			.unwrap();

		assert_eq!(request.body.as_deref(), Some(&br#"{"paid":true}"#[..]));
		assert_eq!(
			request.headers.get("Content-Type").map(String::as_str),
			Some("application/json")
		);
	}

	#[test]
	fn test_response_json() {
		let response = Response::new(200, r#"{"value":"first"}"#);
		let value: serde_json::Value = response.json().unwrap();

		assert!(response.is_success());
		assert_eq!(value["value"], "first");
	}
}
