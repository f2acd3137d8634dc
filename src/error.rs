//! Errors raised at the browser boundary.

use wasm_bindgen::JsValue;

/// Result of the browser-facing setup functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures at the browser boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Not running in a browser window.
	#[error("no global window")]
	NoWindow,

	/// The window has no document.
	#[error("window has no document")]
	NoDocument,

	/// `getContext("2d")` failed.
	#[error("canvas has no 2d context")]
	NoContext,

	/// A page element is absent or of an unexpected type.
	#[error("element #{id} is missing or has the wrong type")]
	MissingElement {
		/// Element id.
		id: String,
	},

	/// A JSON script tag did not parse.
	#[error("invalid {what} JSON: {source}")]
	Json {
		/// Id of the script tag.
		what: &'static str,
		/// Parse failure.
		#[source]
		source: serde_json::Error,
	},

	/// An exception thrown by a browser API.
	#[error("javascript error: {0}")]
	Js(String),
}

impl From<JsValue> for Error {
	fn from(value: JsValue) -> Self {
		Error::Js(
			value
				.as_string()
				.unwrap_or_else(|| format!("{:?}", value)),
		)
	}
}
