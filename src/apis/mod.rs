//! Built-in [`GameApi`](crate::api::GameApi) backends.
//!
//! Currently one backend ships with the crate:
//!
//! - [`HttpGameApi`] — JSON-over-HTTP backend built on `reqwest`, enabled by
//!   the default `api-http` feature.
//!
//! Custom backends only need to implement the [`GameApi`](crate::api::GameApi)
//! trait; nothing in the client is HTTP-specific.

#[cfg(feature = "api-http")]
pub mod http;

#[cfg(feature = "api-http")]
pub use http::HttpGameApi;
