//! media-store-axum: Axum adapter for media-store.
//!
//! Turns any [`media_store::StorageAdapter`] into request handlers that
//! stream stored media back over HTTP:
//!
//! - `200` with the blob's `Content-Type` and a streamed body
//! - `404` with an empty body when the blob is absent
//! - `500` with an empty body on any other failure
//!
//! Theme assets bypass the remote store and are served from an injected
//! [`LocalFileStore`].

pub mod app;
mod error;
mod local;
pub mod serve;

pub use app::MediaApp;
pub use error::ServeError;
pub use local::LocalFileStore;
pub use serve::{serve_blob, MediaServer, ServeOptions};

pub use axum;
