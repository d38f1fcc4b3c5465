//! # Birdcall Platform
//!
//! HTTP implementation of the `PostClient` boundary — the only crate that
//! talks to the platform's write API. The scheduler treats it as an opaque
//! collaborator.

pub mod client;

pub use client::XApiClient;
