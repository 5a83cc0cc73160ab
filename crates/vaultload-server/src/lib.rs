//! `vaultload` proxy server.
//!
//! Exposes the backend gateway over HTTP at `/api/vault/*` so browser or
//! remote clients can reach a secrets backend they cannot call directly.
//! Each request is one independent backend call; the server keeps no
//! session state.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
