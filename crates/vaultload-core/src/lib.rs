//! Core library for `vaultload`.
//!
//! Turns a `SECRET_NAME,SECRET_KEY,SECRET_VALUE` file into KV v2 writes
//! against a Vault-compatible secrets backend. The pipeline is:
//!
//! 1. [`config`]: build and normalize an immutable [`config::VaultConfig`].
//! 2. [`auth`]: authenticate (token or `AppRole`) into a [`auth::Session`].
//! 3. [`parser`]: parse the input text into [`parser::SecretRecord`]s.
//! 4. [`group`]: fold records into ordered [`group::GroupedSecrets`].
//! 5. [`upload`]: write each secret sequentially through a
//!    [`gateway::SecretsGateway`], tracking per-secret state.
//! 6. [`report`]: render the outcome as a CSV audit record.
//!
//! The crate knows nothing about terminals or HTTP servers; the CLI and the
//! proxy server both drive it.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod group;
pub mod parser;
pub mod report;
pub mod upload;
pub mod validation;
