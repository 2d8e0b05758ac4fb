//! ComfyUI REST client and media generation gateway.
//!
//! Provides the workflow template catalog, placeholder substitution,
//! HTTP API wrappers, history parsing and the submit-then-poll gateway
//! used by the orchestration services.

pub mod api;
pub mod catalog;
pub mod gateway;
pub mod history;
pub mod template;
