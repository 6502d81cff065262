//! # REST API Interface Layer
//!
//! One module per resource, each exposing a `router()` that is merged into
//! the application router. Every route except `/health` sits behind the
//! bearer-token check in [`auth`].
//!
//! Error bodies are always `{ "error": <message>, "code": <CODE> }`.

pub mod api_error;
pub mod auth;
pub mod battle_apis;
pub mod friend_apis;
pub mod health_apis;
pub mod presence_apis;
pub mod study_session_apis;
