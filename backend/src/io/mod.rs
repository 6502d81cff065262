//! # IO Module
//!
//! HTTP interface of the session coordinator. Translates JSON requests into
//! domain calls and domain errors into status codes with a JSON error body.

pub mod rest;

pub use rest::*;
