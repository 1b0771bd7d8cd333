//! Shared data types for the yam-leaf classification service.
//!
//! `model` holds the records and views served over HTTP, `requests` the
//! payloads and query strings the endpoints accept.

pub mod model;
pub mod requests;
