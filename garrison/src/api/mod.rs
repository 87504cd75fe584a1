//! External interface types.
//!
//! The crate is transport-agnostic: these are the request/response shapes a
//! host application (HTTP layer, RPC layer, tests) exchanges with the
//! authentication services.

pub mod models;
