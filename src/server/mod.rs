//! HTTP server for the gateway.
//!
//! - [`api`]: application state, router, and route handlers
//! - [`streaming`]: relay of upstream fragments into a streamed body
//! - [`playground`]: static browser test page

pub mod api;
pub mod playground;
pub mod streaming;
