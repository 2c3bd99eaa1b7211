#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod range_responder;
pub mod socket_guard;
pub mod trickle_server;
