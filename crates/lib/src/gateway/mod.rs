//! Gateway: the HTTP surface.
//!
//! One endpoint does the work (`POST /chat`); `GET /` is a health check.

mod protocol;
mod server;

pub use protocol::{ChatReply, ChatRequest, ErrorBody, Message};
pub use server::{router, run_gateway, GatewayState};
