//! Minimal HTTP layer for update downloads.
//!
//! The update session implements its own client over a raw streaming
//! connection: request heads are rendered by [`request::UpdateRequest`] and
//! response heads parsed by [`head::parse_head`]. Only the subset of HTTP/1.x
//! the update protocol relies on is covered; responses without a usable body
//! length (including chunked transfer encoding) are rejected by the session.

pub mod head;
pub mod request;

pub use head::{parse_head, BodySize, HeadParse, ResponseHead};
pub use request::{RequestError, UpdateRequest, HEADER_DEVICE_ID, HEADER_FIRMWARE_VERSION};
