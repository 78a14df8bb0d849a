//! Wire message types for the private stream
//!
//! Outbound requests share the `op`/`args` envelope. Inbound replies to
//! those requests carry `op` as well; data pushes carry `topic` and `data`.

pub mod request;
pub mod response;

pub use request::WsRequest;
pub use response::OpResponse;
