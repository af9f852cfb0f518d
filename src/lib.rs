// HTTP transport codec for sequence-numbered binary RPC clients: each call is
// a single POST of a framed request, each response body a framed reply handed
// back to the client's read path through a rendezvous channel.

mod buffer;
mod error;
mod http_codec;
mod protocol;
mod rpc_client;
mod traits;

pub use crate::buffer::MessageBuffer;
pub use crate::error::Error;
pub use crate::http_codec::{HttpClientCodec, CONTENT_TYPE};
pub use crate::protocol::*;
pub use crate::rpc_client::Client;
pub use crate::traits::*;
