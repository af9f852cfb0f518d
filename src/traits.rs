use binprot::{BinProtRead, BinProtWrite};

use crate::error::Error;
use crate::rpc_client::Client;

/// Call descriptor handed to the write path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: String,
    pub seq: i64,
}

/// Call descriptor filled by the read path. `error` carries the remote
/// application failure, distinct from the operation's own result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub method: String,
    pub seq: i64,
    pub error: Option<String>,
}

/// Transport contract consumed by the RPC client: a write path and a read
/// path that may be driven by different threads.
pub trait ClientCodec: Send + Sync {
    /// Sends one request. Blocks until the corresponding response has been
    /// handed to the read path.
    fn write_request<T: BinProtWrite>(&self, request: &Request, payload: &T) -> Result<(), Error>;

    /// Blocks until a response is available and fills in the descriptor.
    fn read_response_header(&self, response: &mut Response) -> Result<(), Error>;

    /// Decodes the reply into `target`. A `None` target skips the payload.
    fn read_response_body<T: BinProtRead>(&self, target: Option<&mut T>) -> Result<(), Error>;

    fn close(&self) -> Result<(), Error>;
}

pub trait Rpc {
    type Q: BinProtWrite;
    type R: BinProtRead + Default + Send + 'static;

    const METHOD: &'static str;

    fn dispatch<C: ClientCodec + 'static>(client: &Client<C>, q: &Self::Q) -> Result<Self::R, Error> {
        client.dispatch(Self::METHOD, q)
    }
}
