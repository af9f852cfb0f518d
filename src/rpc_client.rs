use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use binprot::{BinProtRead, BinProtWrite};

use crate::error::Error;
use crate::http_codec::HttpClientCodec;
use crate::protocol::Protocol;
use crate::traits::{ClientCodec, Request, Response};

// Consumes one completed call on the reader thread. The argument carries the
// application error string taken from the response header, or the terminal
// error when the client shuts down.
type Completion<C> = Box<dyn FnOnce(&C, Result<Option<String>, Error>) + Send>;

type Pending<C> = BTreeMap<i64, Completion<C>>;

/// Drives a `ClientCodec` the way the generic RPC client expects: callers
/// write requests from their own threads while a dedicated reader thread
/// consumes response headers and bodies, pairing them back to callers by
/// sequence number.
pub struct Client<C: ClientCodec> {
    codec: Arc<C>,
    seq_and_pending: Arc<Mutex<(i64, Pending<C>)>>,
    shutdown: Arc<AtomicBool>,
}

impl<C: ClientCodec + 'static> Client<C> {
    pub fn new(codec: C) -> Self {
        let codec = Arc::new(codec);
        let seq_and_pending: Arc<Mutex<(i64, Pending<C>)>> =
            Arc::new(Mutex::new((0, BTreeMap::new())));
        let shutdown = Arc::new(AtomicBool::new(false));

        let reader_codec = codec.clone();
        let reader_pending = seq_and_pending.clone();
        let reader_shutdown = shutdown.clone();
        std::thread::spawn(move || loop {
            let mut response = Response::default();
            match reader_codec.read_response_header(&mut response) {
                Ok(()) => {
                    let completion = {
                        let mut guard = reader_pending.lock().unwrap();
                        guard.1.remove(&response.seq)
                    };
                    match completion {
                        Some(complete) => complete(&reader_codec, Ok(response.error.take())),
                        None => {
                            tracing::error!("response for unknown sequence {}", response.seq);
                            let _ = reader_codec.read_response_body::<()>(None);
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("response header error: {:?}", err);
                    reader_shutdown.store(true, Ordering::SeqCst);
                    let pending = {
                        let mut guard = reader_pending.lock().unwrap();
                        std::mem::take(&mut guard.1)
                    };
                    for (_seq, complete) in pending {
                        complete(&reader_codec, Err(Error::ConnectionClosed));
                    }
                    break;
                }
            }
        });

        Client { codec, seq_and_pending, shutdown }
    }

    // Registers a fresh sequence number together with the completion that
    // will decode the reply, and gets back both the number and the receiving
    // end the dispatching thread waits on.
    fn register<R>(&self) -> (i64, mpsc::Receiver<Result<R, Error>>)
    where
        R: BinProtRead + Default + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let complete: Completion<C> = Box::new(move |codec, outcome| {
            let result = match outcome {
                Err(err) => Err(err),
                Ok(Some(message)) => {
                    let _ = codec.read_response_body::<()>(None);
                    Err(Error::Application(message))
                }
                Ok(None) => {
                    let mut reply = R::default();
                    codec.read_response_body(Some(&mut reply)).map(|()| reply)
                }
            };
            let _ = tx.send(result);
        });
        let mut guard = self.seq_and_pending.lock().unwrap();
        let (next_seq, pending) = &mut *guard;
        let seq = *next_seq;
        *next_seq += 1;
        pending.insert(seq, complete);
        (seq, rx)
    }

    pub fn dispatch<Q, R>(&self, method: &str, query: &Q) -> Result<R, Error>
    where
        Q: BinProtWrite,
        R: BinProtRead + Default + Send + 'static,
    {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        let (seq, rx) = self.register();
        let request = Request { method: method.to_string(), seq };
        if let Err(err) = self.codec.write_request(&request, query) {
            // A failed write publishes nothing, so the reader will never
            // complete this call.
            let mut guard = self.seq_and_pending.lock().unwrap();
            guard.1.remove(&seq);
            return Err(err);
        }
        rx.recv().map_err(|_| Error::ConnectionClosed)?
    }

    pub fn close(&self) -> Result<(), Error> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.codec.close()
    }
}

impl<P> Client<HttpClientCodec<P>>
where
    P: Protocol + Clone + Send + Sync + 'static,
{
    /// Client over a fresh HTTP codec for the given endpoint.
    pub fn http(protocol: P, uri: impl Into<String>) -> Self {
        Client::new(HttpClientCodec::new(protocol, uri))
    }
}
