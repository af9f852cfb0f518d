use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Mutex};

use binprot::{BinProtRead, BinProtWrite};
use ureq::http::StatusCode;

use crate::buffer::MessageBuffer;
use crate::error::Error;
use crate::protocol::{ApplicationException, MessageHeader, MessageKind, Protocol};
use crate::traits::{ClientCodec, Request, Response};

/// Media type identifying the framed binary wire format.
pub const CONTENT_TYPE: &str = "application/x-postrpc";

// One decoded HTTP exchange waiting for the read path. The header slot holds
// the envelope parse error instead when the response bytes were unreadable.
struct PendingMessage<P> {
    header: Result<MessageHeader, Error>,
    buf: MessageBuffer<P>,
}

/// `ClientCodec` over HTTP: every call is one POST of a framed request and
/// one framed response body. The handoff channel between the two paths is
/// zero capacity, so the publish at the end of `write_request` completes only
/// once the read path has taken the message and at most one response is ever
/// in flight.
pub struct HttpClientCodec<P> {
    uri: String,
    protocol: P,
    agent: ureq::Agent,
    messages_tx: SyncSender<PendingMessage<P>>,
    messages_rx: Mutex<Receiver<PendingMessage<P>>>,
    current: Mutex<Option<MessageBuffer<P>>>,
}

impl<P: Protocol + Clone> HttpClientCodec<P> {
    pub fn new(protocol: P, uri: impl Into<String>) -> Self {
        // Non-200 statuses are handled here, not by the agent.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        let (messages_tx, messages_rx) = mpsc::sync_channel(0);
        HttpClientCodec {
            uri: uri.into(),
            protocol,
            agent,
            messages_tx,
            messages_rx: Mutex::new(messages_rx),
            current: Mutex::new(None),
        }
    }
}

impl<P> ClientCodec for HttpClientCodec<P>
where
    P: Protocol + Clone + Send + Sync,
{
    fn write_request<T: BinProtWrite>(&self, request: &Request, payload: &T) -> Result<(), Error> {
        let mut buf = MessageBuffer::new(self.protocol.clone(), Vec::new());
        buf.write_message_begin(&MessageHeader {
            method: request.method.clone(),
            kind: MessageKind::Call,
            seq: request.seq,
        })?;
        buf.encode_struct(payload)?;
        buf.write_message_end()?;

        let mut response = self
            .agent
            .post(&self.uri)
            .content_type(CONTENT_TYPE)
            .send(buf.bytes())?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::HttpStatus(status));
        }
        let body = response.body_mut().read_to_vec()?;
        tracing::debug!("{} seq {}: {} response bytes", request.method, request.seq, body.len());

        let mut buf = MessageBuffer::new(self.protocol.clone(), body);
        let header = buf.read_message_begin();
        // A parse failure still gets published so the read path observes it
        // instead of waiting forever.
        self.messages_tx
            .send(PendingMessage { header, buf })
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(())
    }

    fn read_response_header(&self, response: &mut Response) -> Result<(), Error> {
        let message = {
            let messages_rx = self.messages_rx.lock().unwrap();
            messages_rx.recv().map_err(|_| Error::ConnectionClosed)?
        };
        let mut buf = message.buf;
        let header = message.header?;
        response.method = header.method;
        response.seq = header.seq;
        if header.kind == MessageKind::Exception {
            let exception: ApplicationException = buf.decode_struct()?;
            response.error = Some(exception.to_string());
            return buf.read_message_end();
        }
        *self.current.lock().unwrap() = Some(buf);
        Ok(())
    }

    fn read_response_body<T: BinProtRead>(&self, target: Option<&mut T>) -> Result<(), Error> {
        let target = match target {
            None => return Ok(()),
            Some(target) => target,
        };
        let mut buf = self
            .current
            .lock()
            .unwrap()
            .take()
            .ok_or(Error::NoPendingResponse)?;
        *target = buf.decode_struct()?;
        buf.read_message_end()
    }

    fn close(&self) -> Result<(), Error> {
        // No cross-call resources to release.
        Ok(())
    }
}
