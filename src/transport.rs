//! Framed JSON transport to the CFML debug server.
//!
//! Messages are `Content-Length`-framed JSON, the DAP wire format. The
//! [`Client`] owns one TCP connection: requests are written under a lock with
//! a monotonically increasing `seq`, and a reader thread correlates responses
//! back to the pending request by `request_seq`. Everything that is not an
//! awaited response (events, unsolicited responses) is handed to the forward
//! callback so the host can relay it to the editor UI.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::TransportError;
use crate::intercept::MessageInterceptor;
use crate::protocol::{kind_of, MessageKind, Request, Response};

/// Request/response boundary the bridge depends on.
///
/// `perform` sends one custom request and blocks until its matching response
/// arrives; concurrent callers are multiplexed by request `seq`. The response
/// body is returned on success; a `success: false` response becomes
/// [`TransportError::Rejected`].
pub trait Transport: Send + Sync {
    fn perform(&self, command: &str, arguments: Value) -> Result<Value, TransportError>;
}

/// Read a single framed message.
pub fn read_frame(reader: &mut impl BufRead) -> Result<Value, TransportError> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let read_n = reader.read_line(&mut line)?;
        if read_n == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some(v) = line.strip_prefix("Content-Length:") {
            content_length = Some(
                v.trim()
                    .parse()
                    .map_err(|_| TransportError::MissingContentLength)?,
            );
        }
    }

    let len = content_length.ok_or(TransportError::MissingContentLength)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let msg: Value = serde_json::from_slice(&buf)?;
    Ok(msg)
}

/// Write a single framed message.
pub fn write_frame(writer: &mut impl Write, message: &Value) -> Result<(), TransportError> {
    let payload = serde_json::to_vec(message)?;
    write!(writer, "Content-Length: {}\r\n\r\n", payload.len())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Requests awaiting their response. `closed` flips when the reader thread
/// exits, so late callers fail instead of waiting on a dead connection.
#[derive(Default)]
struct PendingState {
    senders: HashMap<i64, SyncSender<Response>>,
    closed: bool,
}

type Pending = Arc<Mutex<PendingState>>;

/// TCP client with request/response correlation.
pub struct Client {
    writer: Mutex<TcpStream>,
    next_seq: AtomicI64,
    pending: Pending,
    interceptor: Arc<MessageInterceptor>,
}

impl Client {
    /// Connect to the debug server and start the reader thread.
    ///
    /// `forward` receives every inbound message that is not an awaited
    /// response, after interception.
    pub fn connect(
        host: &str,
        port: u16,
        interceptor: Arc<MessageInterceptor>,
        forward: impl Fn(Value) + Send + 'static,
    ) -> Result<Arc<Client>, TransportError> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;

        let client = Arc::new(Client {
            writer: Mutex::new(stream.try_clone()?),
            next_seq: AtomicI64::new(1),
            pending: Arc::new(Mutex::new(PendingState::default())),
            interceptor: interceptor.clone(),
        });

        std::thread::spawn({
            let pending = client.pending.clone();
            move || read_loop(stream, interceptor, pending, forward)
        });

        log::info!(target: "bridge", "connected to debug server at {host}:{port}");
        Ok(client)
    }
}

impl Transport for Client {
    fn perform(&self, command: &str, arguments: Value) -> Result<Value, TransportError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::sync_channel(1);
        {
            let mut pending = self.pending.lock().unwrap();
            if pending.closed {
                return Err(TransportError::ConnectionClosed);
            }
            pending.senders.insert(seq, sender);
        }

        let message = serde_json::to_value(Request::new(seq, command, arguments))?;
        self.interceptor.outbound(&message);

        let written = write_frame(&mut *self.writer.lock().unwrap(), &message);
        if let Err(err) = written {
            self.pending.lock().unwrap().senders.remove(&seq);
            return Err(err);
        }

        // Reader thread exit drops the sender, failing the recv.
        let response = receiver
            .recv()
            .map_err(|_| TransportError::ConnectionClosed)?;

        if response.success {
            Ok(response.body)
        } else {
            Err(TransportError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "no error message".to_string()),
            ))
        }
    }
}

fn read_loop(
    stream: TcpStream,
    interceptor: Arc<MessageInterceptor>,
    pending: Pending,
    forward: impl Fn(Value),
) {
    let mut reader = BufReader::new(stream);

    loop {
        let message = match read_frame(&mut reader) {
            Ok(message) => message,
            Err(err) => {
                log::debug!(target: "bridge", "reader stopped: {err}");
                break;
            }
        };

        let message = interceptor.inbound(message);

        if kind_of(&message) == MessageKind::Response {
            let request_seq = message.get("request_seq").and_then(Value::as_i64);
            let sender = request_seq.and_then(|seq| pending.lock().unwrap().senders.remove(&seq));
            if let Some(sender) = sender {
                match serde_json::from_value::<Response>(message) {
                    Ok(response) => {
                        let _ = sender.send(response);
                    }
                    Err(err) => log::warn!(target: "bridge", "malformed response: {err}"),
                }
                continue;
            }
        }

        forward(message);
    }

    // Fail everything still waiting for a response and refuse newcomers.
    let mut pending = pending.lock().unwrap();
    pending.closed = true;
    pending.senders.clear();
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_frame_roundtrip() {
        let message = json!({"type": "request", "seq": 1, "command": "dump"});
        let mut buf = Vec::new();
        write_frame(&mut buf, &message).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("Content-Length: "));
        assert!(text.contains("\r\n\r\n"));

        let read = read_frame(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read, message);
    }

    #[test]
    fn test_read_frame_tolerates_extra_headers() {
        let payload = r#"{"type":"event","event":"stopped"}"#;
        let wire = format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
            payload.len()
        );
        let read = read_frame(&mut Cursor::new(wire.into_bytes())).unwrap();
        assert_eq!(read["event"], "stopped");
    }

    #[test]
    fn test_read_frame_without_length_fails() {
        let wire = b"Content-Type: application/json\r\n\r\n{}".to_vec();
        let err = read_frame(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, TransportError::MissingContentLength));
    }

    #[test]
    fn test_read_frame_on_eof_is_connection_closed() {
        let err = read_frame(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }
}
