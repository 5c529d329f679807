//! End-to-end tests over a loopback TCP stub speaking the framed protocol.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use cfbridge::bridge::CustomRequestBridge;
use cfbridge::error::TransportError;
use cfbridge::host::HostShell;
use cfbridge::intercept::MessageInterceptor;
use cfbridge::session::{DebugSession, SessionConfig, SessionRegistry};
use cfbridge::surface::RenderSurfaceManager;
use cfbridge::tracer::TraceSink;
use cfbridge::transport::{read_frame, write_frame, Client, Transport};
use cfbridge::vdoc::VirtualDocumentStore;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn response_for(request: &Value, seq: i64, success: bool, message: Option<&str>, body: Value) -> Value {
    json!({
        "seq": seq,
        "type": "response",
        "request_seq": request["seq"],
        "success": success,
        "command": request["command"],
        "message": message,
        "body": body,
    })
}

/// Stub debug server: one client, canned per-command behavior.
fn spawn_backend() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = stream;
        let mut seq = 1000i64;
        let mut held: Option<Value> = None;

        loop {
            let Ok(request) = read_frame(&mut reader) else {
                break;
            };
            let command = request["command"].as_str().unwrap_or_default().to_string();
            seq += 1;

            let message = match command.as_str() {
                "stackTrace" => response_for(
                    &request,
                    seq,
                    true,
                    None,
                    json!({"stackFrames": [
                        {"id": 1, "name": "onRequest", "source": {"path": "C:\\web\\App.cfc"}},
                    ]}),
                ),
                "dump" => {
                    let response = response_for(
                        &request,
                        seq,
                        true,
                        None,
                        json!({"content": "<table>dump</table>"}),
                    );
                    write_frame(&mut writer, &response).expect("write response");
                    seq += 1;
                    // Unsolicited event right after the response.
                    json!({"seq": seq, "type": "event", "event": "stopped", "body": {"reason": "breakpoint"}})
                }
                "fail" => response_for(&request, seq, false, Some("boom"), Value::Null),
                "holdFirst" => {
                    // Answer the second request first to exercise correlation.
                    match held.take() {
                        None => {
                            held = Some(request);
                            continue;
                        }
                        Some(first) => {
                            let response = response_for(
                                &request,
                                seq,
                                true,
                                None,
                                json!({"tag": request["arguments"]["tag"]}),
                            );
                            write_frame(&mut writer, &response).expect("write response");
                            seq += 1;
                            response_for(
                                &first,
                                seq,
                                true,
                                None,
                                json!({"tag": first["arguments"]["tag"]}),
                            )
                        }
                    }
                }
                "shutdown" => break,
                _ => response_for(&request, seq, false, Some("unknown command"), Value::Null),
            };

            if write_frame(&mut writer, &message).is_err() {
                break;
            }
        }
    });

    Ok(addr)
}

#[derive(Default)]
struct VecSink(Mutex<Vec<String>>);

impl TraceSink for VecSink {
    fn line(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

struct Connected {
    registry: Arc<SessionRegistry>,
    client: Arc<Client>,
    events: mpsc::Receiver<Value>,
    sink: Arc<VecSink>,
}

fn connect(policy: &str) -> anyhow::Result<Connected> {
    let _ = env_logger::builder().is_test(true).try_init();

    let addr = spawn_backend()?;

    let registry = Arc::new(SessionRegistry::new());
    let sink = Arc::new(VecSink::default());
    let interceptor = Arc::new(MessageInterceptor::new(registry.clone(), sink.clone()));

    let (events_tx, events) = mpsc::channel();
    let client = Client::connect(
        &addr.ip().to_string(),
        addr.port(),
        interceptor,
        move |message| {
            let _ = events_tx.send(message);
        },
    )?;

    let config = SessionConfig::from_launch_args(&json!({
        "hostName": addr.ip().to_string(),
        "port": addr.port(),
        "pathSeparator": policy,
    }));
    registry.on_session_start(Arc::new(DebugSession::new(config, client.clone())));

    Ok(Connected {
        registry,
        client,
        events,
        sink,
    })
}

#[test]
fn stack_trace_paths_are_rewritten_before_delivery() -> anyhow::Result<()> {
    let conn = connect("posix")?;

    let body = conn.client.perform("stackTrace", json!({"threadId": 1}))?;
    assert_eq!(body["stackFrames"][0]["source"]["path"], "C:/web/App.cfc");

    // Both directions were traced.
    let lines = conn.sink.0.lock().unwrap();
    assert!(lines.iter().any(|l| l.starts_with("-> ") && l.contains("stackTrace")));
    assert!(lines.iter().any(|l| l.starts_with("<- ") && l.contains("C:/web/App.cfc")));
    Ok(())
}

#[test]
fn events_are_forwarded_to_the_host() -> anyhow::Result<()> {
    let conn = connect("none")?;

    let body = conn.client.perform("dump", json!({"variablesReference": 1}))?;
    assert_eq!(body["content"], "<table>dump</table>");

    let event = conn.events.recv_timeout(EVENT_TIMEOUT)?;
    assert_eq!(event["event"], "stopped");
    assert_eq!(event["body"]["reason"], "breakpoint");
    Ok(())
}

#[test]
fn rejection_carries_server_message() -> anyhow::Result<()> {
    let conn = connect("none")?;

    let err = conn.client.perform("fail", Value::Null).unwrap_err();
    let TransportError::Rejected(message) = err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(message, "boom");
    Ok(())
}

#[test]
fn concurrent_requests_are_correlated_by_seq() -> anyhow::Result<()> {
    let conn = connect("none")?;

    let first = thread::spawn({
        let client = conn.client.clone();
        move || client.perform("holdFirst", json!({"tag": "first"}))
    });
    // Give the first request time to reach the stub before the second.
    thread::sleep(Duration::from_millis(100));
    let second = conn.client.perform("holdFirst", json!({"tag": "second"}))?;
    let first = first.join().expect("join first")?;

    assert_eq!(first["tag"], "first");
    assert_eq!(second["tag"], "second");
    Ok(())
}

#[test]
fn connection_close_fails_pending_requests() -> anyhow::Result<()> {
    let conn = connect("none")?;

    let err = conn.client.perform("shutdown", Value::Null).unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed));
    Ok(())
}

struct SilentHost;

impl HostShell for SilentHost {
    fn warn(&self, _message: &str) {}
    fn open_document(&self, _uri: &str) {}
    fn open_source(&self, _path: &str) {}
}

#[test]
fn bridge_dump_works_over_a_real_connection() -> anyhow::Result<()> {
    let conn = connect("none")?;

    let docs = Arc::new(VirtualDocumentStore::new());
    let surfaces = Arc::new(RenderSurfaceManager::new());
    let bridge = CustomRequestBridge::new(
        conn.registry.clone(),
        docs,
        surfaces.clone(),
        Arc::new(SilentHost),
    );

    bridge.dump("request", 4)?;
    assert_eq!(
        surfaces.html("cfbridge://dump/request?ref=4").as_deref(),
        Some("<table>dump</table>")
    );
    Ok(())
}
