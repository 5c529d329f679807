//! Interception of raw DAP traffic between the editor and the debug server.
//!
//! Every message is rendered pretty-printed into a [`TraceSink`]. Inbound
//! stack-trace responses and stack-frame-carrying events additionally get
//! their `source.path` fields rewritten according to the active session's
//! separator policy, before any downstream consumer sees them.

use std::sync::Arc;

use serde_json::Value;

use crate::pathmap::{host_separator, normalize_separators, SeparatorPolicy};
use crate::protocol::{command_of, kind_of, MessageKind};
use crate::session::SessionRegistry;
use crate::tracer::TraceSink;

const STACK_TRACE_COMMAND: &str = "stackTrace";

pub struct MessageInterceptor {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn TraceSink>,
}

impl MessageInterceptor {
    pub fn new(registry: Arc<SessionRegistry>, sink: Arc<dyn TraceSink>) -> Self {
        MessageInterceptor { registry, sink }
    }

    /// Editor -> server: log only.
    pub fn outbound(&self, message: &Value) {
        self.trace("->", message);
    }

    /// Server -> editor: rewrite stack frame paths, then log. The returned
    /// value is what downstream consumers must observe.
    pub fn inbound(&self, mut message: Value) -> Value {
        if let Some(session) = self.registry.active_session() {
            let policy = session.config().path_separator;
            if policy != SeparatorPolicy::None && carries_stack_frames(&message) {
                rewrite_frame_paths(&mut message, policy);
            }
        }

        self.trace("<-", &message);
        message
    }

    fn trace(&self, direction: &str, message: &Value) {
        if let Ok(text) = serde_json::to_string_pretty(message) {
            self.sink.line(&format!("{direction} {text}"));
        }
    }
}

fn carries_stack_frames(message: &Value) -> bool {
    match kind_of(message) {
        MessageKind::Response => command_of(message) == Some(STACK_TRACE_COMMAND),
        MessageKind::Event => message
            .pointer("/body/stackFrames")
            .is_some_and(Value::is_array),
        _ => false,
    }
}

/// Replace `source.path` in every frame of `body.stackFrames`. Absent or
/// ill-shaped fields are simply left alone.
fn rewrite_frame_paths(message: &mut Value, policy: SeparatorPolicy) {
    let Some(frames) = message
        .pointer_mut("/body/stackFrames")
        .and_then(Value::as_array_mut)
    else {
        return;
    };

    for frame in frames {
        let Some(path) = frame.pointer_mut("/source/path") else {
            continue;
        };
        if let Some(s) = path.as_str() {
            *path = Value::String(normalize_separators(s, policy, host_separator()));
        }
    }
}
