//! Custom requests against the CFML debug server.
//!
//! These are server-specific extensions outside the generic DAP vocabulary:
//! variable dumps, metadata, application settings, source-path resolution and
//! breakpoint-binding introspection. Each is an interactive, user-triggered,
//! at-most-once operation: no retries, and results are routed into the
//! virtual document store or the render surface cache per capability.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use itertools::Itertools;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Value};

use crate::error::Error;
use crate::host::HostShell;
use crate::session::{DebugSession, SessionRegistry};
use crate::surface::RenderSurfaceManager;
use crate::vdoc::VirtualDocumentStore;

pub const DUMP: &str = "dump";
pub const DUMP_AS_JSON: &str = "dumpAsJSON";
pub const GET_METADATA: &str = "getMetadata";
pub const GET_APPLICATION_SETTINGS: &str = "getApplicationSettings";
pub const GET_SOURCE_PATH: &str = "getSourcePath";
pub const DEBUG_BREAKPOINT_BINDINGS: &str = "debugBreakpointBindings";

/// Scope or composite value selected in the variables view.
#[derive(Debug, Clone)]
pub struct ScopeDescriptor {
    pub name: String,
    pub variables_reference: i64,
    pub expensive: bool,
}

pub struct CustomRequestBridge {
    registry: Arc<SessionRegistry>,
    docs: Arc<VirtualDocumentStore>,
    surfaces: Arc<RenderSurfaceManager>,
    host: Arc<dyn HostShell>,
}

impl CustomRequestBridge {
    pub fn new(
        registry: Arc<SessionRegistry>,
        docs: Arc<VirtualDocumentStore>,
        surfaces: Arc<RenderSurfaceManager>,
        host: Arc<dyn HostShell>,
    ) -> Self {
        CustomRequestBridge {
            registry,
            docs,
            surfaces,
            host,
        }
    }

    /// Render a variable dump as HTML in a surface keyed by name and
    /// reference, so repeated dumps of the same value reuse one panel.
    pub fn dump(&self, name: &str, reference: i64) -> Result<(), Error> {
        let Some(session) = self.active() else {
            return Ok(());
        };

        let body = session
            .transport()
            .perform(DUMP, json!({ "variablesReference": reference }))
            .map_err(Error::request(DUMP))?;

        let html = content_of(&body).unwrap_or_default();
        let key = format!("cfbridge://dump/{name}?ref={reference}");
        self.surfaces.show(&key, &format!("dump: {name}"), html);
        Ok(())
    }

    /// Dump a variable as pretty-printed JSON into a virtual document and
    /// direct the host to open it.
    pub fn dump_as_json(&self, name: &str, reference: i64) -> Result<(), Error> {
        let Some(session) = self.active() else {
            return Ok(());
        };

        let body = session
            .transport()
            .perform(DUMP_AS_JSON, json!({ "variablesReference": reference }))
            .map_err(Error::request(DUMP_AS_JSON))?;

        let uri = format!("cfbridge://dump/{name}-{reference}.json");
        self.publish_json_document(&uri, content_of(&body).unwrap_or_default());
        Ok(())
    }

    /// Fetch server-side metadata for a variable (type, implemented
    /// interfaces, ...) as a JSON document.
    pub fn get_metadata(&self, name: &str, reference: i64) -> Result<(), Error> {
        let Some(session) = self.active() else {
            return Ok(());
        };

        let body = session
            .transport()
            .perform(GET_METADATA, json!({ "variablesReference": reference }))
            .map_err(Error::request(GET_METADATA))?;

        let uri = format!("cfbridge://dump/{name}.metadata-{reference}.json");
        self.publish_json_document(&uri, content_of(&body).unwrap_or_default());
        Ok(())
    }

    /// Fetch the settings of the running application. Only meaningful on the
    /// top-level `application` scope; on any other container the user gets a
    /// warning and the server is never contacted.
    ///
    /// The artifact key carries a timestamp fragment rather than the
    /// variables reference, so repeated invocations never collide.
    pub fn get_application_settings(&self, scope: &ScopeDescriptor) -> Result<(), Error> {
        if scope.name != "application" {
            self.host.warn(&format!(
                "Application settings are only available on the `application` scope, \
                 not on `{}`",
                scope.name
            ));
            return Ok(());
        }

        let Some(session) = self.active() else {
            return Ok(());
        };

        let body = session
            .transport()
            .perform(
                GET_APPLICATION_SETTINGS,
                json!({ "variablesReference": scope.variables_reference }),
            )
            .map_err(Error::request(GET_APPLICATION_SETTINGS))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let uri = format!("cfbridge://settings/{}-{stamp}.json", scope.name);
        self.publish_json_document(&uri, content_of(&body).unwrap_or_default());
        Ok(())
    }

    /// Resolve the file-system source location behind a variable and open it
    /// directly. A response without a path is a silent no-op.
    pub fn get_source_path(&self, reference: i64) -> Result<(), Error> {
        let Some(session) = self.active() else {
            return Ok(());
        };

        let body = session
            .transport()
            .perform(GET_SOURCE_PATH, json!({ "variablesReference": reference }))
            .map_err(Error::request(GET_SOURCE_PATH))?;

        match content_of(&body) {
            Some(path) if !path.is_empty() => self.host.open_source(path),
            _ => log::debug!(target: "bridge", "no source path for ref {reference}"),
        }
        Ok(())
    }

    /// Build the breakpoint-bindings report: which ide-side breakpoints bound
    /// to which server paths, the path transforms in effect, and every file
    /// the server knows about.
    ///
    /// Unlike the other capabilities this one fails hard without a session;
    /// it exists to debug connection and path-mapping problems, so silence
    /// would defeat its purpose.
    pub fn debug_breakpoint_bindings(&self) -> Result<(), Error> {
        let session = self.active().ok_or(Error::NotConnected)?;

        let body = session
            .transport()
            .perform(DEBUG_BREAKPOINT_BINDINGS, Value::Null)
            .map_err(Error::request(DEBUG_BREAKPOINT_BINDINGS))?;

        let uri = "cfbridge://bindings/report.txt";
        self.docs.put(uri, bindings_report(&body));
        self.host.open_document(uri);
        Ok(())
    }

    fn active(&self) -> Option<Arc<DebugSession>> {
        let session = self.registry.active_session();
        if session.is_none() {
            log::debug!(target: "bridge", "custom request ignored: no active session");
        }
        session
    }

    fn publish_json_document(&self, uri: &str, content: &str) {
        self.docs.put(uri, pretty_json_or_diagnostic(content));
        self.host.open_document(uri);
    }
}

fn content_of(body: &Value) -> Option<&str> {
    body.get("content").and_then(Value::as_str)
}

/// Parse `text` as JSON and pretty-print it with 4-space indentation. Text
/// the server failed to encode properly is kept readable: it is wrapped in a
/// diagnostic string instead of raising an error.
pub fn pretty_json_or_diagnostic(text: &str) -> String {
    let value = serde_json::from_str::<Value>(text)
        .unwrap_or_else(|_| Value::String(format!("Failed to parse the following JSON:\n{text}")));
    pretty(&value)
}

fn pretty(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Deterministic text report over a `debugBreakpointBindings` response body.
pub fn bindings_report(body: &Value) -> String {
    let mut bindings: Vec<(&str, &str)> = body
        .get("breakpoints")
        .and_then(Value::as_array)
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let ide = pair.get(0)?.as_str()?;
                    let server = pair.get(1)?.as_str()?;
                    Some((ide, server))
                })
                .collect()
        })
        .unwrap_or_default();
    bindings.sort_unstable();

    let transforms: Vec<String> = body
        .get("pathTransforms")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(transform_line).collect())
        .unwrap_or_default();

    let mut filenames: Vec<&str> = body
        .get("canonicalFilenames")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    filenames.sort_unstable();

    let mut report = String::new();
    let _ = writeln!(report, "Breakpoint bindings:\n");
    let _ = writeln!(
        report,
        "{}\n",
        bindings
            .iter()
            .map(|(ide, server)| format!("(ide) {ide}\n(server) {server}"))
            .join("\n\n")
    );

    let _ = writeln!(report, "Path transforms:\n");
    if transforms.is_empty() {
        let _ = writeln!(report, "(no path transforms)\n");
    } else {
        let _ = writeln!(report, "{}\n", transforms.iter().join("\n"));
    }

    let _ = writeln!(report, "Server known files:\n");
    let _ = writeln!(report, "{}", filenames.iter().join("\n"));

    report
}

fn transform_line(entry: &Value) -> Option<String> {
    if let Some(text) = entry.as_str() {
        return Some(text.to_string());
    }
    let ide = entry.get("idePrefix")?.as_str()?;
    let server = entry.get("serverPrefix")?.as_str()?;
    Some(format!("{ide} <-> {server}"))
}
