//! cfbridge is the session and custom-request core of an editor integration
//! for a CFML debug server.
//!
//! It tracks the single active debug session, intercepts DAP traffic to
//! reconcile path separator conventions between the editor host and the
//! server, exposes the server's custom requests (variable dumps, metadata,
//! application settings, source-path resolution, breakpoint-binding
//! introspection), and routes their results into virtual documents and
//! HTML render surfaces the editor shell displays.

pub mod bridge;
pub mod error;
pub mod expr;
pub mod host;
pub mod intercept;
pub mod pathmap;
pub mod protocol;
pub mod session;
pub mod surface;
pub mod tracer;
pub mod transport;
pub mod vdoc;
