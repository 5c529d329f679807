use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Append-only sink for protocol traffic diagnostics.
pub trait TraceSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Simple file-based trace sink.
#[derive(Clone)]
pub struct FileTracer {
    file: Arc<Mutex<std::fs::File>>,
}

impl FileTracer {
    pub fn new(path: &std::path::Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open trace file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl TraceSink for FileTracer {
    fn line(&self, text: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{text}");
        }
    }
}

/// Sink that forwards to the `log` facade, for hosts without a trace file.
pub struct LogTracer;

impl TraceSink for LogTracer {
    fn line(&self, text: &str) {
        log::debug!(target: "bridge::trace", "{text}");
    }
}
