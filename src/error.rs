#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- session errors --------------------------------------------
    #[error("no active debug session")]
    NoActiveSession,
    #[error("debug server is not connected")]
    NotConnected,

    // --------------------------------- transport errors ------------------------------------------
    #[error("`{command}` request failed: {source}")]
    Request {
        command: &'static str,
        #[source]
        source: TransportError,
    },

    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Tag a transport failure with the custom command that triggered it.
    pub(crate) fn request(command: &'static str) -> impl FnOnce(TransportError) -> Error {
        move |source| Error::Request { command, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("debug server connection closed")]
    ConnectionClosed,
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("debug server rejected the request: {0}")]
    Rejected(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
