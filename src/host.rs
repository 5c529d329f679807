//! Seam toward the editor shell.

/// Host-side operations the bridge needs from the editor.
///
/// The host is expected to resolve `cfbridge://` URIs against the
/// [`VirtualDocumentStore`](crate::vdoc::VirtualDocumentStore).
pub trait HostShell: Send + Sync {
    /// Show an inline, non-modal warning to the user.
    fn warn(&self, message: &str);

    /// Open the virtual document behind `uri` in an editor tab.
    fn open_document(&self, uri: &str);

    /// Open a real file-system source location in an editor tab.
    fn open_source(&self, path: &str);
}
