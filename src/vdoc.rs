//! In-memory store of synthetic text documents.
//!
//! Custom-request results that should open as read-only editor documents
//! (JSON dumps, metadata, the breakpoint-bindings report) live here, keyed by
//! a `cfbridge://` URI. The host's text-document provider resolves those URIs
//! against this store and re-reads on every change notification.

use std::collections::HashMap;
use std::sync::Mutex;

type ChangeListener = Box<dyn Fn(&str) + Send>;

struct Document {
    content: String,
    version: u64,
}

#[derive(Default)]
pub struct VirtualDocumentStore {
    docs: Mutex<HashMap<String, Document>>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl VirtualDocumentStore {
    pub fn new() -> Self {
        VirtualDocumentStore::default()
    }

    /// Upsert `content` under `uri` and fire exactly one change notification.
    pub fn put(&self, uri: &str, content: impl Into<String>) {
        {
            let mut docs = self.docs.lock().unwrap();
            docs.entry(uri.to_string())
                .and_modify(|doc| doc.version += 1)
                .or_insert(Document { content: String::new(), version: 1 })
                .content = content.into();
        }

        for listener in self.listeners.lock().unwrap().iter() {
            listener(uri);
        }
    }

    /// Lookup; unknown URIs yield `None`, never an error.
    pub fn get(&self, uri: &str) -> Option<String> {
        self.docs
            .lock()
            .unwrap()
            .get(uri)
            .map(|doc| doc.content.clone())
    }

    pub fn version(&self, uri: &str) -> Option<u64> {
        self.docs.lock().unwrap().get(uri).map(|doc| doc.version)
    }

    /// Register a change listener, called with the URI on every `put`.
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_put_replaces_and_notifies_once_each() {
        let store = VirtualDocumentStore::new();
        let notifications = Arc::new(AtomicUsize::new(0));
        store.subscribe({
            let notifications = notifications.clone();
            move |uri| {
                assert_eq!(uri, "u");
                notifications.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.put("u", "a");
        store.put("u", "b");

        assert_eq!(store.get("u").as_deref(), Some("b"));
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
        assert_eq!(store.version("u"), Some(2));
    }

    #[test]
    fn test_get_unknown_uri_is_none() {
        let store = VirtualDocumentStore::new();
        assert_eq!(store.get("cfbridge://nope"), None);
        assert_eq!(store.version("cfbridge://nope"), None);
    }
}
