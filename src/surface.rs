//! Keyed cache of HTML rendering surfaces (host-side webview panels).
//!
//! At most one surface exists per key: a repeated `show` replaces the HTML of
//! the existing surface and brings it to the foreground instead of opening a
//! duplicate panel. When the user closes a panel the host reports it through
//! [`RenderSurfaceManager::close`], which evicts the key so the next `show`
//! recreates it.

use std::collections::HashMap;
use std::sync::Mutex;

/// What the host must do in reaction to a `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// No surface existed for this key; the host should create a panel.
    Created,
    /// An existing surface was updated; the host should reveal its panel.
    Revealed,
}

struct RenderSurface {
    title: String,
    html: String,
}

type ShowListener = Box<dyn Fn(&str, ShowOutcome) + Send>;

#[derive(Default)]
pub struct RenderSurfaceManager {
    surfaces: Mutex<HashMap<String, RenderSurface>>,
    listeners: Mutex<Vec<ShowListener>>,
}

impl RenderSurfaceManager {
    pub fn new() -> Self {
        RenderSurfaceManager::default()
    }

    /// Create or update the surface for `key`. Never blocks on host-side
    /// rendering; the host reacts to the listener callback.
    pub fn show(&self, key: &str, title: &str, html: impl Into<String>) -> ShowOutcome {
        let outcome = {
            let mut surfaces = self.surfaces.lock().unwrap();
            match surfaces.get_mut(key) {
                Some(surface) => {
                    surface.html = html.into();
                    surface.title = title.to_string();
                    ShowOutcome::Revealed
                }
                None => {
                    surfaces.insert(
                        key.to_string(),
                        RenderSurface {
                            title: title.to_string(),
                            html: html.into(),
                        },
                    );
                    ShowOutcome::Created
                }
            }
        };

        for listener in self.listeners.lock().unwrap().iter() {
            listener(key, outcome);
        }
        outcome
    }

    /// Eviction callback for external closure of the panel behind `key`.
    pub fn close(&self, key: &str) {
        self.surfaces.lock().unwrap().remove(key);
    }

    pub fn html(&self, key: &str) -> Option<String> {
        self.surfaces
            .lock()
            .unwrap()
            .get(key)
            .map(|surface| surface.html.clone())
    }

    pub fn title(&self, key: &str) -> Option<String> {
        self.surfaces
            .lock()
            .unwrap()
            .get(key)
            .map(|surface| surface.title.clone())
    }

    pub fn len(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.lock().unwrap().is_empty()
    }

    pub fn subscribe(&self, listener: impl Fn(&str, ShowOutcome) + Send + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }
}
