use std::sync::atomic::{AtomicBool, Ordering};

use crate::session::collaborators::{
    Environment, FullscreenCallback, Listeners, Subscription, VisibilityCallback,
};

/// Server-side stand-in for the student's browser. The browser reports its
/// visibility and fullscreen events over HTTP and the routes replay them here.
#[derive(Default)]
pub struct BrowserEnvironment {
    visibility: Listeners<()>,
    fullscreen: Listeners<bool>,
    fullscreen_requested: AtomicBool,
}

impl BrowserEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_visibility_hidden(&self) {
        self.visibility.emit(());
    }

    pub fn report_fullscreen_change(&self, is_fullscreen: bool) {
        self.fullscreen.emit(is_fullscreen);
    }

    /// Whether the browser has been told to enter fullscreen.
    pub fn fullscreen_requested(&self) -> bool {
        self.fullscreen_requested.load(Ordering::SeqCst)
    }
}

impl Environment for BrowserEnvironment {
    fn request_fullscreen(&self) -> bool {
        // The start response carries the instruction; the browser reports
        // back through `report_fullscreen_change` if it could not comply.
        self.fullscreen_requested.store(true, Ordering::SeqCst);
        true
    }

    fn on_visibility_hidden(&self, callback: VisibilityCallback) -> Subscription {
        self.visibility.add(move |()| callback())
    }

    fn on_fullscreen_change(&self, callback: FullscreenCallback) -> Subscription {
        self.fullscreen.add(move |is_fullscreen| callback(is_fullscreen))
    }
}
