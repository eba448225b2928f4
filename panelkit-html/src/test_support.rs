use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use panelkit_core::host::MessageListener;
use panelkit_core::{Disposable, MessageChannel, Panel};
use parking_lot::Mutex;
use url::Url;

use crate::factory::{HostPanelOptions, PanelHost};

#[derive(Default)]
pub(crate) struct SilentChannel {
    listeners: Mutex<Vec<MessageListener>>,
}

impl MessageChannel for SilentChannel {
    fn post_message(&self, _message: serde_json::Value) -> Result<(), String> {
        Ok(())
    }

    fn on_message(&self, listener: MessageListener) -> Disposable {
        self.listeners.lock().push(listener);
        Disposable::empty()
    }
}

pub(crate) struct FakePanel {
    id: String,
    channel: Arc<SilentChannel>,
    dispose_listeners: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    disposed: AtomicBool,
    title: Mutex<String>,
    html: Mutex<String>,
}

impl FakePanel {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            channel: Arc::new(SilentChannel::default()),
            dispose_listeners: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            title: Mutex::new(String::new()),
            html: Mutex::new(String::new()),
        })
    }

    pub(crate) fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub(crate) fn html(&self) -> String {
        self.html.lock().clone()
    }

    /// Simulate the user closing the tab.
    pub(crate) fn close(&self) {
        self.dispose();
    }
}

impl Panel for FakePanel {
    fn on_dispose(&self, listener: Box<dyn FnOnce() + Send>) -> Disposable {
        self.dispose_listeners.lock().push(listener);
        Disposable::empty()
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained: Vec<_> = self.dispose_listeners.lock().drain(..).collect();
        for listener in drained {
            listener();
        }
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    fn set_html(&self, html: &str) {
        *self.html.lock() = html.to_string();
    }

    fn channel(&self) -> Arc<dyn MessageChannel> {
        self.channel.clone()
    }

    fn resolve_local_resource_uri(&self, path: &Path) -> Url {
        Url::parse(&format!("panel-resource://{}{}", self.id, path.to_string_lossy()))
            .expect("valid resource url")
    }

    fn csp_source(&self) -> String {
        format!("panel-resource://{}", self.id)
    }
}

type Opened = Arc<Mutex<Vec<(HostPanelOptions, Arc<FakePanel>)>>>;

#[derive(Clone, Default)]
pub(crate) struct FakeHost {
    fail: bool,
    opened: Opened,
}

impl FakeHost {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn opened(&self) -> Vec<(HostPanelOptions, Arc<FakePanel>)> {
        self.opened.lock().clone()
    }
}

impl PanelHost for FakeHost {
    fn open_panel(&self, options: &HostPanelOptions) -> Result<Arc<dyn Panel>, String> {
        if self.fail {
            return Err("no window available".to_string());
        }
        let panel = FakePanel::new(&options.view_type);
        self.opened.lock().push((options.clone(), panel.clone()));
        Ok(panel)
    }
}
