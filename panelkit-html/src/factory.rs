use std::path::{Path, PathBuf};
use std::sync::Arc;

use panelkit_core::{ExtensionContext, Panel, PanelFactory, PanelOptions};

use crate::config::DocumentConfig;
use crate::csp::content_security_policy;
use crate::document::{render_document, DocumentParts};
use crate::resources::{local_resource_roots, PanelResources, ResourceLister};

/// What the host needs to open a bare panel. Placement (split pane or
/// fallback column) is left to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPanelOptions {
    pub view_type: String,
    pub title: String,
    pub enable_scripts: bool,
    pub retain_context_when_hidden: bool,
    pub local_resource_roots: Vec<PathBuf>,
}

/// The IDE side that actually creates panels.
pub trait PanelHost: Send + Sync {
    fn open_panel(&self, options: &HostPanelOptions) -> Result<Arc<dyn Panel>, String>;
}

/// Assemble the HTML document for `options` as served by `panel`.
pub fn build_document(
    panel: &dyn Panel,
    options: &PanelOptions,
    extension_path: &Path,
    config: &DocumentConfig,
) -> String {
    let bundled = || {
        panel
            .resolve_local_resource_uri(
                &extension_path
                    .join(&config.bundle_dir)
                    .join(&options.webview_js),
            )
            .to_string()
    };
    let main_script = match &config.dev_server {
        Some(dev) => match dev.join(&options.webview_js) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::warn!(
                    "Cannot address '{}' on dev server {}: {}; using bundled script",
                    options.webview_js,
                    dev,
                    e
                );
                bundled()
            }
        },
        None => bundled(),
    };

    let resources = PanelResources::new(panel);
    let scripts = resources.list(&extension_path.join(&config.script_dir), &options.scripts);
    let styles = resources.list(&extension_path.join(&config.style_dir), &options.styles);

    render_document(&DocumentParts {
        title: options.name.clone(),
        csp: content_security_policy(&panel.csp_source(), config.dev_server.as_ref()),
        main_script,
        scripts: scripts.iter().map(|u| u.to_string()).collect(),
        styles: styles.iter().map(|u| u.to_string()).collect(),
    })
}

/// Panel factory that opens a host panel and installs the webview document.
pub struct DocumentPanelFactory<H> {
    host: H,
    config: DocumentConfig,
}

impl<H: PanelHost> DocumentPanelFactory<H> {
    pub fn new(host: H, config: DocumentConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }
}

impl<H: PanelHost> PanelFactory for DocumentPanelFactory<H> {
    fn create_panel(
        &self,
        options: &PanelOptions,
        context: &ExtensionContext,
    ) -> Result<Arc<dyn Panel>, String> {
        let host_options = HostPanelOptions {
            view_type: options.id.clone(),
            title: options.name.clone(),
            enable_scripts: true,
            retain_context_when_hidden: options.retain_context_when_hidden,
            local_resource_roots: local_resource_roots(context.extension_path(), &self.config),
        };
        let panel = self.host.open_panel(&host_options)?;

        panel.set_title(&options.name);
        let html = build_document(
            panel.as_ref(),
            options,
            context.extension_path(),
            &self.config,
        );
        panel.set_html(&html);
        log::debug!(
            "Installed document for webview '{}' ({} bytes, dev mode: {})",
            options.id,
            html.len(),
            self.config.is_dev_mode()
        );
        Ok(panel)
    }
}
