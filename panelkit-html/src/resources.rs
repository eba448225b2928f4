use std::path::{Path, PathBuf};

use panelkit_core::Panel;
use url::Url;

use crate::config::DocumentConfig;

/// Turns resource file names into URIs a panel may load.
pub trait ResourceLister {
    fn list(&self, dir: &Path, names: &[String]) -> Vec<Url>;
}

/// Resolves resources through the panel's own local-resource scheme.
pub struct PanelResources<'a> {
    panel: &'a dyn Panel,
}

impl<'a> PanelResources<'a> {
    pub fn new(panel: &'a dyn Panel) -> Self {
        Self { panel }
    }
}

impl ResourceLister for PanelResources<'_> {
    fn list(&self, dir: &Path, names: &[String]) -> Vec<Url> {
        names
            .iter()
            .filter(|name| {
                let ok = is_plain_resource_name(name);
                if !ok {
                    log::warn!("Skipping webview resource with unsafe name '{}'", name);
                }
                ok
            })
            .map(|name| self.panel.resolve_local_resource_uri(&dir.join(name)))
            .collect()
    }
}

/// Directories the host should let the panel read from.
pub fn local_resource_roots(extension_path: &Path, config: &DocumentConfig) -> Vec<PathBuf> {
    config
        .resource_roots
        .iter()
        .map(|root| extension_path.join(root))
        .collect()
}

fn is_plain_resource_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path.is_relative()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}
