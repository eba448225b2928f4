use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable naming a local dev server (e.g. `http://localhost:9000`)
/// that serves the webview bundle with live reload.
pub const DEV_SERVER_ENV: &str = "PANELKIT_DEV_SERVER";

/// Extension-local override file, relative to the extension root.
pub const PROJECT_CONFIG_FILE: &str = ".panelkit.json";

/// How webview documents are assembled. Resolved once at startup and
/// handed to the panel factory.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentConfig {
    pub dev_server: Option<Url>,
    pub bundle_dir: String,
    pub script_dir: String,
    pub style_dir: String,
    pub resource_roots: Vec<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct DocumentConfigOverrides {
    dev_server: Option<String>,
    bundle_dir: Option<String>,
    script_dir: Option<String>,
    style_dir: Option<String>,
    resource_roots: Option<Vec<String>>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            dev_server: None,
            bundle_dir: "dist".into(),
            script_dir: "js".into(),
            style_dir: "css".into(),
            resource_roots: ["lib", "js", "css", "dist", "resources"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DocumentConfig {
    /// Resolve config from the global file, the extension-local file and
    /// the process environment.
    pub fn from_env(extension_root: &Path) -> Self {
        Self::from_lookup(extension_root, global_config_path(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Like [`DocumentConfig::from_env`] but with the global config path and
    /// environment passed in.
    pub fn from_lookup<F>(extension_root: &Path, global_path: Option<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = global_path {
            cfg.apply_file(&path, /* trusted */ true);
        }
        // Extensions ship this file, so it may only move directories around
        cfg.apply_file(&extension_root.join(PROJECT_CONFIG_FILE), /* trusted */ false);

        if let Some(raw) = lookup(DEV_SERVER_ENV) {
            if raw.trim().is_empty() {
                cfg.dev_server = None;
            } else {
                cfg.set_dev_server(&raw);
            }
        }

        if let Some(url) = &cfg.dev_server {
            log::info!("Webview documents will load from dev server {}", url);
        }
        cfg
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_server.is_some()
    }

    fn set_dev_server(&mut self, raw: &str) {
        match Url::parse(raw.trim()) {
            Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
                // Scripts are joined onto this URL, which drops a last path
                // segment without a trailing slash
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                self.dev_server = Some(url);
            }
            Ok(url) => log::warn!(
                "Ignoring dev server '{}': unsupported scheme '{}'",
                raw,
                url.scheme()
            ),
            Err(e) => log::warn!("Ignoring invalid dev server URL '{}': {}", raw, e),
        }
    }

    fn apply_file(&mut self, path: &Path, trusted: bool) {
        let contents = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return,
        };
        let overrides = match serde_json::from_str::<DocumentConfigOverrides>(&contents) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Invalid webview config at {}: {}", path.display(), e);
                return;
            }
        };

        if let Some(dev_server) = overrides.dev_server {
            if trusted {
                self.set_dev_server(&dev_server);
            } else {
                log::warn!(
                    "Extension config {} tried to set a dev server; ignoring (only global config or {} can)",
                    path.display(),
                    DEV_SERVER_ENV
                );
            }
        }
        for (field, value) in [
            (&mut self.bundle_dir, overrides.bundle_dir),
            (&mut self.script_dir, overrides.script_dir),
            (&mut self.style_dir, overrides.style_dir),
        ] {
            if let Some(v) = value.filter(|v| is_relative_dir(v)) {
                *field = v;
            }
        }
        if let Some(roots) = overrides.resource_roots {
            let roots: Vec<String> = roots.into_iter().filter(|r| is_relative_dir(r)).collect();
            if !roots.is_empty() {
                self.resource_roots = roots;
            }
        }
    }
}

// Resource directories must stay inside the extension
fn is_relative_dir(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.trim().is_empty()
        && path.is_relative()
        && !path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("panelkit").join("webview.json"))
}
