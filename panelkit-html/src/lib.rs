pub mod config;
pub mod csp;
pub mod document;
pub mod factory;
pub mod resources;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::DocumentConfig;
pub use factory::{build_document, DocumentPanelFactory, HostPanelOptions, PanelHost};
