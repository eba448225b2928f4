pub mod descriptor;
pub mod disposable;
pub mod emitter;
pub mod host;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod webview;

#[cfg(test)]
pub(crate) mod test_support;

pub use descriptor::{EventDescriptor, WebviewDescriptor};
pub use disposable::Disposable;
pub use emitter::EventEmitter;
pub use host::{
    ExtensionContext, MessageChannel, Panel, PanelFactory, PanelOptions, ProtocolServer,
};
pub use protocol::{CommandTable, LiveProtocol, Protocol};
pub use rpc::JsonRpcServer;
pub use session::{PendingResult, SessionState};
pub use webview::{compile, WebviewClass, WebviewInstance};
