use url::Url;

/// Build the content-security-policy for a webview document.
///
/// In bundled mode everything loads from the panel's own resource origin
/// and no connections are allowed. With a dev server, that server's origin
/// replaces the panel origin and websocket connections are allowed for
/// live reload.
pub fn content_security_policy(csp_source: &str, dev_server: Option<&Url>) -> String {
    let (origin, connect_src) = match dev_server {
        Some(url) => {
            let origin = url.origin().ascii_serialization();
            let connect = format!("'self' ws: {}", origin);
            (origin, connect)
        }
        None => (csp_source.to_string(), "'none'".to_string()),
    };

    format!(
        "default-src 'none'; connect-src {connect}; img-src {origin} https:; script-src {origin}; style-src {origin} 'unsafe-inline'; font-src 'self' data:;",
        connect = connect_src,
        origin = origin,
    )
}
