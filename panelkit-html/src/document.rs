/// Everything that varies between webview documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub title: String,
    pub csp: String,
    pub main_script: String,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

/// Render the single HTML page injected into a panel.
///
/// Styles go in the head; extra scripts load before the main bundle, which
/// mounts into `#root`.
pub fn render_document(parts: &DocumentParts) -> String {
    let styles: String = parts
        .styles
        .iter()
        .map(|href| format!("<link rel=\"stylesheet\" href=\"{}\">\n", escape_html(href)))
        .collect();
    let scripts: String = parts
        .scripts
        .iter()
        .map(|src| format!("<script src=\"{}\"></script>\n", escape_html(src)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="Content-Security-Policy" content="{csp}">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
{styles}</head>
<body>
<div id="root"></div>
{scripts}<script src="{main}"></script>
</body>
</html>"#,
        csp = escape_html(&parts.csp),
        title = escape_html(&parts.title),
        styles = styles,
        scripts = scripts,
        main = escape_html(&parts.main_script),
    )
}

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
