// src/utils/html.rs

/// Sanitise admin-authored text before it is stored.
///
/// Whitelist-based: safe inline tags survive, `<script>`, `<iframe>` and event
/// attributes are stripped. Question text and names end up rendered inside the
/// student and faculty dashboards, so nothing is stored raw.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}

/// Like [`clean_html`] for optional fields; blank input becomes `None`.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(clean_html)
        .filter(|s| !s.is_empty())
}
