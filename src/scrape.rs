use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

// Quoted attribute values may contain `>`.
static INPUT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<input\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("valid input tag regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

/// Returns the `value` of the first `<input>` whose `name` is `name`.
///
/// Commented-out markup is ignored. An input without a `value` attribute
/// yields an empty string.
pub fn extract_form_field(html: &str, name: &str) -> Option<String> {
    let html: Cow<'_, str> = COMMENT.replace_all(html, "");
    INPUT_TAG.find_iter(&html).find_map(|tag| {
        let mut field_name = None;
        let mut value = None;
        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let attr = caps.get(2).or(caps.get(3)).or(caps.get(4));
            let attr = attr.map(|m| m.as_str()).unwrap_or_default();
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => field_name = Some(attr),
                "value" => value = Some(attr),
                _ => {}
            }
        }
        (field_name == Some(name)).then(|| decode_entities(value.unwrap_or_default()))
    })
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
