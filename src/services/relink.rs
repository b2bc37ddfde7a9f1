use once_cell::sync::Lazy;
use regex::Regex;

/// Rewrites OCR image placeholders `![id](id)` into local links `![[name]]`.
///
/// `mapping` is applied in order. Identifiers without a mapping are left as
/// they are. A rewritten link never matches a placeholder again, so running
/// this twice gives the same text as running it once.
pub fn relink_images(markdown: &str, mapping: &[(String, String)]) -> String {
    mapping
        .iter()
        .fold(markdown.to_string(), |text, (original_id, new_name)| {
            text.replace(&placeholder(original_id), &local_link(new_name))
        })
}

pub fn placeholder(id: &str) -> String {
    format!("![{}]({})", id, id)
}

pub fn local_link(file_name: &str) -> String {
    format!("![[{}]]", file_name)
}

static RE_LOCAL_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[\[(.*?)\]\]").unwrap());

/// Targets of every `![[name]]` in `text`, in order of appearance.
pub fn local_links(text: &str) -> Vec<&str> {
    RE_LOCAL_LINK
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}
