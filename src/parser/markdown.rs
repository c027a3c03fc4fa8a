//! Rich message HTML to Markdown.

/// Convert the inner HTML of a message body to Markdown.
///
/// Telegram separates lines with `<br/>`; those become plain newlines rather
/// than Markdown hard breaks so the text stays readable as-is.
#[must_use]
pub fn to_markdown(inner_html: &str) -> String {
    let markdown = html2md::parse_html(inner_html);
    markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
