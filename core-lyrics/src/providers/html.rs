//! HTML extraction helpers shared by the scraping providers.
//!
//! Lyrics pages are carved up with plain string scanning. The markers the
//! providers key on are stable attribute strings, not full document
//! structure, so a parser dependency is not needed here.

/// Content strictly between the first occurrence of `start` and the next
/// occurrence of `end` after it.
pub(crate) fn slice_between<'a>(html: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = html.find(start)? + start.len();
    let rest = &html[from..];
    let to = rest.find(end)?;
    Some(&rest[..to])
}

/// Inner body of every tag carrying `attr_marker`, up to `close_tag`.
///
/// For each occurrence of the marker the scan skips to the end of the
/// opening tag, then captures until the closing tag. Occurrences without
/// a closing tag are dropped.
pub(crate) fn tag_bodies<'a>(html: &'a str, attr_marker: &str, close_tag: &str) -> Vec<&'a str> {
    let mut bodies = Vec::new();
    let mut rest = html;

    while let Some(marker_at) = rest.find(attr_marker) {
        rest = &rest[marker_at + attr_marker.len()..];
        let Some(open_end) = rest.find('>') else {
            break;
        };
        let body_start = &rest[open_end + 1..];
        match body_start.find(close_tag) {
            Some(close_at) => {
                bodies.push(&body_start[..close_at]);
                rest = &body_start[close_at + close_tag.len()..];
            }
            None => break,
        }
    }

    bodies
}

/// First `href` attribute value containing `needle`.
pub(crate) fn first_href_containing<'a>(html: &'a str, needle: &str) -> Option<&'a str> {
    let mut rest = html;
    while let Some(at) = rest.find("href=\"") {
        rest = &rest[at + "href=\"".len()..];
        let end = rest.find('"')?;
        let href = &rest[..end];
        if href.contains(needle) {
            return Some(href);
        }
        rest = &rest[end + 1..];
    }
    None
}

/// Drop markup, turning `<br>` variants into line breaks.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(at) = rest.find('<') {
        result.push_str(&rest[..at]);
        rest = &rest[at + 1..];
        if rest.get(..2).map_or(false, |t| t.eq_ignore_ascii_case("br")) {
            result.push('\n');
        }
        match rest.find('>') {
            Some(end) => rest = &rest[end + 1..],
            None => return result,
        }
    }
    result.push_str(rest);
    result
}

/// Decode the handful of entities lyrics pages actually emit.
pub(crate) fn decode_entities(text: &str) -> String {
    // &amp; last so double-encoded text is not decoded twice
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Trim line ends and collapse blank-line runs to single stanza breaks.
pub(crate) fn tidy_lyrics(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_pending = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_pending = !lines.is_empty();
            continue;
        }
        if blank_pending {
            lines.push("");
            blank_pending = false;
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Full cleanup chain from raw HTML block to lyrics text.
pub(crate) fn html_to_text(html: &str) -> String {
    tidy_lyrics(&decode_entities(&strip_tags(html)))
}
