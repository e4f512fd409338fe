//! Label text utilities
//!
//! draw.io stores labels as HTML fragments when `html=1`. The engine works on
//! plain text and only produces markup when it writes the C4 label template.

use unicode_width::UnicodeWidthStr;

/// At 12px, 30 characters fit into 220 units of box width.
const BASE_FONT_SIZE: f64 = 12.0;
const BASE_CHARS: f64 = 30.0;
const BASE_WIDTH: f64 = 220.0;

/// Smallest font size still considered legible
pub const MIN_FONT_SIZE: u32 = 8;

/// Reduce an HTML label to plain text
///
/// Line-breaking tags become newlines, all other tags are dropped, entities
/// are decoded and blank lines are removed.
pub fn html_to_text(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for c in input.chars() {
        match (in_tag, c) {
            (false, '<') => {
                in_tag = true;
                tag.clear();
            }
            (true, '>') => {
                in_tag = false;
                let name: String = tag
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "br" | "div" | "p" | "li") {
                    text.push('\n');
                }
            }
            (true, c) => tag.push(c),
            (false, c) => text.push(c),
        }
    }
    if in_tag {
        // unterminated `<`: not markup after all
        text.push('<');
        text.push_str(&tag);
    }

    let decoded = htmlize::unescape(text);
    decoded
        .replace('\u{a0}', " ")
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim and collapse internal runs of whitespace into single spaces
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn a plain-text label into the HTML draw.io expects for `html=1` cells
///
/// Whitespace is normalized the same way [`html_to_text`] does, so
/// `html_to_text(&text_to_html(s))` equals `s` for any normalized label.
pub fn text_to_html(input: &str) -> String {
    input
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Split a plain-text label into its first line and the remaining lines
pub fn split_name(label: &str) -> (String, Option<String>) {
    let mut lines = label
        .lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty());
    let name = lines.next().unwrap_or_default();
    let rest: Vec<String> = lines.collect();
    if rest.is_empty() {
        (name, None)
    } else {
        (name, Some(rest.join(" ")))
    }
}

/// Display width of a label in units of the initial font size
pub fn label_width(text: &str, font_size: f64) -> f64 {
    let char_width = BASE_WIDTH / BASE_CHARS;
    text.width() as f64 * char_width * (font_size / BASE_FONT_SIZE)
}

/// Largest font size (at most `initial`) at which `text` fits into `target_width`
///
/// Never returns less than [`MIN_FONT_SIZE`].
pub fn fit_font_size(text: &str, initial: u32, target_width: f64) -> u32 {
    let columns = text.width();
    if columns == 0 || label_width(text, initial as f64) <= target_width {
        return initial;
    }
    let char_width = BASE_WIDTH / BASE_CHARS;
    let adjusted = (target_width / columns as f64) / char_width * BASE_FONT_SIZE;
    (adjusted.floor() as u32).clamp(MIN_FONT_SIZE, initial)
}
