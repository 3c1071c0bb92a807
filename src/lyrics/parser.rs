//! Lyrics text out of a Genius song page.

use regex::Regex;
use std::sync::LazyLock;

const CONTAINER_MARKER: &str = r#"data-lyrics-container="true""#;
const EXCLUDED_MARKER: &str = r#"data-exclude-from-selection="true""#;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

/// Text of every lyrics container on the page, joined by newlines.
/// `None` when the page has no lyrics (instrumentals, unreleased songs).
pub fn extract_lyrics(html: &str) -> Option<String> {
    let blocks: Vec<String> = lyrics_blocks(html)
        .into_iter()
        .map(|block| block_to_text(&strip_excluded(block)))
        .filter(|text| !text.is_empty())
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n"))
    }
}

fn lyrics_blocks(html: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = html;

    while let Some(marker) = rest.find(CONTAINER_MARKER) {
        let Some(tag_start) = rest[..marker].rfind('<') else {
            break;
        };
        let element = &rest[tag_start..];
        match div_inner(element) {
            Some((inner, consumed)) => {
                blocks.push(inner);
                rest = &element[consumed..];
            }
            None => break,
        }
    }

    blocks
}

/// `s` starts at an opening `<div ...>`. Returns the inner HTML up to the
/// matching `</div>` and how many bytes the whole element spans.
fn div_inner(s: &str) -> Option<(&str, usize)> {
    let open_end = s.find('>')? + 1;
    let mut depth = 1;
    let mut pos = open_end;

    loop {
        let close = pos + s[pos..].find("</div>")?;
        match s[pos..].find("<div").map(|o| pos + o) {
            Some(open) if open < close => {
                depth += 1;
                pos = open + "<div".len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[open_end..close], close + "</div>".len()));
                }
                pos = close + "</div>".len();
            }
        }
    }
}

/// Drop page furniture (contributor counts, headers) nested in a container.
fn strip_excluded(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    let mut rest = block;

    while let Some(marker) = rest.find(EXCLUDED_MARKER) {
        let Some(tag_start) = rest[..marker].rfind('<') else {
            break;
        };
        let element = &rest[tag_start..];
        let Some((_, consumed)) = div_inner(element) else {
            break;
        };
        out.push_str(&rest[..tag_start]);
        rest = &element[consumed..];
    }

    out.push_str(rest);
    out
}

fn block_to_text(block: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(block, "\n");
    let without_tags = TAG.replace_all(&with_breaks, "");
    decode_entities(&without_tags).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
