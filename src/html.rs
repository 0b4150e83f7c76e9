//! Just enough HTML scanning for directory listings: rows, cells, anchors.
//! The file server emits flat, machine-generated tables, so regexes suffice.

use std::sync::LazyLock;

use regex::Regex;

static TBODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tbody\b[^>]*>(.*?)</tbody>").unwrap());
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]>").unwrap());
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").unwrap());
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: Option<String>,
    pub text: String,
    pub has_class: bool,
}

impl Anchor {
    fn parse(attrs: &str, inner: &str) -> Self {
        let href = HREF_RE.captures(attrs).and_then(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .or_else(|| c.get(3))
                .map(|m| decode_entities(m.as_str()))
        });
        Anchor {
            href,
            text: text_content(inner),
            has_class: has_class(attrs),
        }
    }
}

/// A `class` attribute with at least one class name; `data-class` and
/// `class=""` do not count.
fn has_class(attrs: &str) -> bool {
    CLASS_RE.captures(attrs).is_some_and(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .or_else(|| c.get(3))
            .is_some_and(|m| !m.as_str().trim().is_empty())
    })
}

/// Inner HTML of the table body, or the whole document when there is none.
pub fn table_body(html: &str) -> &str {
    TBODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

/// Inner HTML of every `<tr>`.
pub fn rows(html: &str) -> Vec<&str> {
    ROW_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Inner HTML of every `<td>`/`<th>` in a row.
pub fn cells(row: &str) -> Vec<&str> {
    CELL_RE
        .captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

pub fn anchors(html: &str) -> Vec<Anchor> {
    ANCHOR_RE
        .captures_iter(html)
        .map(|c| Anchor::parse(&c[1], &c[2]))
        .collect()
}

pub fn first_anchor(html: &str) -> Option<Anchor> {
    ANCHOR_RE
        .captures(html)
        .map(|c| Anchor::parse(&c[1], &c[2]))
}

/// Visible text: tags dropped, entities decoded, whitespace collapsed.
pub fn text_content(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
