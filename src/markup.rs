//! Description markup scrubbing
//!
//! Source descriptions are written with reStructuredText roles. Emitted
//! schemas carry plain text with Markdown links instead.

use regex::Regex;
use std::sync::OnceLock;

fn ref_role_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":ref:`(.*?)(\s?<.*>)?`").unwrap())
}

fn named_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`(.*?)\s?<(.*)>`_").unwrap())
}

/// Convert ``:ref:`Name <target>` `` to `Name`, `` `text <url>`_ `` to
/// `[text](url)`, and newlines to spaces
pub fn scrub_markup(text: &str) -> String {
    let text = ref_role_re().replace_all(text, "$1");
    let text = named_link_re().replace_all(&text, "[$1]($2)");
    text.replace('\n', " ")
}
