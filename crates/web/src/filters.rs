//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Words kept by [`excerpt`].
const EXCERPT_WORDS: usize = 25;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// The first words of a description, with an ellipsis if anything was cut.
///
/// Usage in templates: `{{ description|excerpt }}`
#[askama::filter_fn]
pub fn excerpt(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(truncate_words(&value.to_string(), EXCERPT_WORDS))
}

/// Link to the listing of stores carrying a tag.
///
/// Usage in templates: `{{ tag|tag_href }}`
#[askama::filter_fn]
pub fn tag_href(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(tag_path(&value.to_string()))
}

pub(crate) fn tag_path(tag: &str) -> String {
    format!("/tags/{}", urlencoding::encode(tag))
}

fn truncate_words(text: &str, max: usize) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max).collect();
    let mut out = kept.join(" ");
    if words.next().is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("one  two three", 5), "one two three");
        assert_eq!(truncate_words("one two three", 2), "one two…");
        assert_eq!(truncate_words("", 2), "");
    }

    #[test]
    fn test_tag_path_is_encoded() {
        assert_eq!(tag_path("Wifi"), "/tags/Wifi");
        assert_eq!(tag_path("Open Late"), "/tags/Open%20Late");
    }
}
