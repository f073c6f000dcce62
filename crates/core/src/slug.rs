//! URL slugs derived from display names.
//!
//! A store's slug is the lower-cased, hyphenated form of its name. When other
//! stores already own `base` or `base-N`, the new slug gets the next numeric
//! suffix so every slug stays unique.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when deriving a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The name contains no letters or digits to build a slug from.
    #[error("name must contain at least one letter or digit")]
    Empty,
}

/// A URL-safe identifier: `[a-z0-9]` runs joined by single hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive the base slug for a display name.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing slug-worthy remains.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(slug))
    }

    /// Wrap a slug read back from storage.
    #[must_use]
    pub fn from_stored(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the slug and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// `base-n`.
    #[must_use]
    pub fn with_suffix(&self, n: u64) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// POSIX regular expression matching this slug and its numeric variants.
    ///
    /// The base only ever contains `[a-z0-9-]`, none of which need escaping.
    /// Meant for case-insensitive matching (`~*` in Postgres).
    #[must_use]
    pub fn variant_pattern(&self) -> String {
        format!("^({})(-[0-9]+)?$", self.0)
    }

    /// Whether `candidate` is this slug or one of its `-N` variants,
    /// ignoring ASCII case. Same language as [`Self::variant_pattern`].
    #[must_use]
    pub fn is_variant(&self, candidate: &str) -> bool {
        self.variant_suffix(candidate).is_some()
    }

    /// The numeric suffix of a variant; the bare base counts as 1.
    fn variant_suffix(&self, candidate: &str) -> Option<u64> {
        let base_len = self.0.len();
        if candidate.len() < base_len
            || !candidate.is_char_boundary(base_len)
            || !candidate[..base_len].eq_ignore_ascii_case(&self.0)
        {
            return None;
        }

        let rest = &candidate[base_len..];
        if rest.is_empty() {
            return Some(1);
        }

        let digits = rest.strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Absurdly long suffixes saturate instead of failing the match
        Some(digits.parse().unwrap_or(u64::MAX))
    }

    /// Pick the slug to store given every existing slug in the collection.
    ///
    /// Non-variants in `existing` are ignored, so callers may pass either the
    /// pre-filtered result of a pattern query or a whole collection.
    ///
    /// - no variants: the base itself
    /// - `n` variants: `base-(n+1)`
    /// - if `base-(n+1)` is taken (a rename left a gap): one past the
    ///   highest suffix in use
    #[must_use]
    pub fn next_available<S: AsRef<str>>(&self, existing: &[S]) -> Self {
        let suffixes: Vec<u64> = existing
            .iter()
            .filter_map(|s| self.variant_suffix(s.as_ref()))
            .collect();

        if suffixes.is_empty() {
            return self.clone();
        }

        let candidate = suffixes.len() as u64 + 1;
        if !suffixes.contains(&candidate) {
            return self.with_suffix(candidate);
        }

        let highest = suffixes.iter().copied().max().unwrap_or(1);
        self.with_suffix(highest.saturating_add(1))
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lower-case and hyphenate a display name.
///
/// Runs of anything that is not an ASCII letter or digit collapse into one
/// hyphen; leading and trailing hyphens are trimmed. Common Latin accented
/// letters fold to their ASCII base first.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let mut buf = [0_u8; 4];
        let part: &str = if c.is_ascii_alphanumeric() {
            c.encode_utf8(&mut buf)
        } else {
            fold_latin(c)
        };

        if part.is_empty() {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.push_str(part);
    }

    slug
}

/// ASCII rendering of a lower-case non-ASCII letter, or `""` for separators.
fn fold_latin(c: char) -> &'static str {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ß' => "ss",
        'ś' | 'š' => "s",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ł' => "l",
        _ => "",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Wes's Coffee Shop"), "wes-s-coffee-shop");
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
        assert_eq!(slugify("Bagels & Co. 2"), "bagels-co-2");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Crème Brûlée Café"), "creme-brulee-cafe");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(Slug::from_name("  ???  "), Err(SlugError::Empty));
    }

    #[test]
    fn test_fresh_name_keeps_base() {
        let base = Slug::from_name("Coffee Bar").unwrap();
        let existing = ["tea-house", "coffee-bars", "coffee"];
        assert_eq!(base.next_available(&existing).as_str(), "coffee-bar");
    }

    #[test]
    fn test_k_variants_get_next_suffix() {
        let base = Slug::from_name("Coffee Bar").unwrap();
        let mut existing = vec!["coffee-bar".to_string()];
        for k in 2..=5 {
            let next = base.next_available(&existing);
            assert_eq!(next.as_str(), format!("coffee-bar-{k}"));
            existing.push(next.into_inner());
        }
    }

    #[test]
    fn test_variant_matching_is_case_insensitive() {
        let base = Slug::from_name("Coffee Bar").unwrap();
        assert!(base.is_variant("Coffee-Bar"));
        assert!(base.is_variant("coffee-bar-12"));
        assert!(!base.is_variant("coffee-bar-"));
        assert!(!base.is_variant("coffee-bar-x"));
        assert!(!base.is_variant("coffee-bars"));
        assert!(!base.is_variant("my-coffee-bar"));
    }

    #[test]
    fn test_gap_from_rename_skips_taken_suffix() {
        let base = Slug::from_name("Coffee Bar").unwrap();
        // `coffee-bar-2` was renamed away; two variants remain
        let existing = ["coffee-bar", "coffee-bar-3"];
        assert_eq!(base.next_available(&existing).as_str(), "coffee-bar-4");
    }

    #[test]
    fn test_variant_pattern() {
        let base = Slug::from_name("Coffee Bar").unwrap();
        assert_eq!(base.variant_pattern(), "^(coffee-bar)(-[0-9]+)?$");
    }
}
