//! Store tags: normalization and usage counts.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// A distinct tag and the number of stores carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Trim, drop blanks and remove duplicates, keeping first-seen order.
pub fn normalize<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_owned())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Count how many stores carry each tag.
///
/// Takes one tag list per store; a tag repeated within one store counts
/// once. Sorted by count descending, ties by tag ascending.
pub fn count<'a, I, T>(stores: I) -> Vec<TagCount>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = &'a String>,
{
    let mut counts: BTreeMap<&'a str, u64> = BTreeMap::new();
    for tags in stores {
        let distinct: HashSet<&'a str> = tags.into_iter().map(String::as_str).collect();
        for tag in distinct {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut out: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_owned(),
            count,
        })
        .collect();
    // Stable sort keeps the BTreeMap's alphabetical order within a count
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_count_exact_pairs_sorted_by_count() {
        let stores = [tags(&["a", "b"]), tags(&["a"]), tags(&["b", "c"])];
        let counts = count(stores.iter());

        assert_eq!(
            counts,
            vec![
                TagCount { tag: "a".into(), count: 2 },
                TagCount { tag: "b".into(), count: 2 },
                TagCount { tag: "c".into(), count: 1 },
            ]
        );
        assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_count_ignores_untagged_and_repeats() {
        let stores = [tags(&[]), tags(&["Wifi", "Wifi"]), tags(&["Wifi"])];
        let counts = count(stores.iter());
        assert_eq!(counts, vec![TagCount { tag: "Wifi".into(), count: 2 }]);
    }

    #[test]
    fn test_count_empty() {
        let stores: Vec<Vec<String>> = Vec::new();
        assert!(count(stores.iter()).is_empty());
    }

    #[test]
    fn test_normalize_trims_and_dedupes() {
        let out = normalize(["  Wifi ", "", "Vegan", "Wifi", "   "]);
        assert_eq!(out, vec!["Wifi".to_string(), "Vegan".to_string()]);
    }
}
