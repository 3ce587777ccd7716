//! Ordered, de-duplicated tag merging.

use std::collections::HashSet;

use super::SENTINEL_TAG;

/// Merges tag groups in order, keeping the first occurrence of each tag.
///
/// Blank tags, the `excluded` tag and the processed sentinel are dropped; the
/// sentinel is appended last exactly once.
#[must_use]
pub(crate) fn merge_with_sentinel<'a, I>(groups: I, excluded: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();

    for tag in groups.into_iter().flatten() {
        let tag = tag.trim();
        if tag.is_empty() || tag == excluded || tag == SENTINEL_TAG {
            continue;
        }
        if seen.insert(tag) {
            merged.push(tag.to_string());
        }
    }

    merged.push(SENTINEL_TAG.to_string());
    merged
}

/// Merges two tag lists without the sentinel, keeping first occurrences.
#[must_use]
pub(crate) fn union(first: &[String], second: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    first
        .iter()
        .chain(second)
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty() && seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_merge_keeps_first_occurrence_order() {
        let merged = merge_with_sentinel(
            [tags(&["b", "a"]).as_slice(), tags(&["a", "c"]).as_slice()],
            "tagme",
        );
        assert_eq!(merged, tags(&["b", "a", "c", SENTINEL_TAG]));
    }

    #[test]
    fn test_merge_drops_excluded_and_blank() {
        let merged = merge_with_sentinel([tags(&["tagme", " ", "x"]).as_slice()], "tagme");
        assert_eq!(merged, tags(&["x", SENTINEL_TAG]));
    }

    #[test]
    fn test_merge_sentinel_appears_once_at_end() {
        let merged = merge_with_sentinel([tags(&[SENTINEL_TAG, "y"]).as_slice()], "tagme");
        assert_eq!(merged, tags(&["y", SENTINEL_TAG]));
    }

    #[test]
    fn test_union_dedupes() {
        assert_eq!(
            union(&tags(&["a", "b"]), &tags(&["b", "c"])),
            tags(&["a", "b", "c"])
        );
    }
}
