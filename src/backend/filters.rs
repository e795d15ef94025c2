//! Filter documents for point lookups, tag queries and bulk cleaning.
//!
//! Tag matching runs directly against the record's unstructured tag array:
//! `$all` for superset (AND), `$in` for intersection (OR), `$nin` for
//! disjointness (NOT). A document without a `t` field behaves as the empty
//! set under all three operators, which is exactly the semantics the data
//! model requires.

use mongodb::bson::{doc, Bson, DateTime, Document};

use super::CleaningMode;

/// Point filter on the record id.
pub(crate) fn by_id(id: &str) -> Document {
    doc! { "_id": id }
}

fn tag_array(tags: &[String]) -> Bson {
    Bson::Array(tags.iter().map(|t| Bson::String(t.clone())).collect())
}

/// Records whose tag set contains every given tag.
pub(crate) fn tags_superset(tags: &[String]) -> Document {
    doc! { "t": { "$all": tag_array(tags) } }
}

/// Records whose tag set contains none of the given tags.
pub(crate) fn tags_disjoint(tags: &[String]) -> Document {
    doc! { "t": { "$nin": tag_array(tags) } }
}

/// Records whose tag set contains at least one of the given tags.
pub(crate) fn tags_intersect(tags: &[String]) -> Document {
    doc! { "t": { "$in": tag_array(tags) } }
}

/// Records whose expiry instant lies strictly before `now`.
///
/// Infinite-lifetime records carry a null `expires_at` and never match.
pub(crate) fn expired_before(now: DateTime) -> Document {
    doc! { "expires_at": { "$lt": now } }
}

/// Deletion filter for a cleaning mode.
pub(crate) fn cleaning_filter(mode: CleaningMode, tags: &[String], now: DateTime) -> Document {
    match mode {
        CleaningMode::All => Document::new(),
        CleaningMode::Old => expired_before(now),
        CleaningMode::MatchingTag => tags_superset(tags),
        CleaningMode::NotMatchingTag => tags_disjoint(tags),
        CleaningMode::MatchingAnyTag => tags_intersect(tags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn id_filter_targets_primary_key() {
        assert_eq!(by_id("k1"), doc! { "_id": "k1" });
    }

    #[test]
    fn superset_uses_all_operator() {
        assert_eq!(
            tags_superset(&tags(&["a", "b"])),
            doc! { "t": { "$all": ["a", "b"] } }
        );
    }

    #[test]
    fn disjoint_uses_nin_operator() {
        assert_eq!(
            tags_disjoint(&tags(&["a", "b"])),
            doc! { "t": { "$nin": ["a", "b"] } }
        );
    }

    #[test]
    fn intersect_uses_in_operator() {
        assert_eq!(
            tags_intersect(&tags(&["a", "b"])),
            doc! { "t": { "$in": ["a", "b"] } }
        );
    }

    #[test]
    fn cleaning_all_is_the_empty_filter() {
        let filter = cleaning_filter(CleaningMode::All, &[], DateTime::now());
        assert!(filter.is_empty());
    }

    #[test]
    fn cleaning_old_compares_expiry_to_now() {
        let now = DateTime::from_millis(1_000);
        assert_eq!(
            cleaning_filter(CleaningMode::Old, &[], now),
            doc! { "expires_at": { "$lt": now } }
        );
    }

    #[test]
    fn cleaning_tag_modes_reuse_tag_filters() {
        let given = tags(&["a"]);
        let now = DateTime::now();
        assert_eq!(cleaning_filter(CleaningMode::MatchingTag, &given, now), tags_superset(&given));
        assert_eq!(cleaning_filter(CleaningMode::NotMatchingTag, &given, now), tags_disjoint(&given));
        assert_eq!(
            cleaning_filter(CleaningMode::MatchingAnyTag, &given, now),
            tags_intersect(&given)
        );
    }
}
