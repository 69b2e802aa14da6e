use crate::model::{Classification, FileRecord};
use ahash::AHashMap;

/// Mark every record whose fingerprint was already seen earlier in the
/// slice as a duplicate of that first occurrence and give it its final
/// `Duplicate` classification. Returns the number of duplicates marked.
///
/// Canonicality follows slice order, which is scan order. Records without a
/// fingerprint never take part.
pub fn mark_duplicates(records: &mut [FileRecord]) -> usize {
    let mut first_seen: AHashMap<String, String> = AHashMap::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records.iter_mut() {
        let Some(fingerprint) = record.fingerprint.as_ref() else {
            continue;
        };

        match first_seen.get(fingerprint) {
            Some(canonical) => {
                record.duplicate_of = Some(canonical.clone());
                record.classification = Classification::Duplicate {
                    of: canonical.clone(),
                };
                duplicates += 1;
            }
            None => {
                first_seen.insert(
                    fingerprint.clone(),
                    record.path.to_string_lossy().into_owned(),
                );
                record.duplicate_of = None;
            }
        }
    }

    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::path::PathBuf;

    fn record(path: &str, fingerprint: Option<&str>) -> FileRecord {
        let mut r = FileRecord::new(PathBuf::from(path), 1, Local::now());
        r.fingerprint = fingerprint.map(str::to_string);
        r
    }

    #[test]
    fn test_first_occurrence_is_canonical() {
        let mut records = vec![
            record("/src/b.jpg", Some("aa")),
            record("/src/a.jpg", Some("aa")),
            record("/src/c.jpg", Some("aa")),
        ];
        assert_eq!(mark_duplicates(&mut records), 2);
        assert!(!records[0].is_duplicate());
        assert_eq!(records[1].duplicate_of.as_deref(), Some("/src/b.jpg"));
        assert_eq!(records[2].duplicate_of.as_deref(), Some("/src/b.jpg"));
    }

    #[test]
    fn test_duplicates_are_classified_by_the_pre_pass() {
        let mut records = vec![record("/src/a.jpg", Some("aa")), record("/src/b.jpg", Some("aa"))];
        mark_duplicates(&mut records);

        assert_eq!(records[0].classification, Classification::Unclassified);
        assert_eq!(
            records[1].classification,
            Classification::Duplicate {
                of: "/src/a.jpg".to_string()
            }
        );
    }

    #[test]
    fn test_distinct_fingerprints_are_not_duplicates() {
        let mut records = vec![record("/a", Some("1")), record("/b", Some("2"))];
        assert_eq!(mark_duplicates(&mut records), 0);
        assert!(records.iter().all(|r| !r.is_duplicate()));
    }

    #[test]
    fn test_missing_fingerprints_are_ignored() {
        let mut records = vec![record("/a", None), record("/b", None)];
        assert_eq!(mark_duplicates(&mut records), 0);
    }

    #[test]
    fn test_multiple_groups() {
        let mut records = vec![
            record("/1", Some("x")),
            record("/2", Some("y")),
            record("/3", Some("x")),
            record("/4", Some("y")),
        ];
        assert_eq!(mark_duplicates(&mut records), 2);
        assert_eq!(records[2].duplicate_of.as_deref(), Some("/1"));
        assert_eq!(records[3].duplicate_of.as_deref(), Some("/2"));
    }
}
