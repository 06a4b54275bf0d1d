//! Property-based tests for name, version and path normalization.
//!
//! Deduplication and conflict detection compare normalized values, so these
//! functions must be idempotent and agree on equivalent spellings.

#[cfg(test)]
mod proptest_tests {
    use std::path::{Path, PathBuf};

    use crate::dependency::canonical_name;
    use crate::path::{fix_reference_path, normalize_path};
    use crate::version::{drop_post, normalize_version, versions_match};
    use proptest::prelude::*;

    // ============================================================================
    // canonical_name
    // ============================================================================

    proptest! {
        #[test]
        fn canonical_name_is_idempotent(name in "[A-Za-z0-9][A-Za-z0-9._-]{0,20}") {
            let once = canonical_name(&name);
            prop_assert_eq!(canonical_name(&once), once);
        }

        #[test]
        fn canonical_name_ignores_case_and_separators(
            words in prop::collection::vec("[a-z0-9]{1,6}", 1..4),
            separators in prop::collection::vec("[-_.]{1,2}", 3),
        ) {
            let dashed = words.join("-");
            let mut mixed = String::new();
            for (index, word) in words.iter().enumerate() {
                if index > 0 {
                    mixed.push_str(&separators[(index - 1) % separators.len()]);
                }
                mixed.push_str(&word.to_uppercase());
            }
            prop_assert_eq!(canonical_name(&mixed), canonical_name(&dashed));
        }

        #[test]
        fn canonical_name_drops_extras(name in "[a-z][a-z0-9]{0,10}", extra in "[a-z]{1,8}") {
            prop_assert_eq!(canonical_name(&format!("{}[{}]", name, extra)), canonical_name(&name));
        }
    }

    // ============================================================================
    // versions
    // ============================================================================

    proptest! {
        #[test]
        fn normalize_version_is_idempotent(version in "[0-9]{1,4}(\\.[0-9]{1,4}){0,3}(rc[0-9]|\\.post[0-9]|\\.dev[0-9])?") {
            let once = normalize_version(&version);
            prop_assert_eq!(normalize_version(&once), once);
        }

        #[test]
        fn leading_zeros_do_not_change_the_release(
            segments in prop::collection::vec(0u32..1000, 1..4),
            padding in 0usize..3,
        ) {
            let plain = segments.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
            let padded = segments
                .iter()
                .map(|segment| format!("{}{}", "0".repeat(padding), segment))
                .collect::<Vec<_>>()
                .join(".");
            prop_assert!(versions_match(&plain, &padded));
            prop_assert_eq!(normalize_version(&padded), plain);
        }

        #[test]
        fn drop_post_removes_post_release(release in "[1-9][0-9]{0,2}(\\.[0-9]{1,3}){0,2}", post in 0u32..1000) {
            let with_post = format!("{}.post{}", release, post);
            prop_assert_eq!(drop_post(&with_post), release.as_str());
            prop_assert_eq!(drop_post(&release), release.as_str());
        }
    }

    // ============================================================================
    // paths
    // ============================================================================

    proptest! {
        #[test]
        fn normalize_path_is_idempotent(parts in prop::collection::vec("(\\.|\\.\\.|[a-z]{1,5})", 1..6)) {
            let path: PathBuf = parts.iter().collect();
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once);
        }

        #[test]
        fn normalize_path_removes_current_dir(parts in prop::collection::vec("[a-z]{1,5}", 1..5)) {
            let plain: PathBuf = parts.iter().collect();
            let dotted: PathBuf = parts.iter().flat_map(|part| [".", part.as_str()]).collect();
            prop_assert_eq!(normalize_path(&dotted), plain);
        }

        #[test]
        fn sibling_reference_stays_in_directory(dir in "[a-z]{1,5}", file in "[a-z]{1,5}", target in "[a-z]{1,5}") {
            let origin = Path::new(&dir).join(format!("{}.in", file));
            let resolved = fix_reference_path(&origin, &format!("{}.in", target));
            prop_assert_eq!(resolved, Path::new(&dir).join(format!("{}.in", target)));
        }
    }
}
