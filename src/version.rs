//! # Version Normalization
//!
//! Resolvers are not consistent about how they spell a release: the same
//! distribution may come back as `2022.02.1` on one run and `2022.2.1` on the
//! next. Both spellings are equal under PEP 440, so everything that compares
//! or renders versions goes through [`normalize_version`] first. Without it
//! the deduplicator would report conflicts between identical versions and
//! lockfiles would churn between runs.
//!
//! Only the numeric release segments (and the epoch) are touched. Pre-, post-,
//! dev- and local-version parts are kept verbatim.

/// Collapse redundant leading zeros in the epoch and release segments.
///
/// ```
/// use pip_compile_multi::version::normalize_version;
///
/// assert_eq!(normalize_version("2022.02.1"), "2022.2.1");
/// assert_eq!(normalize_version("1.02rc01"), "1.2rc01");
/// assert_eq!(normalize_version("01!1.0.post1"), "1!1.0.post1");
/// ```
pub fn normalize_version(version: &str) -> String {
    let version = version.trim();
    let (epoch, rest) = match version.split_once('!') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
            (Some(strip_leading_zeros(epoch)), rest)
        }
        _ => (None, version),
    };

    let release_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (release, suffix) = rest.split_at(release_end);

    let release = release
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                segment
            } else {
                strip_leading_zeros(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".");

    match epoch {
        Some(epoch) => format!("{}!{}{}", epoch, release, suffix),
        None => format!("{}{}", release, suffix),
    }
}

fn strip_leading_zeros(segment: &str) -> &str {
    let trimmed = segment.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Whether two version strings name the same release.
pub fn versions_match(left: &str, right: &str) -> bool {
    normalize_version(left) == normalize_version(right)
}

/// Remove a `.postN` suffix (and anything after it) from a version.
///
/// ```
/// use pip_compile_multi::version::drop_post;
///
/// assert_eq!(drop_post("1.2.3.post123"), "1.2.3");
/// assert_eq!(drop_post("1.2.3"), "1.2.3");
/// ```
pub fn drop_post(version: &str) -> &str {
    match version.find(".post") {
        Some(index) => &version[..index],
        None => version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_leading_zeros() {
        assert_eq!(normalize_version("2022.02.1"), "2022.2.1");
        assert_eq!(normalize_version("2022.2.1"), "2022.2.1");
        assert_eq!(normalize_version("00.000.10"), "0.0.10");
    }

    #[test]
    fn test_normalize_keeps_suffixes() {
        assert_eq!(normalize_version("1.0.post1"), "1.0.post1");
        assert_eq!(normalize_version("1.0.0a1"), "1.0.0a1");
        assert_eq!(normalize_version("1.0+ubuntu01"), "1.0+ubuntu01");
        assert_eq!(normalize_version("1.05.dev0"), "1.5.dev0");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_version(" 1.0 "), "1.0");
    }

    #[test]
    fn test_normalize_non_numeric_is_untouched() {
        assert_eq!(normalize_version("latest"), "latest");
        assert_eq!(normalize_version(""), "");
    }

    #[test]
    fn test_versions_match() {
        assert!(versions_match("2022.02.1", "2022.2.1"));
        assert!(!versions_match("1.0", "2.0"));
    }

    #[test]
    fn test_drop_post() {
        assert_eq!(drop_post("1.0.post7"), "1.0");
        assert_eq!(drop_post("1.0"), "1.0");
        assert_eq!(drop_post("1.0.post7.dev1"), "1.0");
    }
}
