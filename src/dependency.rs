//! # Dependency Records
//!
//! Parsing and canonical rendering of one *section* of resolver output. A
//! section is a logical requirement line (backslash continuations already
//! joined) plus the indented comment lines that follow it, as produced by
//! [`crate::lockfile::sections`].
//!
//! ## Shapes
//!
//! Sections are matched against three shapes, in priority order:
//!
//! 1. **VCS egg reference**: `[-e] git+https://host/repo.git@ref#egg=name`
//! 2. **Direct URL reference** (PEP 508): `name[extras] @ https://host/pkg.whl`
//! 3. **Regular pin**: `name[extras]==version [; markers] [--hash=...] [# comment]`
//!
//! Anything else (blank lines, standalone comments, `--index-url` options)
//! becomes [`Dependency::Opaque`] and is passed through unchanged.
//!
//! ## Rendering
//!
//! Rendering is deterministic so that re-running the tool on unchanged input
//! produces byte-identical lockfiles:
//!
//! ```
//! use pip_compile_multi::dependency::{Dependency, Operator};
//!
//! let dep = Dependency::parse("six==1.0    # via pkg");
//! assert_eq!(dep.serialize(Operator::Exact), "six==1.0                  # via pkg");
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::version::{drop_post, normalize_version};

/// Column at which inline comments start for pins without hashes.
pub const COMMENT_JUSTIFICATION: usize = 26;

const CONTINUATION: &str = " \\\n    ";
const COMMENT_INDENT: &str = "    ";

static RE_VCS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<editable>-e)\s+)?(?P<url>\S+#egg=(?P<package>[a-z0-9_.\-]+)\S*)(?:\s+(?P<comment>#.*))?$",
    )
    .expect("VCS dependency pattern is valid")
});

static RE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<package>[A-Za-z0-9][A-Za-z0-9._\-]*(?:\[[^\]]*\])?)\s*@\s*(?P<url>\S+)(?:\s*;\s*(?P<markers>[^#]*?))?\s*(?P<hashes>(?:--hash[=\s]\S+\s*)+)?(?P<comment>#.*)?$",
    )
    .expect("URL dependency pattern is valid")
});

static RE_PIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<package>[A-Za-z0-9][A-Za-z0-9._\-]*(?:\[[^\]]*\])?)\s*(?:==|~=)\s*(?P<version>[^\s;#\\]+)(?:\s*;\s*(?P<markers>[^#]*?))?\s*(?P<hashes>(?:--hash[=\s]\S+\s*)+)?(?P<comment>#.*)?$",
    )
    .expect("pinned dependency pattern is valid")
});

static RE_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--hash[=\s](\S+)").expect("hash pattern is valid"));

static RE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

static RE_VIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*via$").expect("via pattern is valid"));

static RE_CONSTRAINT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+-c \S+$").expect("constraint comment pattern is valid"));

static RE_PACKAGE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s+((?:-r )?\S+)$").expect("package comment pattern is valid")
});

/// Canonical identity of a package name: extras removed, lowercased, and
/// runs of `-`, `_` and `.` collapsed to a single `-`.
///
/// ```
/// use pip_compile_multi::dependency::canonical_name;
///
/// assert_eq!(canonical_name("Zope.Interface"), "zope-interface");
/// assert_eq!(canonical_name("zope_interface"), "zope-interface");
/// assert_eq!(canonical_name("celery[redis]"), "celery");
/// ```
pub fn canonical_name(name: &str) -> String {
    let base = match name.find('[') {
        Some(index) => &name[..index],
        None => name,
    };
    RE_SEPARATORS
        .replace_all(base.trim(), "-")
        .to_lowercase()
}

/// Version constraint operator written for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Exact,
    /// `~=`, used for soft-pinned internal packages.
    Compatible,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Exact => "==",
            Operator::Compatible => "~=",
        }
    }
}

/// Comment block attached to a dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    /// Comment on the requirement line itself, e.g. `# via pkg`.
    pub inline: Option<String>,
    /// Comment lines following the requirement, trimmed.
    pub lines: Vec<String>,
}

impl Comment {
    fn new(inline: Option<&str>, lines: &[&str]) -> Self {
        Self {
            inline: inline
                .map(str::trim)
                .filter(|comment| !comment.is_empty())
                .map(str::to_string),
            lines: lines
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_none() && self.lines.is_empty()
    }

    /// Remove `-c <file>` entries from a `# via` block and fold a single
    /// remaining entry onto the `# via` line.
    pub fn skip_constraints(&mut self) {
        if self.lines.len() < 2 || !RE_VIA.is_match(&self.lines[0]) {
            return;
        }
        let mut kept = vec![self.lines[0].clone()];
        kept.extend(
            self.lines[1..]
                .iter()
                .filter(|line| !RE_CONSTRAINT_COMMENT.is_match(line))
                .cloned(),
        );
        if kept.len() == 2 {
            if let Some(captures) = RE_PACKAGE_COMMENT.captures(&kept[1]) {
                kept = vec![format!("{} {}", kept[0], &captures[1])];
            }
        }
        self.lines = kept;
    }

    fn render_lines(&self, out: &mut String) {
        for line in &self.lines {
            out.push('\n');
            out.push_str(COMMENT_INDENT);
            out.push_str(line);
        }
    }
}

/// A regular `name==version` pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Package name as written, including extras.
    pub package: String,
    pub version: String,
    pub markers: Option<String>,
    /// Hash tokens in `--hash=algo:digest` form.
    pub hashes: Vec<String>,
    pub comment: Comment,
}

/// A VCS or archive URL carrying its name in an `#egg=` fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsReference {
    pub editable: bool,
    pub url: String,
    pub package: String,
    pub comment: Comment,
}

/// A PEP 508 direct reference, `name @ url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReference {
    pub package: String,
    pub url: String,
    pub markers: Option<String>,
    pub hashes: Vec<String>,
    pub comment: Comment,
}

/// One parsed section of resolver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Pin(Pin),
    Vcs(VcsReference),
    Url(UrlReference),
    /// Unrecognized text, rendered back verbatim.
    Opaque(String),
}

impl Dependency {
    /// Parse a section: the first line is the requirement, the remaining
    /// lines are its comment block.
    pub fn parse(section: &str) -> Self {
        let mut lines = section.lines();
        let head = lines.next().unwrap_or("").trim();
        let rest: Vec<&str> = lines.collect();
        if rest.iter().any(|line| !line.trim().is_empty() && !line.trim().starts_with('#')) {
            return Dependency::Opaque(section.to_string());
        }

        if let Some(captures) = RE_VCS.captures(head) {
            return Dependency::Vcs(VcsReference {
                editable: captures.name("editable").is_some(),
                url: captures["url"].to_string(),
                package: captures["package"].to_string(),
                comment: Comment::new(captures.name("comment").map(|m| m.as_str()), &rest),
            });
        }
        if let Some(captures) = RE_URL.captures(head) {
            return Dependency::Url(UrlReference {
                package: captures["package"].to_string(),
                url: captures["url"].to_string(),
                markers: parse_markers(captures.name("markers").map(|m| m.as_str())),
                hashes: parse_hashes(captures.name("hashes").map(|m| m.as_str())),
                comment: Comment::new(captures.name("comment").map(|m| m.as_str()), &rest),
            });
        }
        if let Some(captures) = RE_PIN.captures(head) {
            return Dependency::Pin(Pin {
                package: captures["package"].to_string(),
                version: captures["version"].to_string(),
                markers: parse_markers(captures.name("markers").map(|m| m.as_str())),
                hashes: parse_hashes(captures.name("hashes").map(|m| m.as_str())),
                comment: Comment::new(captures.name("comment").map(|m| m.as_str()), &rest),
            });
        }
        Dependency::Opaque(section.to_string())
    }

    /// Whether the section was recognized as a package entry.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Dependency::Opaque(_))
    }

    /// Package name as written in the resolver output.
    pub fn package(&self) -> Option<&str> {
        match self {
            Dependency::Pin(pin) => Some(&pin.package),
            Dependency::Vcs(vcs) => Some(&vcs.package),
            Dependency::Url(url) => Some(&url.package),
            Dependency::Opaque(_) => None,
        }
    }

    /// Canonical package key used for deduplication.
    pub fn key(&self) -> Option<String> {
        self.package().map(canonical_name)
    }

    /// Pinned version. VCS and URL references have none.
    pub fn version(&self) -> Option<&str> {
        match self {
            Dependency::Pin(pin) => Some(&pin.version),
            _ => None,
        }
    }

    pub fn comment_mut(&mut self) -> Option<&mut Comment> {
        match self {
            Dependency::Pin(pin) => Some(&mut pin.comment),
            Dependency::Vcs(vcs) => Some(&mut vcs.comment),
            Dependency::Url(url) => Some(&mut url.comment),
            Dependency::Opaque(_) => None,
        }
    }

    /// Rewrite the version into its canonical spelling.
    pub fn normalize_version(&mut self) {
        if let Dependency::Pin(pin) = self {
            pin.version = normalize_version(&pin.version);
        }
    }

    /// Truncate a `.postN` suffix from the version.
    pub fn drop_post(&mut self) {
        if let Dependency::Pin(pin) = self {
            pin.version = drop_post(&pin.version).to_string();
        }
    }

    /// Render the section back to canonical text.
    pub fn serialize(&self, operator: Operator) -> String {
        match self {
            Dependency::Pin(pin) => {
                let mut head = format!("{}{}{}", pin.package, operator.as_str(), pin.version);
                push_markers(&mut head, pin.markers.as_deref());
                render(head, &pin.hashes, &pin.comment)
            }
            Dependency::Url(url) => {
                let mut head = format!("{} @ {}", url.package, url.url);
                push_markers(&mut head, url.markers.as_deref());
                render(head, &url.hashes, &url.comment)
            }
            Dependency::Vcs(vcs) => {
                let head = if vcs.editable && vcs.url.contains("git+git@") {
                    format!("-e {}", vcs.url)
                } else {
                    vcs.url.clone()
                };
                render(head, &[], &vcs.comment)
            }
            Dependency::Opaque(text) => {
                let mut lines = text.lines();
                let mut out = lines.next().unwrap_or("").trim().to_string();
                for line in lines {
                    out.push('\n');
                    out.push_str(COMMENT_INDENT);
                    out.push_str(line.trim());
                }
                out
            }
        }
    }
}

fn parse_markers(markers: Option<&str>) -> Option<String> {
    markers
        .map(str::trim)
        .filter(|markers| !markers.is_empty())
        .map(str::to_string)
}

fn parse_hashes(hashes: Option<&str>) -> Vec<String> {
    hashes
        .map(|hashes| {
            RE_HASH
                .captures_iter(hashes)
                .map(|captures| format!("--hash={}", &captures[1]))
                .collect()
        })
        .unwrap_or_default()
}

fn push_markers(head: &mut String, markers: Option<&str>) {
    if let Some(markers) = markers {
        head.push_str(" ; ");
        head.push_str(markers);
    }
}

fn render(head: String, hashes: &[String], comment: &Comment) -> String {
    let mut out = if hashes.is_empty() {
        match &comment.inline {
            Some(inline) => format!(
                "{:<width$}{}",
                format!("{}  ", head),
                inline,
                width = COMMENT_JUSTIFICATION
            ),
            None => head,
        }
    } else {
        let mut parts = Vec::with_capacity(hashes.len() + 2);
        parts.push(head);
        parts.extend(hashes.iter().cloned());
        if let Some(inline) = &comment.inline {
            parts.push(inline.clone());
        }
        parts.join(CONTINUATION)
    };
    comment.render_lines(&mut out);
    out
}
