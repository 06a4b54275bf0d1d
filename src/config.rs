//! # Configuration
//!
//! Options for a compilation run come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`Options::default`]).
//! 2. One configuration *section* read from the project directory.
//! 3. Command-line overrides, applied by the CLI.
//!
//! ## Configuration Files
//!
//! Sections are read from, in order:
//!
//! - `pyproject.toml`: a flat `[tool.requirements]` table is a single section
//!   named `config`. Named sub-tables (`[tool.requirements.py312]`) or an
//!   array of tables (`[[tool.requirements]]`, named by their `name` key)
//!   give one section each.
//! - `requirements.ini`, `setup.cfg`, `tox.ini`: sections named
//!   `requirements` or prefixed with `requirements:`. Same-named sections in
//!   several files are merged. List values are separated by commas or by
//!   indented continuation lines.
//!
//! Each section produces one run. A `python` key restricts the section to a
//! Python version; see [`filter_sections`].
//!
//! ```toml
//! [tool.requirements]
//! directory = "requirements"
//! generate-hashes = ["base"]
//! upgrade = false
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::lockfile::LockPolicy;
use crate::path::compile_patterns;
use crate::phases::discovery::input_pattern;

/// INI files that may carry configuration sections, in reading order.
pub const INI_FILES: [&str; 3] = ["requirements.ini", "setup.cfg", "tox.ini"];

pub const PYPROJECT_FILE: &str = "pyproject.toml";

const INI_SECTION: &str = "requirements";
const INI_SECTION_PREFIX: &str = "requirements:";

/// Header written below the hash line when no header file is configured.
pub const DEFAULT_HEADER: &str = "\
#
# This file is autogenerated by pip-compile-multi
# To update, run:
#
#    pip-compile-multi
#
";

/// Options of a single compilation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Directory holding the input files.
    pub directory: PathBuf,
    pub in_ext: String,
    pub out_ext: String,
    /// File whose contents replace [`DEFAULT_HEADER`].
    pub header_file: Option<PathBuf>,
    /// Glob patterns of packages pinned with `~=`.
    pub compatible: Vec<String>,
    /// Glob patterns of packages excluded from conflict checks.
    pub unchecked: Vec<String>,
    /// Environment names whose lockfiles drop `.postN` suffixes.
    pub forbid_post: BTreeSet<String>,
    /// Environment names that need hashes.
    pub generate_hashes: BTreeSet<String>,
    /// Only compile these environments (plus their references).
    pub only_names: BTreeSet<String>,
    pub only_paths: BTreeSet<PathBuf>,
    pub upgrade: bool,
    /// Upgrade only these packages. Empty means all.
    pub upgrade_packages: Vec<String>,
    pub use_cache: bool,
    pub allow_unsafe: bool,
    pub strip_extras: bool,
    pub build_isolation: bool,
    /// `None` leaves the resolver's default in place.
    pub backtracking: Option<bool>,
    pub annotate_index: bool,
    pub emit_trusted_host: bool,
    pub extra_index_urls: Vec<String>,
    pub skip_constraints: bool,
    pub autoresolve: bool,
    pub live: bool,
    pub uv: bool,
    pub timeout: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("requirements"),
            in_ext: "in".to_string(),
            out_ext: "txt".to_string(),
            header_file: None,
            compatible: Vec::new(),
            unchecked: Vec::new(),
            forbid_post: BTreeSet::new(),
            generate_hashes: BTreeSet::new(),
            only_names: BTreeSet::new(),
            only_paths: BTreeSet::new(),
            upgrade: true,
            upgrade_packages: Vec::new(),
            use_cache: false,
            allow_unsafe: false,
            strip_extras: false,
            build_isolation: true,
            backtracking: None,
            annotate_index: false,
            emit_trusted_host: true,
            extra_index_urls: Vec::new(),
            skip_constraints: false,
            autoresolve: false,
            live: false,
            uv: false,
            timeout: None,
        }
    }
}

impl Options {
    /// Glob matching every input file.
    pub fn input_pattern(&self) -> String {
        input_pattern(&self.directory, &self.in_ext)
    }

    pub fn upgrade_all(&self) -> bool {
        self.upgrade && self.upgrade_packages.is_empty()
    }

    pub fn upgrade_selected(&self) -> bool {
        self.upgrade && !self.upgrade_packages.is_empty()
    }

    /// Runs sharing this key verify the same files.
    pub fn run_key(&self) -> (PathBuf, String, String) {
        (
            self.directory.clone(),
            self.in_ext.clone(),
            self.out_ext.clone(),
        )
    }

    /// Record rewriting rules for the environment called `env_name`.
    pub fn lock_policy(&self, env_name: &str) -> Result<LockPolicy> {
        Ok(LockPolicy {
            forbid_post: self.forbid_post.contains(env_name),
            compatible: compile_patterns(&self.compatible)?,
            unchecked: compile_patterns(&self.unchecked)?,
            skip_constraints: self.skip_constraints,
        })
    }

    /// Header text placed under the hash line.
    pub fn header_text(&self) -> Result<String> {
        match &self.header_file {
            Some(path) => {
                let mut text = fs::read_to_string(path)?;
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                Ok(text)
            }
            None => Ok(DEFAULT_HEADER.to_string()),
        }
    }

    /// Reject patterns and URLs that would only fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        compile_patterns(&self.compatible)?;
        compile_patterns(&self.unchecked)?;
        for url in &self.extra_index_urls {
            Url::parse(url)?;
        }
        if self.in_ext == self.out_ext {
            return Err(Error::ConfigParse {
                message: format!("input and output extensions are both '{}'", self.in_ext),
                hint: Some("lockfiles would overwrite their inputs; change out_ext".to_string()),
            });
        }
        Ok(())
    }

    /// Apply the values of a configuration section.
    pub fn apply_section(&mut self, section: &Section) -> Result<()> {
        let values = section.values()?;
        if let Some(directory) = values.directory {
            self.directory = directory;
        }
        if let Some(in_ext) = values.in_ext {
            self.in_ext = in_ext;
        }
        if let Some(out_ext) = values.out_ext {
            self.out_ext = out_ext;
        }
        if let Some(header) = values.header {
            self.header_file = (!header.as_os_str().is_empty()).then_some(header);
        }
        if let Some(compatible) = values.compatible {
            self.compatible = compatible.into_list();
        }
        if let Some(unchecked) = values.unchecked {
            self.unchecked = unchecked.into_list();
        }
        if let Some(forbid_post) = values.forbid_post {
            self.forbid_post = forbid_post.into_list().into_iter().collect();
        }
        if let Some(generate_hashes) = values.generate_hashes {
            self.generate_hashes = generate_hashes.into_list().into_iter().collect();
        }
        if let Some(only_name) = values.only_name {
            self.only_names = only_name.into_list().into_iter().collect();
        }
        if let Some(only_path) = values.only_path {
            self.only_paths = only_path.into_list().into_iter().map(PathBuf::from).collect();
        }
        if let Some(upgrade_packages) = values.upgrade_packages {
            self.upgrade_packages = upgrade_packages.into_list();
        }
        if let Some(extra_index_url) = values.extra_index_url {
            self.extra_index_urls = extra_index_url.into_list();
        }
        if let Some(backtracking) = values.backtracking {
            self.backtracking = Some(backtracking.to_bool("backtracking")?);
        }
        if let Some(timeout) = values.timeout {
            let seconds = timeout.to_seconds()?;
            self.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        let flags = [
            ("upgrade", values.upgrade, &mut self.upgrade),
            ("use_cache", values.use_cache, &mut self.use_cache),
            ("allow_unsafe", values.allow_unsafe, &mut self.allow_unsafe),
            ("strip_extras", values.strip_extras, &mut self.strip_extras),
            ("build_isolation", values.build_isolation, &mut self.build_isolation),
            ("annotate_index", values.annotate_index, &mut self.annotate_index),
            ("emit_trusted_host", values.emit_trusted_host, &mut self.emit_trusted_host),
            ("skip_constraints", values.skip_constraints, &mut self.skip_constraints),
            ("autoresolve", values.autoresolve, &mut self.autoresolve),
            ("live", values.live, &mut self.live),
            ("uv", values.uv, &mut self.uv),
        ];
        for (key, value, target) in flags {
            if let Some(value) = value {
                *target = value.to_bool(key)?;
            }
        }
        Ok(())
    }
}

/// A boolean as written in TOML or INI.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn to_bool(&self, key: &str) -> Result<bool> {
        match self {
            Flag::Bool(value) => Ok(*value),
            Flag::Text(text) => match text.trim().to_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => Ok(true),
                "0" | "no" | "false" | "off" => Ok(false),
                other => Err(Error::ConfigParse {
                    message: format!("invalid boolean '{}' for '{}'", other, key),
                    hint: Some("use true or false".to_string()),
                }),
            },
        }
    }
}

/// A list as written in TOML (array) or INI (comma or line separated).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Many {
    List(Vec<String>),
    Text(String),
}

impl Many {
    fn into_list(self) -> Vec<String> {
        match self {
            Many::List(items) => items,
            Many::Text(text) => text
                .split([',', '\n'])
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Seconds as written in TOML (integer) or INI (text).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(u64),
    Text(String),
}

impl Seconds {
    fn to_seconds(&self) -> Result<u64> {
        match self {
            Seconds::Number(seconds) => Ok(*seconds),
            Seconds::Text(text) => text.trim().parse().map_err(|_| Error::ConfigParse {
                message: format!("invalid timeout '{}'", text),
                hint: Some("use a whole number of seconds".to_string()),
            }),
        }
    }
}

/// Typed view of a section's values. Keys are matched after lowercasing
/// and replacing `-` with `_`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionValues {
    directory: Option<PathBuf>,
    in_ext: Option<String>,
    out_ext: Option<String>,
    header: Option<PathBuf>,
    compatible: Option<Many>,
    unchecked: Option<Many>,
    forbid_post: Option<Many>,
    #[serde(alias = "add_hashes")]
    generate_hashes: Option<Many>,
    #[serde(alias = "include_names")]
    only_name: Option<Many>,
    #[serde(alias = "include_in_paths")]
    only_path: Option<Many>,
    upgrade: Option<Flag>,
    #[serde(alias = "upgrade_package")]
    upgrade_packages: Option<Many>,
    use_cache: Option<Flag>,
    allow_unsafe: Option<Flag>,
    strip_extras: Option<Flag>,
    build_isolation: Option<Flag>,
    backtracking: Option<Flag>,
    annotate_index: Option<Flag>,
    emit_trusted_host: Option<Flag>,
    extra_index_url: Option<Many>,
    skip_constraints: Option<Flag>,
    autoresolve: Option<Flag>,
    #[serde(alias = "live_output")]
    live: Option<Flag>,
    #[serde(alias = "use_uv")]
    uv: Option<Flag>,
    timeout: Option<Seconds>,
}

/// One named configuration section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    /// Python version the section is restricted to.
    pub python: Option<String>,
    table: toml::Table,
}

impl Section {
    /// Build a section from raw key/value pairs, normalizing keys and
    /// pulling out the `python` restriction.
    pub fn new(name: impl Into<String>, table: toml::Table) -> Self {
        let mut normalized = toml::Table::new();
        let mut python = None;
        for (key, value) in table {
            let key = key.trim().to_lowercase().replace('-', "_");
            if key == "python" {
                python = match value {
                    toml::Value::String(text) => Some(text.trim().to_string()),
                    other => Some(other.to_string()),
                };
            } else {
                normalized.insert(key, value);
            }
        }
        Self {
            name: name.into(),
            python,
            table: normalized,
        }
    }

    fn values(&self) -> Result<SectionValues> {
        toml::Value::Table(self.table.clone())
            .try_into()
            .map_err(|error: toml::de::Error| Error::ConfigParse {
                message: format!("section [{}]: {}", self.name, error.message()),
                hint: None,
            })
    }

    fn merge(&mut self, other: Section) {
        if other.python.is_some() {
            self.python = other.python;
        }
        self.table.extend(other.table);
    }
}

#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<PyProjectTool>,
}

#[derive(Debug, Deserialize)]
struct PyProjectTool {
    requirements: Option<toml::Value>,
}

/// Sections of a `pyproject.toml` document.
pub fn parse_pyproject(text: &str) -> Result<Vec<Section>> {
    let pyproject: PyProject = toml::from_str(text)?;
    let Some(requirements) = pyproject.tool.and_then(|tool| tool.requirements) else {
        return Ok(Vec::new());
    };

    let not_a_table = |name: &str| Error::ConfigParse {
        message: format!("[tool.requirements] entry '{}' is not a table", name),
        hint: Some("use [tool.requirements] or [tool.requirements.<name>] tables".to_string()),
    };

    match requirements {
        toml::Value::Table(table) if table.values().all(toml::Value::is_table) && !table.is_empty() => table
            .into_iter()
            .map(|(name, value)| match value {
                toml::Value::Table(inner) => Ok(Section::new(name, inner)),
                _ => Err(not_a_table(&name)),
            })
            .collect(),
        toml::Value::Table(table) => Ok(vec![Section::new("config", table)]),
        toml::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(position, item)| match item {
                toml::Value::Table(mut inner) => {
                    let name = match inner.remove("name") {
                        Some(toml::Value::String(name)) => name,
                        _ => format!("config-{}", position + 1),
                    };
                    Ok(Section::new(name, inner))
                }
                _ => Err(not_a_table(&position.to_string())),
            })
            .collect(),
        _ => Err(not_a_table("requirements")),
    }
}

/// Fold indented continuation lines into the preceding value, separated by
/// commas, so that multi-line INI lists survive parsing. Comment lines never
/// receive continuations.
fn fold_continuations(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut target: Option<usize> = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(['#', ';']) {
            lines.push(line.to_string());
            continue;
        }
        let is_continuation = line.starts_with([' ', '\t']) && !trimmed.is_empty();
        match target {
            Some(index) if is_continuation => {
                let value = &mut lines[index];
                if !value.trim_end().ends_with('=') {
                    value.push(',');
                }
                value.push(' ');
                value.push_str(trimmed);
            }
            _ => {
                target = (trimmed.contains('=') && !trimmed.starts_with('[')).then_some(lines.len());
                lines.push(line.to_string());
            }
        }
    }
    lines.join("\n")
}

/// Requirements sections of an INI document.
pub fn parse_ini(text: &str) -> Result<Vec<Section>> {
    let ini = ini::Ini::load_from_str(&fold_continuations(text))?;
    let mut sections = Vec::new();
    for (name, properties) in ini.iter() {
        let Some(name) = name else { continue };
        if name != INI_SECTION && !name.starts_with(INI_SECTION_PREFIX) {
            continue;
        }
        let table: toml::Table = properties
            .iter()
            .map(|(key, value)| (key.to_string(), toml::Value::String(value.to_string())))
            .collect();
        sections.push(Section::new(name, table));
    }
    Ok(sections)
}

/// Read every configuration section found in `dir`.
pub fn read_sections(dir: &Path) -> Result<Vec<Section>> {
    let mut sections = Vec::new();

    let pyproject = dir.join(PYPROJECT_FILE);
    if pyproject.is_file() {
        sections.extend(parse_pyproject(&fs::read_to_string(&pyproject)?)?);
    }

    let mut ini_sections: BTreeMap<String, usize> = BTreeMap::new();
    for file in INI_FILES {
        let path = dir.join(file);
        if !path.is_file() {
            continue;
        }
        let parsed = match parse_ini(&fs::read_to_string(&path)?) {
            Ok(parsed) => parsed,
            Err(Error::Ini(error)) if file != INI_FILES[0] => {
                warn!("Skipping {}: {}", path.display(), error);
                continue;
            }
            Err(error) => return Err(error),
        };
        for section in parsed {
            debug!("Found section [{}] in {}", section.name, path.display());
            match ini_sections.get(&section.name) {
                Some(&position) => sections[position].merge(section),
                None => {
                    ini_sections.insert(section.name.clone(), sections.len());
                    sections.push(section);
                }
            }
        }
    }
    Ok(sections)
}

/// Spellings of a Python version that a `python` key may use.
///
/// ```
/// use pip_compile_multi::config::python_version_matchers;
///
/// let matchers = python_version_matchers("3.12.1");
/// assert!(matchers.contains("3"));
/// assert!(matchers.contains("312"));
/// assert!(matchers.contains("3.12"));
/// ```
pub fn python_version_matchers(version: &str) -> BTreeSet<String> {
    let mut parts = version.trim().split('.');
    let mut matchers = BTreeSet::new();
    let Some(major) = parts.next().filter(|major| !major.is_empty()) else {
        return matchers;
    };
    matchers.insert(major.to_string());
    if let Some(minor) = parts.next().filter(|minor| !minor.is_empty()) {
        matchers.insert(format!("{}{}", major, minor));
        matchers.insert(format!("{}.{}", major, minor));
    }
    matchers
}

/// Keep the sections that apply to the running Python.
///
/// Returns `None` when there are no sections at all, so the caller can fall
/// back to defaults, and an empty list when sections exist but none match.
pub fn filter_sections(sections: Vec<Section>, python_version: Option<&str>) -> Option<Vec<Section>> {
    if sections.is_empty() {
        return None;
    }
    let matchers = python_version
        .map(python_version_matchers)
        .unwrap_or_default();
    Some(
        sections
            .into_iter()
            .filter(|section| match &section.python {
                None => true,
                Some(target) => matchers.contains(target),
            })
            .collect(),
    )
}

/// Ask the `python3` on PATH for its version.
pub fn detect_python_version() -> Option<String> {
    let output = Command::new("python3").arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    text.trim()
        .strip_prefix("Python ")
        .map(|version| version.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn section(pairs: &[(&str, &str)]) -> Section {
        let table = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), toml::Value::String(value.to_string())))
            .collect();
        Section::new("requirements", table)
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.input_pattern(), "requirements/*.in");
        assert!(options.upgrade_all());
        assert!(!options.upgrade_selected());
        assert!(options.build_isolation);
        assert!(options.emit_trusted_host);
        assert_eq!(options.header_text().unwrap(), DEFAULT_HEADER);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_apply_ini_style_section() {
        let mut options = Options::default();
        options
            .apply_section(&section(&[
                ("directory", "reqs"),
                ("Generate-Hashes", "base, test"),
                ("upgrade", "no"),
                ("upgrade-package", "six\nrequests"),
                ("live_output", "yes"),
                ("timeout", "90"),
                ("backtracking", "true"),
            ]))
            .unwrap();
        assert_eq!(options.directory, PathBuf::from("reqs"));
        assert_eq!(
            options.generate_hashes.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["base", "test"]
        );
        assert!(!options.upgrade);
        assert_eq!(options.upgrade_packages, vec!["six", "requests"]);
        assert!(options.live);
        assert_eq!(options.timeout, Some(Duration::from_secs(90)));
        assert_eq!(options.backtracking, Some(true));
    }

    #[test]
    fn test_apply_rejects_unknown_key() {
        let mut options = Options::default();
        let error = options.apply_section(&section(&[("upgrad", "true")])).unwrap_err();
        assert!(error.to_string().contains("upgrad"));
    }

    #[test]
    fn test_apply_rejects_invalid_boolean() {
        let mut options = Options::default();
        let error = options.apply_section(&section(&[("uv", "maybe")])).unwrap_err();
        assert!(error.to_string().contains("invalid boolean 'maybe' for 'uv'"));
    }

    #[test]
    fn test_validate_rejects_bad_url_and_pattern() {
        let options = Options {
            extra_index_urls: vec!["not a url".to_string()],
            ..Options::default()
        };
        assert!(matches!(options.validate(), Err(Error::UrlParse(_))));

        let options = Options {
            compatible: vec!["[".to_string()],
            ..Options::default()
        };
        assert!(matches!(options.validate(), Err(Error::Glob(_))));
    }

    #[test]
    fn test_parse_ini_sections() {
        let text = "\
[metadata]
name = project

[requirements]
compatible = mycompany-*
generate_hashes =
    base
    test

[requirements:py39]
python = 3.9
uv = true
";
        let sections = parse_ini(text).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "requirements");
        assert_eq!(sections[1].name, "requirements:py39");
        assert_eq!(sections[1].python.as_deref(), Some("3.9"));

        let mut options = Options::default();
        options.apply_section(&sections[0]).unwrap();
        assert_eq!(options.compatible, vec!["mycompany-*"]);
        assert_eq!(options.generate_hashes.len(), 2);
    }

    #[test]
    fn test_parse_ini_continuation_after_comment_with_equals() {
        let text = "\
[requirements]
# see compatible=django
generate_hashes =
    base
# keep test hashed too
    test
";
        let sections = parse_ini(text).unwrap();
        let mut options = Options::default();
        options.apply_section(&sections[0]).unwrap();
        assert!(options.compatible.is_empty());
        assert_eq!(
            options.generate_hashes,
            ["base".to_string(), "test".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn test_fold_continuations_leaves_comments_alone() {
        assert_eq!(
            fold_continuations("[a]\n; x=1\n    y\n"),
            "[a]\n; x=1\n    y"
        );
    }

    #[test]
    fn test_parse_pyproject_flat() {
        let text = "\
[project]
name = \"demo\"

[tool.requirements]
uv = true
generate-hashes = [\"base\"]
";
        let sections = parse_pyproject(text).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "config");
        let mut options = Options::default();
        options.apply_section(&sections[0]).unwrap();
        assert!(options.uv);
        assert!(options.generate_hashes.contains("base"));
    }

    #[test]
    fn test_parse_pyproject_named_tables() {
        let text = "\
[tool.requirements.one]
uv = true

[tool.requirements.two]
python = 3.12
autoresolve = true
";
        let sections = parse_pyproject(text).unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(sections[1].python.as_deref(), Some("3.12"));
    }

    #[test]
    fn test_parse_pyproject_array_of_tables() {
        let text = "\
[[tool.requirements]]
name = \"main\"
directory = \"req\"

[[tool.requirements]]
directory = \"docs\"
";
        let sections = parse_pyproject(text).unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["main", "config-2"]);
    }

    #[test]
    fn test_parse_pyproject_without_tool_section() {
        assert!(parse_pyproject("[project]\nname = \"x\"\n").unwrap().is_empty());
    }

    #[test]
    fn test_read_sections_orders_and_merges_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pyproject.toml"), "[tool.requirements]\nuv = true\n").unwrap();
        fs::write(temp.path().join("requirements.ini"), "[requirements]\ndirectory = a\n").unwrap();
        fs::write(
            temp.path().join("tox.ini"),
            "[requirements]\ndirectory = b\nlive = true\n[tox]\nenvlist = py\n",
        )
        .unwrap();

        let sections = read_sections(temp.path()).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "config");
        let mut options = Options::default();
        options.apply_section(&sections[1]).unwrap();
        assert_eq!(options.directory, PathBuf::from("b"));
        assert!(options.live);
    }

    #[test]
    fn test_read_sections_empty_dir() {
        let temp = TempDir::new().unwrap();
        assert!(read_sections(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_python_version_matchers() {
        assert_eq!(
            python_version_matchers("3.9"),
            BTreeSet::from(["3".to_string(), "39".to_string(), "3.9".to_string()])
        );
        assert_eq!(python_version_matchers("3"), BTreeSet::from(["3".to_string()]));
        assert!(python_version_matchers("").is_empty());
    }

    #[test]
    fn test_filter_sections() {
        assert!(filter_sections(Vec::new(), Some("3.12")).is_none());

        let mut py39 = section(&[]);
        py39.python = Some("3.9".to_string());
        let mut py312 = section(&[]);
        py312.python = Some("312".to_string());
        let any = section(&[]);

        let kept = filter_sections(vec![py39.clone(), py312.clone(), any.clone()], Some("3.12.4")).unwrap();
        assert_eq!(kept.len(), 2);

        let kept = filter_sections(vec![py39, py312], Some("2.7")).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_lock_policy() {
        let options = Options {
            forbid_post: BTreeSet::from(["prod".to_string()]),
            compatible: vec!["acme-*".to_string()],
            ..Options::default()
        };
        assert!(options.lock_policy("prod").unwrap().forbid_post);
        assert!(!options.lock_policy("test").unwrap().forbid_post);
        assert_eq!(options.lock_policy("test").unwrap().compatible.len(), 1);
    }

    #[test]
    fn test_header_file() {
        let temp = TempDir::new().unwrap();
        let header = temp.path().join("header");
        fs::write(&header, "# Custom header").unwrap();
        let options = Options {
            header_file: Some(header),
            ..Options::default()
        };
        assert_eq!(options.header_text().unwrap(), "# Custom header\n");
    }
}
