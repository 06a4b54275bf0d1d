//! # Error Suggestions
//!
//! This module turns library errors into messages that tell the user what
//! went wrong AND how to fix it. Each helper returns an `anyhow::Error` whose
//! message carries one or more `hint:` lines.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pip_compile_multi::suggestions;
//!
//! // Instead of:
//! let graph = discover(&pattern)?;
//!
//! // Use:
//! let graph = discover(&pattern).map_err(suggestions::explain)?;
//! ```

use std::path::Path;

use crate::error::Error;

/// Attach hints to a library error when there is something useful to say.
pub fn explain(error: Error) -> anyhow::Error {
    match error {
        Error::ResolverInvocation {
            ref command,
            ref message,
            ..
        } if message.starts_with("command not found") => resolver_not_found(command),
        Error::CyclicReference { cycle } => cyclic_reference(&cycle),
        Error::NoEnvironments { pattern } => no_environments(&pattern),
        Error::MissingReference {
            path,
            referenced_by,
        } => missing_reference(&path, &referenced_by),
        Error::UnknownEnvironment { name, known } => {
            let known: Vec<&str> = known.iter().map(String::as_str).collect();
            unknown_environment(&name, &known)
        }
        Error::ResolverTimeout { infile, seconds } => anyhow::anyhow!(
            "Resolver timed out after {seconds}s while compiling {}\n\n\
             hint: Increase the limit with --timeout or the `timeout` configuration key\n\
             hint: Run with --live to watch the resolver's progress",
            infile.display()
        ),
        other => anyhow::Error::new(other),
    }
}

/// Generate an error for a resolver binary that cannot be started.
///
/// Includes hints about installing the resolver.
pub fn resolver_not_found(command: &str) -> anyhow::Error {
    let program = command.split_whitespace().next().unwrap_or(command);
    let install = if program == "uv" {
        "hint: Install uv: pip install uv"
    } else {
        "hint: Install pip-tools: pip install pip-tools"
    };
    anyhow::anyhow!(
        "Resolver not found: {program}\n\n\
         {install}\n\
         hint: Make sure it is on PATH in the current environment"
    )
}

/// Generate an error for a cycle between requirements files.
pub fn cyclic_reference(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cyclic reference between requirements files: {cycle}\n\n\
         hint: Remove one of the '-r' lines to break the cycle\n\
         hint: Move shared requirements into a file that both can reference"
    )
}

/// Generate an error for a discovery glob that matched nothing.
pub fn no_environments(pattern: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "No input files found matching {pattern}\n\n\
         hint: Use -d/--directory to point at the requirements directory\n\
         hint: Use -i/--in-ext if input files do not end with .in"
    )
}

/// Generate an error for a `-r` line pointing at a missing file.
pub fn missing_reference(path: &Path, referenced_by: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "{} references {}, which does not exist\n\n\
         hint: References are resolved relative to the file that contains them",
        referenced_by.display(),
        path.display()
    )
}

/// Generate an error for an environment name that was not discovered.
///
/// Suggests the closest known name.
pub fn unknown_environment(name: &str, known: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();
    anyhow::anyhow!(
        "Unknown environment: {name}{did_you_mean}\n\n\
         Known environments are: {names}",
        names = known.join(", ")
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
pub(crate) fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];
    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}
