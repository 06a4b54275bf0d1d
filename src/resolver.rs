//! # Resolver Invocation
//!
//! Dependency resolution is delegated to an external program: `pip-compile`
//! from pip-tools, or `uv pip compile`. The [`Resolver`] trait is the seam
//! between the orchestration logic and that program, so the orchestrator can
//! be exercised in tests with scripted fakes that write canned output.
//!
//! [`PipCompile`] is the production implementation. It captures the
//! resolver's output and only shows it when the resolver fails, unless live
//! output is requested. An optional timeout kills a resolver that hangs.

use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error};

use crate::config::Options;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One resolver run: compile `infile` into `outfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    /// Extra command-line flags, see [`forwarded_flags`].
    pub flags: Vec<String>,
}

/// Trait for resolver invocations - allows scripted fakes in tests.
pub trait Resolver {
    /// Write the resolved requirements of `request.infile` to
    /// `request.outfile`.
    fn resolve(&self, request: &ResolveRequest) -> Result<()>;
}

/// Which resolver program to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    PipTools,
    Uv,
}

impl Backend {
    pub fn from_options(options: &Options) -> Self {
        if options.uv {
            Backend::Uv
        } else {
            Backend::PipTools
        }
    }

    fn program(self) -> &'static str {
        match self {
            Backend::PipTools => "pip-compile",
            Backend::Uv => "uv",
        }
    }

    fn fixed_args(self) -> &'static [&'static str] {
        match self {
            Backend::PipTools => &["--no-header", "--verbose"],
            Backend::Uv => &["pip", "compile", "--no-header", "--no-annotate"],
        }
    }
}

/// Flags passed to the resolver for one environment.
///
/// Options that uv does not understand are left out when `backend` is
/// [`Backend::Uv`].
pub fn forwarded_flags(
    options: &Options,
    backend: Backend,
    generate_hashes: bool,
    constraint: Option<&Path>,
) -> Vec<String> {
    let pip_tools = backend == Backend::PipTools;
    let mut flags = Vec::new();

    if !options.use_cache && pip_tools {
        flags.push("--rebuild".to_string());
    }
    if options.upgrade_all() {
        flags.push("--upgrade".to_string());
    } else if options.upgrade_selected() {
        flags.extend(
            options
                .upgrade_packages
                .iter()
                .map(|package| format!("--upgrade-package={}", package)),
        );
    }
    if generate_hashes {
        flags.push("--generate-hashes".to_string());
    }
    if options.allow_unsafe && pip_tools {
        flags.push("--allow-unsafe".to_string());
    }
    if options.strip_extras && pip_tools {
        flags.push("--strip-extras".to_string());
    }
    if !options.build_isolation {
        flags.push("--no-build-isolation".to_string());
    }
    if let (Some(backtracking), true) = (options.backtracking, pip_tools) {
        flags.push(if backtracking {
            "--resolver=backtracking".to_string()
        } else {
            "--resolver=legacy".to_string()
        });
    }
    if options.annotate_index {
        flags.push("--emit-index-url".to_string());
    } else if pip_tools {
        flags.push("--no-emit-index-url".to_string());
    }
    if pip_tools {
        flags.push(if options.emit_trusted_host {
            "--emit-trusted-host".to_string()
        } else {
            "--no-emit-trusted-host".to_string()
        });
    }
    flags.extend(
        options
            .extra_index_urls
            .iter()
            .map(|url| format!("--extra-index-url={}", url)),
    );
    if let Some(constraint) = constraint {
        flags.push(format!("--constraint={}", constraint.display()));
    }
    flags
}

/// Runs `pip-compile` or `uv pip compile` as a subprocess.
#[derive(Debug, Clone)]
pub struct PipCompile {
    backend: Backend,
    program: Option<PathBuf>,
    live: bool,
    timeout: Option<Duration>,
    progress: bool,
}

impl PipCompile {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            program: None,
            live: false,
            timeout: None,
            progress: false,
        }
    }

    /// Resolver configured from run options. A spinner is shown when stderr
    /// is a terminal and output is not live.
    pub fn from_options(options: &Options) -> Self {
        Self::new(Backend::from_options(options))
            .with_live(options.live)
            .with_timeout(options.timeout)
            .with_progress(!options.live && console::Term::stderr().is_term())
    }

    /// Run a different executable in place of `pip-compile` / `uv`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Full command line for a request, program first.
    pub fn command_line(&self, request: &ResolveRequest) -> Vec<String> {
        let program = match &self.program {
            Some(program) => program.to_string_lossy().into_owned(),
            None => self.backend.program().to_string(),
        };
        let mut argv = vec![program];
        argv.extend(self.backend.fixed_args().iter().map(|arg| arg.to_string()));
        argv.extend(request.flags.iter().cloned());
        argv.push("--output-file".to_string());
        argv.push(request.outfile.to_string_lossy().into_owned());
        argv.push(request.infile.to_string_lossy().into_owned());
        argv
    }

    fn spinner(&self, request: &ResolveRequest) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Resolving {}", request.infile.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

impl Resolver for PipCompile {
    fn resolve(&self, request: &ResolveRequest) -> Result<()> {
        let argv = self.command_line(request);
        let display = argv.join(" ");
        debug!("{}", display);

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]).stdin(Stdio::null());
        if self.live {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|error| Error::ResolverInvocation {
            infile: request.infile.clone(),
            command: display.clone(),
            message: if error.kind() == ErrorKind::NotFound {
                format!("command not found: {}", argv[0])
            } else {
                error.to_string()
            },
        })?;
        let stdout = child.stdout.take().map(capture);
        let stderr = child.stderr.take().map(capture);

        let spinner = self.spinner(request);
        let status = wait_with_timeout(&mut child, self.timeout);
        spinner.finish_and_clear();

        // Helpers started by a killed resolver may keep its pipes open, so
        // the readers are only joined after a normal exit.
        let Some(status) = status? else {
            error!("Timed out executing {}", display);
            return Err(Error::ResolverTimeout {
                infile: request.infile.clone(),
                seconds: self.timeout.map_or(0, |timeout| timeout.as_secs()),
            });
        };
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if status.success() {
            return Ok(());
        }
        error!("ERROR executing {}", display);
        error!("Exit code: {}", status.code().map_or_else(|| "signal".to_string(), |code| code.to_string()));
        if !stdout.trim().is_empty() {
            error!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            error!("{}", stderr.trim_end());
        }
        Err(Error::ResolverInvocation {
            infile: request.infile.clone(),
            command: display,
            message: status.to_string(),
        })
    }
}

fn capture<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Wait for the child, killing it once `timeout` elapses. `Ok(None)` means
/// the child was killed.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn request() -> ResolveRequest {
        ResolveRequest {
            infile: PathBuf::from("requirements/base.in"),
            outfile: PathBuf::from("requirements/base.txt"),
            flags: vec!["--upgrade".to_string()],
        }
    }

    #[test]
    fn test_command_line_pip_tools() {
        let argv = PipCompile::new(Backend::PipTools).command_line(&request());
        assert_eq!(
            argv,
            vec![
                "pip-compile",
                "--no-header",
                "--verbose",
                "--upgrade",
                "--output-file",
                "requirements/base.txt",
                "requirements/base.in",
            ]
        );
    }

    #[test]
    fn test_command_line_uv() {
        let argv = PipCompile::new(Backend::Uv).command_line(&request());
        assert_eq!(&argv[..5], &["uv", "pip", "compile", "--no-header", "--no-annotate"]);
        assert_eq!(argv.last().unwrap(), "requirements/base.in");
    }

    #[test]
    fn test_forwarded_flags_defaults() {
        let flags = forwarded_flags(&Options::default(), Backend::PipTools, false, None);
        assert_eq!(
            flags,
            vec!["--rebuild", "--upgrade", "--no-emit-index-url", "--emit-trusted-host"]
        );
    }

    #[test]
    fn test_forwarded_flags_lock_mode_with_everything() {
        let options = Options {
            upgrade: false,
            use_cache: true,
            allow_unsafe: true,
            strip_extras: true,
            build_isolation: false,
            backtracking: Some(true),
            annotate_index: true,
            emit_trusted_host: false,
            extra_index_urls: vec!["https://pypi.example.com/simple".to_string()],
            ..Options::default()
        };
        let flags = forwarded_flags(&options, Backend::PipTools, true, Some(Path::new("requirements/local.txt")));
        assert_eq!(
            flags,
            vec![
                "--generate-hashes",
                "--allow-unsafe",
                "--strip-extras",
                "--no-build-isolation",
                "--resolver=backtracking",
                "--emit-index-url",
                "--no-emit-trusted-host",
                "--extra-index-url=https://pypi.example.com/simple",
                "--constraint=requirements/local.txt",
            ]
        );
    }

    #[test]
    fn test_forwarded_flags_upgrade_selected() {
        let options = Options {
            upgrade_packages: vec!["six".to_string(), "attrs".to_string()],
            ..Options::default()
        };
        let flags = forwarded_flags(&options, Backend::PipTools, false, None);
        assert!(flags.contains(&"--upgrade-package=six".to_string()));
        assert!(flags.contains(&"--upgrade-package=attrs".to_string()));
        assert!(!flags.contains(&"--upgrade".to_string()));
    }

    #[test]
    fn test_forwarded_flags_uv_skips_pip_tools_only_options() {
        let options = Options {
            allow_unsafe: true,
            strip_extras: true,
            backtracking: Some(false),
            ..Options::default()
        };
        let flags: BTreeSet<String> = forwarded_flags(&options, Backend::Uv, true, None).into_iter().collect();
        assert_eq!(
            flags,
            BTreeSet::from(["--upgrade".to_string(), "--generate-hashes".to_string()])
        );
    }

    #[test]
    fn test_missing_program_is_reported() {
        let resolver = PipCompile::new(Backend::PipTools).with_program("/nonexistent/pip-compile-multi-test");
        match resolver.resolve(&request()) {
            Err(Error::ResolverInvocation { message, .. }) => {
                assert!(message.starts_with("command not found"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-resolver");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_successful_run() {
            let temp = TempDir::new().unwrap();
            let program = script(temp.path(), "exit 0");
            let resolver = PipCompile::new(Backend::PipTools).with_program(program);
            assert!(resolver.resolve(&request()).is_ok());
        }

        #[test]
        fn test_failure_logs_captured_output() {
            testing_logger::setup();
            let temp = TempDir::new().unwrap();
            let program = script(temp.path(), "echo resolving; echo 'no matching distribution' >&2; exit 2");
            let resolver = PipCompile::new(Backend::PipTools).with_program(program);

            let result = resolver.resolve(&request());
            assert!(matches!(result, Err(Error::ResolverInvocation { .. })));
            testing_logger::validate(|captured_logs| {
                let bodies: Vec<&str> = captured_logs.iter().map(|log| log.body.as_str()).collect();
                assert!(bodies.iter().any(|body| body.starts_with("ERROR executing")));
                assert!(bodies.contains(&"Exit code: 2"));
                assert!(bodies.contains(&"resolving"));
                assert!(bodies.contains(&"no matching distribution"));
            });
        }

        #[test]
        fn test_timeout_kills_resolver() {
            let temp = TempDir::new().unwrap();
            let program = script(temp.path(), "exec sleep 5");
            let resolver = PipCompile::new(Backend::PipTools)
                .with_program(program)
                .with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let result = resolver.resolve(&request());
            assert!(matches!(result, Err(Error::ResolverTimeout { .. })));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_timeout_does_not_wait_for_resolver_helpers() {
            let temp = TempDir::new().unwrap();
            let program = script(temp.path(), "sleep 6; echo done");
            let resolver = PipCompile::new(Backend::PipTools)
                .with_program(program)
                .with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let result = resolver.resolve(&request());
            assert!(matches!(result, Err(Error::ResolverTimeout { .. })));
            assert!(started.elapsed() < Duration::from_secs(4));
        }
    }
}
