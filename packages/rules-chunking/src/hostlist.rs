//! `hostlist-compiler` delegate
//!
//! Each call writes the chunk configuration to a private temporary directory,
//! runs the external compiler against it and reads the output file back.

use crate::config::RuleSourceConfig;
use crate::error::{ChunkingError, Result};
use crate::executor::{ChunkCompiler, CompiledLines};
use anyhow::Context;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPILER_BINARY: &str = "hostlist-compiler";
const NPM_PACKAGE: &str = "@adguard/hostlist-compiler";

#[derive(Debug, Clone)]
pub struct HostlistCompiler {
    program: PathBuf,
    args: Vec<OsString>,
}

impl HostlistCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run through `npx`, using the npm package
    pub fn npx(npx: impl Into<PathBuf>) -> Self {
        Self::new(npx).with_args([NPM_PACKAGE])
    }

    /// Locate `hostlist-compiler`, falling back to `npx`
    pub fn discover() -> Result<Self> {
        if let Ok(path) = which::which(COMPILER_BINARY) {
            debug!("Using {} at {}", COMPILER_BINARY, path.display());
            return Ok(Self::new(path));
        }

        if let Ok(path) = which::which("npx") {
            debug!("Using {} via npx at {}", NPM_PACKAGE, path.display());
            return Ok(Self::npx(path));
        }

        Err(ChunkingError::CompilerNotFound)
    }

    /// Arguments placed before `--config`
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, config_path: &Path, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--config")
            .arg(config_path)
            .arg("--output")
            .arg(output_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ChunkCompiler for HostlistCompiler {
    async fn compile(
        &self,
        config: &RuleSourceConfig,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<CompiledLines> {
        let start_time = Instant::now();

        let workdir = tempfile::Builder::new()
            .prefix("rules-chunk-")
            .tempdir()
            .context("creating temporary directory")?;
        let config_path = workdir.path().join("config.json");
        let output_path = workdir.path().join("output.txt");

        tokio::fs::write(&config_path, config.to_json()?)
            .await
            .with_context(|| format!("writing {}", config_path.display()))?;

        debug!(
            "Running {} for {} ({} sources)",
            self.program.display(),
            config.name.as_deref().unwrap_or("unnamed"),
            config.sources.len()
        );

        // Dropping this future (on cancellation) kills the child
        let output = self
            .command(&config_path, &output_path)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with code {}: {}",
                self.program.display(),
                output
                    .status
                    .code()
                    .map_or_else(|| "none".to_string(), |c| c.to_string()),
                stderr.trim()
            );
        }

        let lines = match tokio::fs::read_to_string(&output_path).await {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "{} produced no output file for {}",
                    self.program.display(),
                    config.name.as_deref().unwrap_or("unnamed")
                );
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", output_path.display()));
            }
        };

        Ok(CompiledLines::new(
            lines,
            start_time.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::FilterSource;

    fn config() -> RuleSourceConfig {
        RuleSourceConfig::new("Test").with_source(FilterSource::new("https://example.org/a.txt"))
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let compiler = HostlistCompiler::new("/nonexistent/hostlist-compiler");
        let err = compiler
            .compile(&config(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }

    #[tokio::test]
    async fn test_no_output_file_yields_empty_lines() {
        let compiler = HostlistCompiler::new("true");
        let compiled = compiler
            .compile(&config(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(compiled.lines.is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_code_and_stderr() {
        let compiler = HostlistCompiler::new("sh").with_args(["-c", "echo ' boom ' >&2; exit 3"]);
        let err = compiler
            .compile(&config(), &CancellationToken::new())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code 3"), "{}", msg);
        assert!(msg.ends_with(": boom"), "{}", msg);
    }

    #[tokio::test]
    async fn test_reads_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-compiler.sh");
        std::fs::write(
            &script,
            r#"
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then
    printf '! Title: Test\n||a.example^\n' > "$2"
  fi
  shift
done
"#,
        )
        .unwrap();

        let compiler = HostlistCompiler::new("sh").with_args([script.as_os_str()]);
        let compiled = compiler
            .compile(&config(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(compiled.lines, vec!["! Title: Test", "||a.example^"]);
    }

    #[test]
    fn test_npx_prefixes_package() {
        let compiler = HostlistCompiler::npx("/usr/bin/npx");
        assert_eq!(compiler.program(), Path::new("/usr/bin/npx"));
        assert_eq!(compiler.args, vec![OsString::from(NPM_PACKAGE)]);
    }
}
