//! Rendering: LaTeX source → PDF bytes via an external compiler.
//!
//! Each compile gets its own [`TempDir`]. The source is written there, the
//! compiler runs with that directory as both working and output directory,
//! and the PDF is read fully into memory before the directory is dropped.
//! Dropping the `TempDir` removes it on every exit path, including `?`
//! early returns and timeouts (the child is spawned with `kill_on_drop`).
//!
//! [`LatexCompiler::probe`] is the cheap pre-flight check: it runs the
//! compiler with `--version` under a short timeout and folds every failure
//! into `false`.

use crate::config::CompilerSettings;
use crate::error::SnapTexError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Base name of the scratch source and of the produced PDF.
pub const JOB_NAME: &str = "document";

/// Compiles LaTeX source into a PDF.
#[async_trait]
pub trait LatexCompiler: Send + Sync {
    /// Compile `source`, returning the PDF bytes.
    async fn compile(&self, source: &str) -> Result<Vec<u8>, SnapTexError>;

    /// True when the compiler can be invoked at all. Never errors.
    async fn probe(&self) -> bool;

    /// Program name for messages.
    fn program(&self) -> String;
}

/// `pdflatex` (or a compatible engine) run as a subprocess.
#[derive(Debug, Clone)]
pub struct PdfLatex {
    program: PathBuf,
    extra_args: Vec<String>,
    probe_timeout: Duration,
    compile_timeout: Duration,
    scratch_root: Option<PathBuf>,
}

impl PdfLatex {
    pub fn new(settings: &CompilerSettings) -> Self {
        Self {
            program: settings.program.clone(),
            extra_args: settings.extra_args.clone(),
            probe_timeout: settings.probe_timeout(),
            compile_timeout: settings.compile_timeout(),
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn scratch_dir(&self) -> Result<TempDir, SnapTexError> {
        let dir = match self.scratch_root {
            Some(ref root) => tempfile::Builder::new().prefix("snaptex-").tempdir_in(root),
            None => tempfile::Builder::new().prefix("snaptex-").tempdir(),
        };
        dir.map_err(|e| SnapTexError::io("Failed to create scratch directory", e))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn unavailable(&self, detail: impl Into<String>) -> SnapTexError {
        SnapTexError::CompilerUnavailable {
            program: self.program.display().to_string(),
            detail: detail.into(),
        }
    }

    async fn run(&self, dir: &Path, tex_file: &Path) -> Result<std::process::Output, SnapTexError> {
        let mut cmd = self.command();
        cmd.arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(dir)
            .arg(tex_file)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match tokio::time::timeout(self.compile_timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(self.unavailable("binary not found")),
            Ok(Err(e)) => Err(SnapTexError::io(
                format!("Failed to run '{}'", self.program.display()),
                e,
            )),
            Err(_) => Err(SnapTexError::CompilationTimedOut {
                secs: self.compile_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl LatexCompiler for PdfLatex {
    async fn compile(&self, source: &str) -> Result<Vec<u8>, SnapTexError> {
        let start = Instant::now();
        let scratch = self.scratch_dir()?;
        let dir = scratch.path();
        let tex_file = dir.join(format!("{JOB_NAME}.tex"));

        tokio::fs::write(&tex_file, source)
            .await
            .map_err(|e| SnapTexError::io("Failed to write LaTeX source", e))?;

        let output = self.run(dir, &tex_file).await?;

        if !output.status.success() {
            let err = SnapTexError::CompilationFailed {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            warn!("LaTeX compilation failed with status {:?}", output.status.code());
            return Err(err);
        }

        let pdf_path = dir.join(format!("{JOB_NAME}.pdf"));
        let pdf = match tokio::fs::read(&pdf_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapTexError::MissingArtifact { path: pdf_path });
            }
            Err(e) => return Err(SnapTexError::io("Failed to read compiled PDF", e)),
        };

        info!(
            "Compiled LaTeX to PDF ({} bytes) in {:?}",
            pdf.len(),
            start.elapsed()
        );
        Ok(pdf)
    }

    async fn probe(&self) -> bool {
        let mut cmd = self.command();
        cmd.arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match tokio::time::timeout(self.probe_timeout, cmd.status()).await {
            Ok(Ok(status)) if status.success() => true,
            Ok(Ok(status)) => {
                debug!("{} --version exited with {}", self.program.display(), status);
                false
            }
            Ok(Err(e)) => {
                debug!("{} --version could not run: {}", self.program.display(), e);
                false
            }
            Err(_) => {
                debug!(
                    "{} --version timed out after {:?}",
                    self.program.display(),
                    self.probe_timeout
                );
                false
            }
        }
    }

    fn program(&self) -> String {
        self.program.display().to_string()
    }
}
