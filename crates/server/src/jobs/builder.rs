// crates/server/src/jobs/builder.rs
//! The build capability the scheduler drives.
//!
//! Packaging itself is out of process: [`CommandBuilder`] runs a configured
//! executable. Tests inject their own [`FontBuilder`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use fontpack_core::{CanonicalGlyphList, FontId, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Bytes of builder stderr kept in the error message.
const STDERR_TAIL: usize = 2048;

/// Everything a builder needs to produce one package.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub font_id: FontId,
    pub glyphs: CanonicalGlyphList,
    /// Staging path the archive should be written to.
    pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to start builder: {0}")]
    Spawn(String),

    #[error("builder exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("builder produced no output at {path}")]
    MissingOutput { path: PathBuf },

    #[error("build timed out after {0:?}")]
    TimedOut(Duration),

    #[error("build task panicked")]
    Panicked,

    #[error("builder I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

/// Produces the archive for a glyph selection.
///
/// Implementations write to `request.output` and return the path of the
/// finished archive. They must not touch any other job's paths.
#[async_trait]
pub trait FontBuilder: Send + Sync {
    async fn build(&self, request: BuildRequest) -> Result<PathBuf, BuildError>;

    /// Builder name for logging.
    fn name(&self) -> &str;
}

/// Build config handed to the external builder on stdin.
#[derive(Serialize)]
struct BuildConfig<'a> {
    id: &'a FontId,
    glyphs: &'a CanonicalGlyphList,
}

/// Runs `<program> <args..> <output path>` with the build config JSON on
/// stdin and `FONTPACK_FONT_ID` in the environment.
///
/// The child is killed if the build future is dropped (e.g. on timeout).
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl FontBuilder for CommandBuilder {
    async fn build(&self, request: BuildRequest) -> Result<PathBuf, BuildError> {
        let payload = serde_json::to_vec(&BuildConfig {
            id: &request.font_id,
            glyphs: &request.glyphs,
        })
        .map_err(|e| BuildError::Other(format!("failed to encode build config: {e}")))?;

        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            font_id = %request.font_id,
            program = %self.program.display(),
            glyphs = request.glyphs.len(),
            "spawning font builder"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&request.output)
            .env("FONTPACK_FONT_ID", request.font_id.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BuildError::Spawn(e.to_string()))?;

        // Feed stdin while stderr is drained, or a chatty builder and a
        // large config can block each other.
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                // A builder that ignores its config may exit before reading it.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output?;
        if !output.status.success() {
            return Err(BuildError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }
        fed?;

        match tokio::fs::metadata(&request.output).await {
            Ok(meta) if meta.is_file() => Ok(request.output),
            _ => Err(BuildError::MissingOutput {
                path: request.output,
            }),
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
