//! Error handling for the migra crate.
use std::{error::Error as StdError, fmt};

/// Error type for the migra crate.
#[derive(Debug)]
pub struct MigraError {
    /// Inner error.
    inner: Box<Inner>,
}

/// Type alias for a boxed error.
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Inner error type for the migra crate.
#[derive(Debug)]
struct Inner {
    /// Error kind.
    kind: MigraErrorKind,

    /// Repository the error relates to, when known.
    repo: Option<String>,

    /// Source error.
    source: Option<BoxError>,
}

/// Error kinds for the migra crate.
#[derive(Debug)]
pub(crate) enum MigraErrorKind {
    /// A required external tool is not installed or not in PATH.
    ToolMissing,

    /// An external command of the migration workflow failed.
    ToolStep,

    /// Error related to the configuration file.
    Config,

    /// Error related to an input/output operation.
    Io,

    /// External command output was not valid UTF-8.
    Utf8,
}

impl MigraError {
    /// Create a new error.
    pub(crate) fn new(kind: MigraErrorKind) -> Self {
        Self {
            inner: Box::new(Inner {
                kind,
                repo: None,
                source: None,
            }),
        }
    }

    /// Create a new error with a text message and a source.
    pub(crate) fn new_with_source<E>(text: &str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(Inner {
                kind: MigraErrorKind::Io,
                repo: None,
                source: Some(Box::new(std::io::Error::other(format!("{text}: {source}")))),
            }),
        }
    }

    /// Attach a text message to the error.
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.inner.source = Some(Box::new(std::io::Error::other(text.to_string())));
        self
    }

    /// Attach a repository name to the error.
    pub(crate) fn with_repo(mut self, repo: &str) -> Self {
        self.inner.repo = Some(repo.to_string());
        self
    }
}

impl fmt::Display for MigraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner.kind)?;
        if let Some(repo) = &self.inner.repo {
            write!(f, " [{repo}]")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for MigraError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

impl From<std::io::Error> for MigraError {
    fn from(e: std::io::Error) -> Self {
        Self {
            inner: Box::new(Inner {
                kind: MigraErrorKind::Io,
                repo: None,
                source: Some(Box::new(e)),
            }),
        }
    }
}

impl From<toml::de::Error> for MigraError {
    fn from(e: toml::de::Error) -> Self {
        Self {
            inner: Box::new(Inner {
                kind: MigraErrorKind::Config,
                repo: None,
                source: Some(Box::new(e)),
            }),
        }
    }
}

impl From<std::str::Utf8Error> for MigraError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self {
            inner: Box::new(Inner {
                kind: MigraErrorKind::Utf8,
                repo: None,
                source: Some(Box::new(e)),
            }),
        }
    }
}

impl From<&str> for MigraError {
    fn from(text: &str) -> Self {
        Self::new(MigraErrorKind::Io).with_text(text)
    }
}
