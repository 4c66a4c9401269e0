//! Engine error type.
//!
//! Mirrors the status-with-kind model used throughout the wider storage library: every fallible
//! engine operation returns a [`ConfigError`] carrying a [`ConfigErrorKind`] plus a human-readable
//! message, and optionally the option name / parent struct path the failure occurred at.

use std::{error::Error as StdError, fmt, sync::Arc};

/// Coarse classification of engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    /// Grammar error, unknown key (when not ignored), type coercion failure, unknown nested
    /// struct field.
    InvalidArgument,
    /// Unresolved offset, unknown polymorphic identifier (when not ignored).
    NotFound,
    /// Deprecated write path; attempt to parse a `ByName` field; unsupported lifecycle call.
    NotSupported,
    /// Propagated from `Prepare`-time external operations (dynamic library loads, and the like).
    IoError,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::InvalidArgument => "invalid argument",
            Self::NotFound => "not found",
            Self::NotSupported => "not supported",
            Self::IoError => "I/O error",
        })
    }
}

/// A failure from the configuration engine.
///
/// Cheaply [`Clone`]-able so that [`OptionRecord`](crate::configurable::OptionRecord) can cache the
/// last `Prepare`/`Validate` status and replay it on subsequent calls without re-running the check.
#[derive(Debug, Clone)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    message: Arc<str>,
    option: Option<Arc<str>>,
    parent: Option<Arc<str>>,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ConfigError {
    fn new(kind: ConfigErrorKind, message: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            option: None,
            parent: None,
            source: None,
        }
    }

    /// Grammar error, unknown key, type coercion failure.
    pub fn invalid_argument(message: impl Into<Arc<str>>) -> Self {
        Self::new(ConfigErrorKind::InvalidArgument, message)
    }

    /// Unresolved offset or unknown polymorphic identifier.
    pub fn not_found(message: impl Into<Arc<str>>) -> Self {
        Self::new(ConfigErrorKind::NotFound, message)
    }

    /// Deprecated write path, `ByName` deserialization, or an unsupported lifecycle call.
    pub fn not_supported(message: impl Into<Arc<str>>) -> Self {
        Self::new(ConfigErrorKind::NotSupported, message)
    }

    /// External, `Prepare`-time failure (dynamic library load, resource acquisition).
    pub fn io_error(message: impl Into<Arc<str>>) -> Self {
        Self::new(ConfigErrorKind::IoError, message)
    }

    /// Attaches the option name this failure concerns, if not already set.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<Arc<str>>) -> Self {
        if self.option.is_none() {
            self.option = Some(name.into());
        }
        self
    }

    /// Attaches the dotted parent struct path this failure occurred under, if not already set.
    #[must_use]
    pub fn with_parent(mut self, path: impl Into<Arc<str>>) -> Self {
        if self.parent.is_none() {
            self.parent = Some(path.into());
        }
        self
    }

    #[must_use]
    pub(crate) fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    pub fn option(&self) -> Option<&str> {
        self.option.as_deref()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)?;
        if let Some(option) = &self.option {
            write!(formatter, " (option `{option}`")?;
            if let Some(parent) = &self.parent {
                write!(formatter, " in `{parent}`")?;
            }
            formatter.write_str(")")?;
        } else if let Some(parent) = &self.parent {
            write!(formatter, " (in `{parent}`)")?;
        }
        Ok(())
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|err| err as &(dyn StdError + 'static))
    }
}

impl From<libloading::Error> for ConfigError {
    fn from(err: libloading::Error) -> Self {
        Self::io_error(err.to_string()).with_source(err)
    }
}

/// Convenience alias for engine operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
