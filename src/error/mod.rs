use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The error type surfaced by report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        page: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Data source error: {message}")]
    DataSource {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Cache storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Rendering host error during {operation}: {message}")]
    Host {
        code: u16,
        message: String,
        operation: String,
        attempts: u32,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Template error: {message}")]
    Template {
        code: u16,
        message: String,
        missing: Vec<String>,
        failed: Vec<String>,
    },

    #[error("[E{code:04}] Merge error: {message}")]
    Merge {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ReportError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            page: None,
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            page: None,
            source: None,
        }
    }

    /// Create a configuration error scoped to one page
    pub fn page_config(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_MISSING_REQUIRED,
            message: message.into(),
            page: Some(page.into()),
            source: None,
        }
    }

    /// Create a data source error with specific code
    pub fn data_source(code: u16, message: impl Into<String>) -> Self {
        Self::DataSource {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::STORAGE_GENERIC,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a host error for a failed operation
    pub fn host(code: u16, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Host {
            code,
            message: message.into(),
            operation: operation.into(),
            attempts: 1,
            source: None,
        }
    }

    /// Create the error raised when the host stayed busy through every attempt
    pub fn host_exhausted(operation: impl Into<String>, attempts: u32) -> Self {
        Self::Host {
            code: ErrorCode::HOST_RETRIES_EXHAUSTED,
            message: format!("still busy after {} attempts", attempts),
            operation: operation.into(),
            attempts,
            source: None,
        }
    }

    /// Create the error raised when no page could be produced
    pub fn no_pages(missing: Vec<String>, failed: Vec<String>) -> Self {
        let message = if missing.is_empty() {
            "no page was produced".to_string()
        } else {
            format!("no page was produced; missing templates: {}", missing.join(", "))
        };
        Self::Template {
            code: ErrorCode::TEMPLATE_NO_PAGES,
            message,
            missing,
            failed,
        }
    }

    /// Create a template error with specific code
    pub fn template(code: u16, message: impl Into<String>) -> Self {
        Self::Template {
            code,
            message: message.into(),
            missing: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Create a merge error with specific code
    pub fn merge(code: u16, message: impl Into<String>) -> Self {
        Self::Merge {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::DataSource { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Host { source: src, .. }
            | Self::Merge { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::Template { .. } | Self::Validation { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::DataSource { message, .. }
            | Self::Storage { message, .. }
            | Self::Host { message, .. }
            | Self::Template { message, .. }
            | Self::Merge { message, .. }
            | Self::Validation { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Scope a configuration error to a page
    pub fn for_page(mut self, name: impl Into<String>) -> Self {
        if let Self::Config { page, .. } = &mut self {
            *page = Some(name.into());
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::DataSource { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Host { .. } => 5,
            Self::Template { .. } => 6,
            Self::Merge { .. } => 7,
            Self::Validation { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::DataSource { code, .. }
            | Self::Storage { code, .. }
            | Self::Host { code, .. }
            | Self::Template { code, .. }
            | Self::Merge { code, .. }
            | Self::Validation { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message naming the failed stage
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, page, .. } => match page {
                Some(p) => format!("Page '{}' is misconfigured: {}", p, message),
                None => format!("Configuration problem: {}", message),
            },
            Self::DataSource { message, .. } => {
                format!("Could not compute the match datasets: {}", message)
            }
            Self::Storage { message, path, .. } => match path {
                Some(p) => format!("Cache error at {}: {}", p.display(), message),
                None => format!("Cache error: {}", message),
            },
            Self::Host {
                message, operation, ..
            } => format!("Rendering host failed during {}: {}", operation, message),
            Self::Template { message, .. } => format!("Page assembly failed: {}", message),
            Self::Merge { message, .. } => format!("Could not merge pages: {}", message),
            Self::Validation { message, field, .. } => match field {
                Some(f) => format!("Invalid value for '{}': {}", f, message),
                None => format!("Validation error: {}", message),
            },
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Whether this error must abort the whole run rather than a single page
    pub fn aborts_run(&self) -> bool {
        match self {
            Self::Host { code, .. } => *code == ErrorCode::HOST_RETRIES_EXHAUSTED,
            Self::DataSource { .. } | Self::Storage { .. } | Self::Merge { .. } => true,
            Self::Template { code, .. } => *code == ErrorCode::TEMPLATE_NO_PAGES,
            _ => false,
        }
    }
}

/// Type alias for Results using ReportError
pub type Result<T> = std::result::Result<T, ReportError>;

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::InvalidData => (ErrorCode::STORAGE_CORRUPTED, "Invalid data"),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        ReportError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_yaml::Error> for ReportError {
    fn from(err: serde_yaml::Error) -> Self {
        ReportError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<toml::de::Error> for ReportError {
    fn from(err: toml::de::Error) -> Self {
        ReportError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}

impl From<crate::cache::StorageError> for ReportError {
    fn from(err: crate::cache::StorageError) -> Self {
        use crate::cache::StorageError;

        match err {
            StorageError::Io(io_err) => ReportError::from(io_err),
            StorageError::Csv(msg) => {
                ReportError::storage_with_code(ErrorCode::STORAGE_CORRUPTED, msg, None)
            }
            StorageError::NotFound(msg) => {
                ReportError::storage_with_code(ErrorCode::STORAGE_NOT_FOUND, msg, None)
            }
            StorageError::Publish { path, message } => {
                ReportError::storage_with_code(ErrorCode::STORAGE_PUBLISH_FAILED, message, Some(path))
            }
            StorageError::Corrupted(msg) => {
                ReportError::storage_with_code(ErrorCode::STORAGE_CORRUPTED, msg, None)
            }
            StorageError::InvalidNamespace(name) => ReportError::storage_with_code(
                ErrorCode::STORAGE_INVALID_NAMESPACE,
                format!("'{name}' is not a cache namespace"),
                None,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "df.csv");
        let err = ReportError::storage("Cannot read artifact")
            .with_source(io_err)
            .with_context("while resolving cache entry");

        assert_eq!(err.code(), ErrorCode::STORAGE_GENERIC);
        assert!(err.to_string().contains("[E3000]"));
        assert!(err.user_message().contains("Cannot read artifact"));
    }

    #[test]
    fn test_page_config_error_names_page() {
        let err = ReportError::page_config("page7", "badge is missing pos_v_cm");
        assert_eq!(err.code(), ErrorCode::CONFIG_MISSING_REQUIRED);
        assert_eq!(err.exit_code(), 2);
        assert!(err.user_message().contains("page7"));
        assert!(!err.aborts_run());
    }

    #[test]
    fn test_host_exhausted_aborts_run() {
        let err = ReportError::host_exhausted("export", 12);
        assert!(err.aborts_run());
        assert!(err.to_string().contains("[E4001]"));
        assert!(err.to_string().contains("12 attempts"));

        let err = ReportError::host(ErrorCode::HOST_OPERATION_FAILED, "replace", "bad range");
        assert!(!err.aborts_run());
    }

    #[test]
    fn test_no_pages_lists_missing_templates() {
        let err = ReportError::no_pages(vec!["page3.yaml".into()], vec![]);
        assert!(err.to_string().contains("page3.yaml"));
        match err {
            ReportError::Template { missing, .. } => assert_eq!(missing, vec!["page3.yaml"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
