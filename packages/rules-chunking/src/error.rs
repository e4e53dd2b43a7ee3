use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkingError>;

#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Configuration error: invalid value {value} for '{field}'. {hint}")]
    Configuration {
        field: String,
        value: String,
        hint: String,
    },

    #[error("Chunk {}/{} failed (sources: {}): {}", .chunk_index + 1, .total_chunks, .sources, .cause)]
    ChunkCompilation {
        chunk_index: usize,
        total_chunks: usize,
        sources: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("Compilation failed: {0}")]
    Compilation(#[source] anyhow::Error),

    #[error("Merge invariant violated: {0}")]
    MergeInvariantViolation(String),

    #[error("Compilation cancelled")]
    Cancelled,

    #[error("hostlist-compiler not found. Install with: npm install -g @adguard/hostlist-compiler")]
    CompilerNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Chunk task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ChunkingError {
    pub fn config(
        field: impl Into<String>,
        value: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            field: field.into(),
            value: value.to_string(),
            hint: hint.into(),
        }
    }

    pub fn merge_invariant<E: std::fmt::Display>(e: E) -> Self {
        Self::MergeInvariantViolation(e.to_string())
    }

    /// Index of the failing chunk, if this error came from one.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::ChunkCompilation { chunk_index, .. } => Some(*chunk_index),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } | Self::Json(_) | Self::Yaml(_) => ErrorCategory::Config,
            Self::ChunkCompilation { .. } | Self::Compilation(_) | Self::CompilerNotFound => {
                ErrorCategory::Delegate
            }
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::MergeInvariantViolation(_) | Self::Io(_) | Self::Join(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Coarse error category for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Invalid options or configuration input, surfaced before any chunk runs
    Config,
    /// The delegate compiler failed
    Delegate,
    /// The run was cancelled by the caller
    Cancelled,
    /// Broken invariant, IO or task failure
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Delegate => "delegate",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
