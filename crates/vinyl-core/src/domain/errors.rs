use std::path::PathBuf;

pub type VinylResult<T> = Result<T, VinylError>;

/// Stable error categories with the exit codes the CLI maps them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VinylErrorKind {
    Type,
    Io,
    NotImplemented,
}

impl VinylErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "TypeError",
            Self::Io => "IoError",
            Self::NotImplemented => "NotImplementedError",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Type => 2,
            Self::Io => 3,
            Self::NotImplemented => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VinylError {
    #[error("calculator `{field}` is required")]
    MissingField { field: &'static str },
    #[error("calculator `{field}` must not be empty")]
    EmptyField { field: &'static str },
    #[error("calculator `{field}` expects {expected}, got {actual}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
    #[error(
        "calculator `{field}` must declare one entry per output key: {expected} keys, {actual} entries"
    )]
    OutputArityMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("dataset key `{key}` is already present in the collection")]
    DuplicateDatasetKey { key: String },
    #[error("parameter `{name}` is already present in the parameter set")]
    DuplicateParameter { name: String },
    #[error("value {value} is illegal for parameter `{name}`")]
    IllegalParameterValue { name: String, value: String },
    #[error("parameter `{name}` {constraint} must be declared either all legal or all illegal")]
    MixedConstraintValidity {
        name: String,
        constraint: &'static str,
    },
    #[error("failed to write calculator snapshot '{}': {reason}", path.display())]
    SnapshotWrite { path: PathBuf, reason: String },
    #[error("failed to restore calculator snapshot '{}': {reason}", path.display())]
    SnapshotRestore { path: PathBuf, reason: String },
    #[error("`{operation}` must be provided by the concrete calculator")]
    NotImplemented { operation: &'static str },
}

impl VinylError {
    pub const fn kind(&self) -> VinylErrorKind {
        match self {
            Self::MissingField { .. }
            | Self::EmptyField { .. }
            | Self::InvalidField { .. }
            | Self::OutputArityMismatch { .. }
            | Self::DuplicateDatasetKey { .. }
            | Self::DuplicateParameter { .. }
            | Self::IllegalParameterValue { .. }
            | Self::MixedConstraintValidity { .. } => VinylErrorKind::Type,
            Self::SnapshotWrite { .. } | Self::SnapshotRestore { .. } => VinylErrorKind::Io,
            Self::NotImplemented { .. } => VinylErrorKind::NotImplemented,
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {self}", self.kind().as_str())
    }
}
