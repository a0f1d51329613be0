/// Error types for sqlx-named-scan
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template could not be rewritten
    #[error("Invalid SQL template: {0}")]
    InvalidTemplate(String),

    /// A named template accepts exactly one argument
    #[error("Named template expects a single argument, got {0}")]
    TooManyArguments(usize),

    /// A named parameter has no counterpart in the supplied argument
    #[error("Named parameter ':{0}' could not be resolved from the argument")]
    UnresolvedIdentifier(String),

    /// A list meant for expansion had no elements
    #[error("Cannot expand empty list for '{0}'")]
    EmptyList(String),

    /// Placeholder count and value count disagree after expansion
    #[error("Query has {placeholders} placeholder(s) but {values} value(s) were supplied")]
    ArgumentCountMismatch { placeholders: usize, values: usize },

    /// The argument cannot be bound by the driver
    #[error("Unsupported argument type: {0}")]
    UnsupportedArgumentType(String),

    /// The driver returned an unusable column list
    #[error("Invalid result columns: {0}")]
    InvalidColumns(String),

    /// A result column has no destination field
    #[error("Missing destination field for column '{column}' in {target}")]
    UnmappedColumn { column: String, target: String },

    /// The scanner was used in an unsupported way
    #[error("Usage error: {0}")]
    UsageError(String),

    /// Single-row mode produced no rows
    #[error("No rows in result set")]
    NotFound,

    /// Single-row mode produced more than one row
    #[error("Expected exactly one row, got more")]
    TooManyRows,

    /// A column value could not be stored into its destination
    #[error("Cannot convert {found} into {expected}")]
    Conversion {
        expected: &'static str,
        found: &'static str,
    },

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error from any other driver implementation
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an arbitrary driver error, keeping it reachable through `source()`.
    pub fn driver<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Driver(err.into())
    }

    /// True for single-row misses, whether reported by this crate or by SQLx.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound | Error::Database(sqlx::Error::RowNotFound))
    }
}

/// Result type alias for sqlx-named-scan operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
