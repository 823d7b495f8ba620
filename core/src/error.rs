use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Schema error in '{file}': missing required columns {missing:?}")]
    Schema { file: String, missing: Vec<String> },

    #[error("Model expects {model} features, metadata lists {metadata}. {remedy}")]
    Mismatch {
        metadata: usize,
        model:    usize,
        remedy:   String,
    },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Shape error in {context}: expected {expected}, got {actual}")]
    Shape {
        context:  &'static str,
        expected: usize,
        actual:   usize,
    },

    #[error("Metadata contract violated: {0}")]
    Meta(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("CSV parse error in '{path}' at line {line}: {reason}")]
    Csv {
        path:   String,
        line:   usize,
        reason: String,
    },

    #[error("Model has not been fitted")]
    ModelNotFitted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
