use thiserror::Error;

use crate::domain::CopulaFamily;

/// Errors raised by the analysis core.
///
/// Family- and replicate-level variants are normally captured as data inside
/// result records; only the condition-level ones leave `engine::analyze`.
#[derive(Error, Debug)]
pub enum CopulaError {
    #[error("Insufficient sample size: n={n} < minimum {min}")]
    InsufficientSampleSize { n: usize, min: usize },

    #[error("All requested copula families failed to fit")]
    AllFamiliesFailed,

    #[error("Optimizer did not converge for {family}: {message}")]
    OptimizerNonConvergence { family: CopulaFamily, message: String },

    #[error("Parameter estimate for {family} at search boundary: {message}")]
    DegenerateParameterBoundary { family: CopulaFamily, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis cancelled before all bootstrap replicates completed")]
    Cancelled,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CopulaResult<T> = Result<T, CopulaError>;

/// Process-level error carried up to `main`, with the exit code to use.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<CopulaError> for AppError {
    fn from(err: CopulaError) -> Self {
        let exit_code = match &err {
            CopulaError::InvalidInput(_)
            | CopulaError::Io(_)
            | CopulaError::Csv(_)
            | CopulaError::Json(_) => 2,
            CopulaError::InsufficientSampleSize { .. } | CopulaError::AllFamiliesFailed => 3,
            CopulaError::OptimizerNonConvergence { .. }
            | CopulaError::DegenerateParameterBoundary { .. } => 4,
            CopulaError::Cancelled => 5,
        };
        AppError::new(exit_code, err.to_string())
    }
}
