use thiserror::Error;

#[derive(Error, Debug)]
pub enum XrrError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    /// Raised before any worker pool exists; fitting simply does not start.
    #[error("Fitting could not start: only {points} data point(s) in the fit range, need at least 2")]
    InsufficientData { points: usize },

    #[error("Evaluation Error: {0}")]
    Evaluation(String),

    #[error("Unknown element '{symbol}' at wavelength {lambda:e} m")]
    UnknownElement { symbol: String, lambda: f64 },

    #[error("Optimizer is unusable after a failed generation")]
    Poisoned,

    #[error("Thread Pool Error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type XrrResult<T> = Result<T, XrrError>;
