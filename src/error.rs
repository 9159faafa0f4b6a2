use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinchpinError>;

#[derive(Error, Debug)]
pub enum LinchpinError {
    #[error("dimensions don't match: {message}")]
    InvalidDimensions { message: String },

    #[error("bad input data: {message}")]
    Data { message: String },

    #[error("fit didn't converge: {message}")]
    Convergence { message: String },

    #[error("bad configuration: {parameter} = {value}")]
    Config { parameter: String, value: String },

    #[error("degenerate input: {message}")]
    DegenerateInput { message: String },

    #[error("numerical issues: {message}")]
    NumericalError { message: String },

    #[error("model not fitted yet - call fit() first")]
    ModelNotFitted,

    #[error("run was cancelled")]
    Cancelled,

    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("json output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file is broken: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LinchpinError {
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions { message: message.into() }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data { message: message.into() }
    }

    pub fn convergence(message: impl Into<String>) -> Self {
        Self::Convergence { message: message.into() }
    }

    pub fn config(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Config {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput { message: message.into() }
    }

    pub fn numerical_error(message: impl Into<String>) -> Self {
        Self::NumericalError { message: message.into() }
    }

    /// statistical failures are recovered per feature, everything else goes to the caller
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Convergence { .. } | Self::DegenerateInput { .. } | Self::NumericalError { .. }
        )
    }
}
