use thiserror::Error;

pub type Result<T> = std::result::Result<T, PolicyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("invalid configuration: {parameter}={value} ({constraint})")]
    InvalidConfiguration {
        parameter: &'static str,
        value: String,
        constraint: &'static str,
    },
}

impl PolicyError {
    pub fn invalid_configuration(
        parameter: &'static str,
        value: impl ToString,
        constraint: &'static str,
    ) -> Self {
        Self::InvalidConfiguration {
            parameter,
            value: value.to_string(),
            constraint,
        }
    }

    pub fn parameter(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration { parameter, .. } => parameter,
        }
    }
}
