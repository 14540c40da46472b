use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidCategory(String),
    InvalidDecision(String),
    InvalidId(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidCategory(value) => {
                write!(f, "invalid rating category: {value}")
            }
            ModelError::InvalidDecision(value) => {
                write!(f, "invalid comparison decision: {value}")
            }
            ModelError::InvalidId(value) => {
                write!(f, "invalid ranked item id: {value}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
