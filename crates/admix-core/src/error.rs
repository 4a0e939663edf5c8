//! Error types shared by the admix crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdmixError {
    /// Invalid dimensions or parameters: K = 0, mismatched G/Q/F shapes, bad genotype codes.
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unusable VCF input.
    #[error("VCF error: {message}")]
    Vcf { message: String },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, AdmixError>;

impl AdmixError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

