use std::fmt;
use thiserror::Error;

/// Pipeline stage in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Survey,
    Mesh,
    Assembly,
    Factorization,
    Solve,
    Evaluation,
    Sensitivity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Survey => "survey",
            Stage::Mesh => "mesh",
            Stage::Assembly => "assembly",
            Stage::Factorization => "factorization",
            Stage::Solve => "solve",
            Stage::Evaluation => "evaluation",
            Stage::Sensitivity => "sensitivity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MtError {
    /// Invalid input: fix the survey, mesh or selector and retry.
    #[error("configuration error during {stage}: {message}")]
    Configuration { stage: Stage, message: String },

    /// The linear algebra failed (singular system, non-finite solution).
    #[error("numerical error during {stage}: {message}")]
    Numerical { stage: Stage, message: String },

    /// The requested code path is intentionally absent.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
}

impl MtError {
    pub fn config(stage: Stage, message: impl Into<String>) -> Self {
        MtError::Configuration {
            stage,
            message: message.into(),
        }
    }

    pub fn numerical(stage: Stage, message: impl Into<String>) -> Self {
        MtError::Numerical {
            stage,
            message: message.into(),
        }
    }

    /// Attach the frequency at which a per-frequency computation failed.
    pub fn at_frequency(self, frequency: f64) -> Self {
        match self {
            MtError::Numerical { stage, message } => MtError::Numerical {
                stage,
                message: format!("{message} (frequency {frequency} Hz)"),
            },
            MtError::Configuration { stage, message } => MtError::Configuration {
                stage,
                message: format!("{message} (frequency {frequency} Hz)"),
            },
            other => other,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            MtError::Configuration { stage, .. } | MtError::Numerical { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub(crate) fn check_len(context: &'static str, expected: usize, found: usize) -> Result<(), MtError> {
    if expected == found {
        Ok(())
    } else {
        Err(MtError::DimensionMismatch {
            context,
            expected,
            found,
        })
    }
}
