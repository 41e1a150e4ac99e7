#[derive(Debug, Clone, PartialEq)]
pub enum OcError {
    NonBinaryMask {
        mask: &'static str,
    },
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    InvalidInterval {
        reason: String,
    },
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    JacobianNotImplemented {
        model: &'static str,
        jacobian: &'static str,
    },
}

impl std::fmt::Display for OcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcError::NonBinaryMask { mask } => {
                write!(f, "Mask '{}' must only contain the values 0 and 1", mask)
            }
            OcError::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "Shape of {} is invalid. Expected: '{:?}', Actual: '{:?}'",
                what, expected, actual
            ),
            OcError::InvalidInterval { reason } => {
                write!(f, "Cost interval is invalid: {}", reason)
            }
            OcError::InvalidConfig { field, reason } => {
                write!(f, "Config field '{}' is invalid: {}", field, reason)
            }
            OcError::JacobianNotImplemented { model, jacobian } => write!(
                f,
                "Model '{}' does not implement the {} Jacobian",
                model, jacobian
            ),
        }
    }
}

impl std::error::Error for OcError {}

pub type OcResult<T> = Result<T, OcError>;

pub(crate) fn check_shape(
    what: &'static str,
    expected: &[usize],
    actual: &[usize],
) -> OcResult<()> {
    if expected != actual {
        return Err(OcError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
