use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RatingError {
    NonFinite,
    OutOfRange(f64),
}

impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RatingError::NonFinite => write!(f, "Rating computation produced a non-finite value"),
            RatingError::OutOfRange(value) => write!(f, "Rating {} is out of range", value),
        }
    }
}

impl std::error::Error for RatingError {}
