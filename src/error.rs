use serde::{ser::Serializer, Serialize};

use crate::controller::ReadError;
use crate::models::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Read-aloud controller mutex was poisoned - session state may be corrupted")]
    MutexPoisoned,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Read(ReadError::NothingToRead) => "NOTHING_TO_READ",
            Error::Read(ReadError::Unsupported) => "UNSUPPORTED",
            Error::MutexPoisoned => "MUTEX_POISONED",
            Error::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
