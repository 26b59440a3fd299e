//! Top-level error type returned by the `configure` and `connect` drivers.

use thiserror::Error;

use crate::client::ClientError;
use crate::config::RegistryError;
use crate::console::{InputError, PromptError};
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Input(#[from] InputError),
}

impl From<PromptError> for Error {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::Input(e) => Error::Input(e),
            exhausted @ PromptError::Exhausted(_) => {
                Error::Validation(ValidationError::new(exhausted.to_string()))
            }
        }
    }
}
