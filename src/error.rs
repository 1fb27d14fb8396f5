use parse_display::Display;

use crate::value::ValueKind;

/// An explicit attribute conflicts with the default declared for the same key.
#[non_exhaustive]
#[derive(Display, Debug, Clone, PartialEq, Eq)]
#[display("attribute `{key}` must be {expected} to match its default, found {found}")]
pub struct ValidationError {
    pub key: String,
    pub expected: ValueKind,
    pub found: ValueKind,
}
impl std::error::Error for ValidationError {}

#[non_exhaustive]
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display("{0}")]
    Validation(ValidationError),

    #[display("event `{descriptor}` refers to handler `{handler}`, which does not exist")]
    UnknownHandler { descriptor: String, handler: String },

    #[display("invalid event descriptor `{text}`")]
    InvalidDescriptor { text: String },

    #[display("expected a JSON object, found {found}")]
    NotAnObject { found: ValueKind },
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}
impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
