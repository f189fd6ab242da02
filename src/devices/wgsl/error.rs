use core::fmt::Display;

use naga::{WithSpan, valid::ValidationError};

#[derive(Debug)]
pub enum TranslateError {
    Validate(WithSpan<ValidationError>),
    Frontend(naga::front::wgsl::ParseError),
    Backend(naga::back::spv::Error),
    /// The source has no compute entry point called `main`.
    MissingEntryPoint,
}

impl Display for TranslateError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TranslateError::Validate(validation_err) => validation_err.fmt(f),
            TranslateError::Frontend(frontend_err) => frontend_err.fmt(f),
            TranslateError::Backend(backend_err) => backend_err.fmt(f),
            TranslateError::MissingEntryPoint => {
                write!(f, "The shader source has no compute entry point named 'main'.")
            }
        }
    }
}

impl std::error::Error for TranslateError {}
