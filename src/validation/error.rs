use std::fmt;

/// Discriminant for a validation failure.
///
/// The default request error handler maps kinds to status codes; everything
/// that is neither routing, media type, nor security falls under [`Schema`].
///
/// [`Schema`]: ValidationErrorKind::Schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A declared security requirement was not satisfied.
    Security,
    /// No declared path matches the request template.
    PathNotFound,
    /// A path matched, but not for this method.
    OperationNotFound,
    /// The payload's content type is not declared for the operation.
    UnsupportedMediaType,
    /// Parameter or body violates its declared schema.
    Schema,
}

/// One validation failure, ordered within a validation pass.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Where the failure was detected, e.g. `query.qParam` or `body`.
    pub location: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    /// Shorthand for the common schema-violation kind.
    pub fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::Schema, location, message)
    }
}

// The rendered form is what clients see in the `errors` array.
impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}
