/// Construction-time validation for configuration/parameter structs.
///
/// Builders across the workspace call [`Validator::validate`] before returning `Ok`, so invalid
/// configuration is surfaced synchronously as a `ParameterError` rather than discovered mid-run.
pub trait Validator {
    type Error;

    /// Validate `self`, returning `self` unchanged on success so calls can be chained inside a
    /// builder's `build()` method with `?`.
    fn validate(self) -> Result<Self, Self::Error>
    where
        Self: Sized;
}
