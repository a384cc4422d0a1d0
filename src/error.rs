pub use crate::types::DnsFuzzerError;

pub type Result<T> = std::result::Result<T, DnsFuzzerError>;

/// Turns a foreign error into one of our variants, prefixed with what we
/// were doing. `kind` is a variant constructor such as
/// `DnsFuzzerError::WordlistError`.
pub trait ErrorContext<T> {
    fn context_as<F>(self, kind: fn(String) -> DnsFuzzerError, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    fn config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
        Self: Sized,
    {
        self.context_as(DnsFuzzerError::ConfigError, f)
    }
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context_as<F>(self, kind: fn(String) -> DnsFuzzerError, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| kind(format!("{}: {}", f(), e)))
    }
}
