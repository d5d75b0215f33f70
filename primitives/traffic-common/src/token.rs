//! Source of the GitHub token attached to API requests.

/// Supplies the personal access token, if any, for each request.
///
/// The accessor asks on every request, so an implementation may rotate
/// tokens or read them lazily.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A token that may or may not be configured.
impl TokenProvider for Option<String> {
    fn token(&self) -> Option<String> {
        self.clone()
    }
}

impl TokenProvider for String {
    fn token(&self) -> Option<String> {
        Some(self.clone())
    }
}
