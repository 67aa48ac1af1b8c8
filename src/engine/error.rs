/// Contract errors from the scheduling core.
///
/// These never reach the user as raw errors — callers translate them into
/// form-level validation messages. An unknown slot label is deliberately NOT
/// represented here: that is a caller contract violation and panics loudly
/// (see [`crate::engine::Selection::toggle`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The normalizer was invoked with nothing selected.
    EmptySelection,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::EmptySelection => write!(f, "no time slots selected"),
        }
    }
}

impl std::error::Error for EngineError {}
