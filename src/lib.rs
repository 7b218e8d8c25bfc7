// Workspace facade: the analysis engine and the models it shares with callers.
pub use engine;
pub use shared;
