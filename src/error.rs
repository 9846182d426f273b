use thiserror::Error;

/// A frame-local variable could not be read from the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("variable `{0}` was optimized out")]
    OptimizedOut(String),
    #[error("variable `{0}` is not accessible in this frame")]
    Inaccessible(String),
}

/// A raw memory read against the target failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot read target memory at {address:#x}")]
pub struct MemoryReadError {
    pub address: u64,
}

/// The synthesized-frame walk could not reach its required stopping point.
///
/// Fatal only for the one boundary frame whose synthesis was in progress;
/// the assembler shows that native frame unhidden and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("frame chain exhausted before reaching the stop pointer")]
    ChainExhausted,
    #[error("no suspended execution segment left to restore")]
    NoSuspendedState,
    #[error("walk exceeded the step limit of {0} frames")]
    StepLimitExceeded(usize),
    #[error("walk hit unreadable chain memory: {0}")]
    Memory(#[from] MemoryReadError),
    #[error("boundary frame local could not be read: {0}")]
    BoundaryLocal(#[from] ReadError),
}

/// Classifier setup found none of the interpreter entry points.
///
/// Reported once per session; script-frame synthesis is disabled for the
/// rest of the session and native frames render normally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("none of the interpreter entry points resolved: {missing:?}")]
pub struct ConfigurationError {
    pub missing: Vec<String>,
}

/// The backtrace command argument string could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized word `{0}`")]
    UnknownWord(String),
    #[error("malformed frame range `{0}`")]
    BadRange(String),
}
