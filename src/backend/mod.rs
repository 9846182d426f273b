mod layout;
pub mod replay;

use std::ops::Range;

use serde::Serialize;

use crate::error::{MemoryReadError, ReadError};

pub use layout::{FieldSpec, InterpreterLayout};

/// How the backend classified a native frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKind {
    Normal,
    /// A dummy frame for a function call issued by the debugger itself.
    CalledFromDebugger,
    SignalHandler,
}

/// Resolved source position of a native frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// One symbol visible in a lexical block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSymbol {
    pub name: String,
    pub is_argument: bool,
}

/// A frame's lexical block chain, as the debug info describes it.
///
/// When a frame's innermost block is a locals-only scope (no owning
/// function), its arguments live in the enclosing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalBlock {
    /// Name of the function owning this block, if it is a function scope.
    pub function: Option<String>,
    pub symbols: Vec<BlockSymbol>,
    pub enclosing: Option<Box<LexicalBlock>>,
}

/// One native stack frame handed out by the debugging backend.
///
/// Handles are only valid while the target is stopped; the assembler
/// borrows them for a single invocation and never retains them.
pub trait NativeFrame {
    fn program_counter(&self) -> u64;

    /// The calling (older) frame, when the backend links frames directly.
    fn older(&self) -> Option<&dyn NativeFrame> {
        None
    }

    /// The called (newer) frame.
    fn newer(&self) -> Option<&dyn NativeFrame> {
        None
    }

    /// Resolved symbol name, if debug info covers this pc.
    fn resolved_name(&self) -> Option<String>;

    fn source_location(&self) -> Option<SourceLocation>;

    fn kind(&self) -> FrameKind;

    /// The frame's lexical block, if the debug info has one.
    fn lexical_block(&self) -> Option<LexicalBlock>;

    /// Read a local or argument and stringify it the way the backend
    /// would print it.
    fn read_local(&self, name: &str) -> Result<String, ReadError>;

    /// Read a pointer-valued local as a raw address. Used for the
    /// interpreter-boundary locals (context pointer, stop frame pointer).
    fn read_local_address(&self, name: &str) -> Result<u64, ReadError>;
}

/// The native debugging backend: frame enumeration plus raw memory access.
pub trait FrameSource {
    /// The current stop's frames, innermost first. `apply_filter` asks the
    /// backend to run its own frame filters before handing frames over.
    /// The sequence is finite and not restartable within one stop.
    fn frames(&self, apply_filter: bool) -> Vec<&dyn NativeFrame>;

    /// Read one pointer-sized field at a known offset from a base address.
    fn read_field(&self, base: u64, field: FieldSpec) -> Result<u64, MemoryReadError>;

    /// Read a nul-terminated string out of target memory.
    fn read_c_string(&self, address: u64) -> Result<String, MemoryReadError>;

    /// Resolve a function symbol to its `[start, end)` pc range.
    fn resolve_symbol_range(&self, name: &str) -> Option<Range<u64>>;
}
