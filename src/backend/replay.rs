//! A deterministic in-memory backend.
//!
//! Frames, target memory, and symbol ranges are all canned up front, so a
//! whole stop of the target can be replayed without a live debugger behind
//! it. The demo binary and the test suite drive the engine through this.

use std::collections::HashMap;
use std::ops::Range;

use super::{
    FieldSpec, FrameKind, FrameSource, InterpreterLayout, LexicalBlock, NativeFrame,
    SourceLocation,
};
use crate::error::{MemoryReadError, ReadError};

/// One canned native frame.
pub struct ReplayFrame {
    pc: u64,
    name: Option<String>,
    location: Option<SourceLocation>,
    kind: FrameKind,
    block: Option<LexicalBlock>,
    locals: HashMap<String, String>,
    addresses: HashMap<String, u64>,
    filtered_out: bool,
}

impl ReplayFrame {
    pub fn new(pc: u64) -> Self {
        Self {
            pc,
            name: None,
            location: None,
            kind: FrameKind::Normal,
            block: None,
            locals: HashMap::new(),
            addresses: HashMap::new(),
            filtered_out: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.location = Some(SourceLocation {
            file: file.to_string(),
            line,
        });
        self
    }

    pub fn kind(mut self, kind: FrameKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn block(mut self, block: LexicalBlock) -> Self {
        self.block = Some(block);
        self
    }

    /// Add a readable local with a stringified value.
    pub fn local(mut self, name: &str, value: &str) -> Self {
        self.locals.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a pointer-valued local readable as a raw address.
    pub fn address_local(mut self, name: &str, address: u64) -> Self {
        self.addresses.insert(name.to_string(), address);
        self
    }

    /// Mark the frame as one the backend's own filters would drop.
    pub fn filtered_out(mut self) -> Self {
        self.filtered_out = true;
        self
    }
}

impl NativeFrame for ReplayFrame {
    fn program_counter(&self) -> u64 {
        self.pc
    }

    fn resolved_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn source_location(&self) -> Option<SourceLocation> {
        self.location.clone()
    }

    fn kind(&self) -> FrameKind {
        self.kind
    }

    fn lexical_block(&self) -> Option<LexicalBlock> {
        self.block.clone()
    }

    fn read_local(&self, name: &str) -> Result<String, ReadError> {
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| ReadError::Inaccessible(name.to_string()))
    }

    fn read_local_address(&self, name: &str) -> Result<u64, ReadError> {
        self.addresses
            .get(name)
            .copied()
            .ok_or_else(|| ReadError::Inaccessible(name.to_string()))
    }
}

/// Canned frames plus a word-granular image of target memory.
pub struct ReplaySource {
    frames: Vec<ReplayFrame>,
    words: HashMap<u64, u64>,
    strings: HashMap<u64, String>,
    symbols: HashMap<String, Range<u64>>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            words: HashMap::new(),
            strings: HashMap::new(),
            symbols: HashMap::new(),
        }
    }

    pub fn push_frame(&mut self, frame: ReplayFrame) {
        self.frames.push(frame);
    }

    /// Store one pointer-sized word of target memory.
    pub fn map_word(&mut self, address: u64, value: u64) {
        self.words.insert(address, value);
    }

    /// Store a nul-terminated string at an address.
    pub fn map_string(&mut self, address: u64, value: &str) {
        self.strings.insert(address, value.to_string());
    }

    pub fn map_symbol(&mut self, name: &str, range: Range<u64>) {
        self.symbols.insert(name.to_string(), range);
    }
}

impl Default for ReplaySource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ReplaySource {
    fn frames(&self, apply_filter: bool) -> Vec<&dyn NativeFrame> {
        self.frames
            .iter()
            .filter(|f| !(apply_filter && f.filtered_out))
            .map(|f| f as &dyn NativeFrame)
            .collect()
    }

    fn read_field(&self, base: u64, field: FieldSpec) -> Result<u64, MemoryReadError> {
        let address = base.wrapping_add(field.offset);
        self.words
            .get(&address)
            .copied()
            .ok_or(MemoryReadError { address })
    }

    fn read_c_string(&self, address: u64) -> Result<String, MemoryReadError> {
        self.strings
            .get(&address)
            .cloned()
            .ok_or(MemoryReadError { address })
    }

    fn resolve_symbol_range(&self, name: &str) -> Option<Range<u64>> {
        self.symbols.get(name).cloned()
    }
}

/// Field layout used by replayed interpreter images: every structure packs
/// its walker-visible fields into consecutive word slots.
pub fn word_layout() -> InterpreterLayout {
    InterpreterLayout {
        context_regs: FieldSpec::at(0),
        context_segment: FieldSpec::at(8),
        regs_frame_ptr: FieldSpec::at(0),
        regs_pc: FieldSpec::at(8),
        segment_older: FieldSpec::at(0),
        segment_saved_regs: FieldSpec::at(8),
        frame_flags: FieldSpec::at(0),
        frame_callee: FieldSpec::at(8),
        frame_script: FieldSpec::at(16),
        frame_prev: FieldSpec::at(24),
        frame_prev_pc: FieldSpec::at(32),
        callee_atom: FieldSpec::at(0),
        callee_script: FieldSpec::at(8),
        atom_chars: FieldSpec::at(0),
        script_path: FieldSpec::at(0),
        script_line: FieldSpec::at(8),
        function_flag: 0x2,
    }
}
