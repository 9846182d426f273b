/// Offset of one pointer-sized field inside a target structure.
///
/// All interpreter memory access goes through `FrameSource::read_field`
/// with one of these, so the unsafe pointer arithmetic lives entirely on
/// the backend side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub offset: u64,
}

impl FieldSpec {
    pub const fn at(offset: u64) -> Self {
        Self { offset }
    }
}

/// Memory layout of the interpreter structures the stack walker touches.
///
/// This is pure data describing the embedded interpreter's build; the
/// walker never dereferences anything except through these offsets.
#[derive(Debug, Clone)]
pub struct InterpreterLayout {
    /// Execution context -> pointer to its live register block.
    pub context_regs: FieldSpec,
    /// Execution context -> pointer to its current stack segment.
    pub context_segment: FieldSpec,

    /// Register block -> current frame pointer.
    pub regs_frame_ptr: FieldSpec,
    /// Register block -> current program counter.
    pub regs_pc: FieldSpec,

    /// Segment -> next-older segment in the same context (null = oldest).
    pub segment_older: FieldSpec,
    /// Segment -> register block saved when the segment was suspended.
    pub segment_saved_regs: FieldSpec,

    /// Script frame -> flag word.
    pub frame_flags: FieldSpec,
    /// Script frame -> callee function (valid when the function flag is set).
    pub frame_callee: FieldSpec,
    /// Script frame -> executed script (valid when the function flag is clear).
    pub frame_script: FieldSpec,
    /// Script frame -> caller's frame pointer (null = oldest in chain).
    pub frame_prev: FieldSpec,
    /// Script frame -> caller's saved program counter.
    pub frame_prev_pc: FieldSpec,

    /// Callee function -> interned name atom (null = unnamed).
    pub callee_atom: FieldSpec,
    /// Callee function -> its script.
    pub callee_script: FieldSpec,

    /// Name atom -> nul-terminated character data.
    pub atom_chars: FieldSpec,

    /// Script -> nul-terminated source path.
    pub script_path: FieldSpec,
    /// Script -> starting line number.
    pub script_line: FieldSpec,

    /// Bit set in the frame flag word for function (as opposed to
    /// top-level script) frames.
    pub function_flag: u64,
}
