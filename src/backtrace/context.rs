use tracing::debug;

use crate::backend::{FrameSource, InterpreterLayout};
use crate::error::WalkError;

/// Hard cap on chain steps per walk; exceeding it is an inconsistency,
/// never a hang.
pub const WALK_STEP_LIMIT: usize = 10_000;

/// Approximate span of one interpreter activation on the native stack.
///
/// Only used by the fallback walk when a boundary frame's stop-pointer
/// local cannot be read: a script frame more than this many bytes above
/// the walk's starting frame pointer is treated as belonging to an older
/// activation. A heuristic carried over from the original tooling, never
/// fully validated there either.
pub const OUTERMOST_FRAME_SPAN: u64 = 8 * 1024;

/// Name shown for top-level (non-function) script frames.
pub const ANONYMOUS_FRAME: &str = "<anonymous>";
/// Name shown for function frames whose name atom is null.
pub const UNNAMED_FUNCTION: &str = "<unnamed>";
/// File shown for frames with a null script pointer.
pub const NO_SCRIPT: &str = "<none>";

/// One reconstructed interpreter frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub pc: u64,
}

/// Reconstructed register state of one interpreter execution context.
///
/// The context's state changes with control flow, so the walk rebuilds it:
/// `active` holds the current frame pointer and pc, and goes `None` exactly
/// when the interpreter has no live frame and the next-older suspended
/// segment must be consulted. Exists only for the duration of one
/// assembler invocation.
pub struct ScriptExecutionContext {
    active: Option<(u64, u64)>,
    /// Current stack segment; its older links are the suspended states.
    segment: u64,
}

impl ScriptExecutionContext {
    /// Capture a context's current register snapshot from its address.
    ///
    /// A null frame pointer here is expected (the context has pushed a new
    /// execution segment without establishing a frame yet) and resolves
    /// immediately to the top suspended state.
    pub fn capture(
        source: &dyn FrameSource,
        layout: &InterpreterLayout,
        context_addr: u64,
    ) -> Result<Self, WalkError> {
        let regs = source.read_field(context_addr, layout.context_regs)?;
        let segment = source.read_field(context_addr, layout.context_segment)?;

        let active = if regs == 0 {
            None
        } else {
            let fp = source.read_field(regs, layout.regs_frame_ptr)?;
            let pc = source.read_field(regs, layout.regs_pc)?;
            if fp == 0 {
                None
            } else {
                Some((fp, pc))
            }
        };

        let mut context = Self { active, segment };
        if context.active.is_none() {
            context.resolve(source, layout)?;
        }
        Ok(context)
    }

    /// The one transition out of the no-live-frame state: pop the next
    /// suspended segment's saved registers into `active`.
    fn resolve(
        &mut self,
        source: &dyn FrameSource,
        layout: &InterpreterLayout,
    ) -> Result<(), WalkError> {
        let older = source.read_field(self.segment, layout.segment_older)?;
        if older == 0 {
            return Err(WalkError::NoSuspendedState);
        }
        let regs = source.read_field(older, layout.segment_saved_regs)?;
        let fp = source.read_field(regs, layout.regs_frame_ptr)?;
        let pc = source.read_field(regs, layout.regs_pc)?;

        debug!(segment = older, frame_ptr = fp, "restored suspended segment");
        self.segment = older;
        self.active = if fp == 0 { None } else { Some((fp, pc)) };
        Ok(())
    }

    /// Explicitly pop the top suspended state, independent of whether a
    /// live frame exists. Generic-execute boundaries divert the context's
    /// frame into a suspended segment on entry, so their native frame must
    /// restore it while being unwound.
    pub fn restore_segment(
        &mut self,
        source: &dyn FrameSource,
        layout: &InterpreterLayout,
    ) -> Result<(), WalkError> {
        self.resolve(source, layout)
    }

    /// Pop frames off this context, emitting a synthetic frame for each,
    /// until the frame at `stop_frame_ptr` has been emitted.
    ///
    /// Frames are appended callee-before-caller, matching native ordering.
    /// The context advances past the stop frame so a later boundary picks
    /// up where this walk left off. Frames with a zero pc are dummy
    /// linkage frames and are skipped, not emitted.
    pub fn pop_until_frame(
        &mut self,
        source: &dyn FrameSource,
        layout: &InterpreterLayout,
        stop_frame_ptr: u64,
        out: &mut Vec<ScriptFrame>,
    ) -> Result<(), WalkError> {
        for _ in 0..WALK_STEP_LIMIT {
            let (fp, pc) = match self.active {
                Some(state) => state,
                None => match self.resolve(source, layout) {
                    Ok(()) => continue,
                    // The whole chain, suspended states included, ran out
                    // before the stop pointer.
                    Err(WalkError::NoSuspendedState) => return Err(WalkError::ChainExhausted),
                    Err(e) => return Err(e),
                },
            };

            let prev_fp = source.read_field(fp, layout.frame_prev)?;
            let prev_pc = source.read_field(fp, layout.frame_prev_pc)?;

            if pc != 0 {
                out.push(describe_frame(source, layout, fp, pc));
            }

            let done = fp == stop_frame_ptr;
            self.active = if prev_fp == 0 {
                None
            } else {
                Some((prev_fp, prev_pc))
            };
            if done {
                return Ok(());
            }
        }
        Err(WalkError::StepLimitExceeded(WALK_STEP_LIMIT))
    }

    /// Approximate fallback walk for boundaries whose stop pointer is
    /// unreadable: pop frames while they stay within `span` bytes above
    /// the starting frame pointer, and accept running off the chain as
    /// reaching the outermost frame.
    pub fn pop_within_span(
        &mut self,
        source: &dyn FrameSource,
        layout: &InterpreterLayout,
        span: u64,
        out: &mut Vec<ScriptFrame>,
    ) -> Result<(), WalkError> {
        let (start_fp, _) = match self.active {
            Some(state) => state,
            None => return Ok(()),
        };

        for _ in 0..WALK_STEP_LIMIT {
            let (fp, pc) = match self.active {
                Some(state) => state,
                None => match self.resolve(source, layout) {
                    Ok(()) => continue,
                    Err(WalkError::NoSuspendedState) => return Ok(()),
                    Err(e) => return Err(e),
                },
            };

            if fp.wrapping_sub(start_fp) > span {
                return Ok(());
            }

            let prev_fp = source.read_field(fp, layout.frame_prev)?;
            let prev_pc = source.read_field(fp, layout.frame_prev_pc)?;

            if pc != 0 {
                out.push(describe_frame(source, layout, fp, pc));
            }

            self.active = if prev_fp == 0 {
                None
            } else {
                Some((prev_fp, prev_pc))
            };
        }
        Err(WalkError::StepLimitExceeded(WALK_STEP_LIMIT))
    }
}

/// Build a synthetic frame from the frame's own data. Read failures on
/// descriptive fields degrade to placeholders; they never abort the walk.
fn describe_frame(
    source: &dyn FrameSource,
    layout: &InterpreterLayout,
    frame_ptr: u64,
    pc: u64,
) -> ScriptFrame {
    let flags = source.read_field(frame_ptr, layout.frame_flags).unwrap_or(0);

    let (function, script_ptr) = if flags & layout.function_flag != 0 {
        match source.read_field(frame_ptr, layout.frame_callee) {
            Ok(callee) if callee != 0 => {
                let function = match source.read_field(callee, layout.callee_atom) {
                    Ok(0) => UNNAMED_FUNCTION.to_string(),
                    Ok(atom) => read_atom(source, layout, atom),
                    Err(_) => "???".to_string(),
                };
                let script_ptr = source.read_field(callee, layout.callee_script).unwrap_or(0);
                (function, script_ptr)
            }
            _ => (UNNAMED_FUNCTION.to_string(), 0),
        }
    } else {
        let script_ptr = source.read_field(frame_ptr, layout.frame_script).unwrap_or(0);
        (ANONYMOUS_FRAME.to_string(), script_ptr)
    };

    let (file, line) = if script_ptr != 0 {
        let file = source
            .read_field(script_ptr, layout.script_path)
            .and_then(|p| source.read_c_string(p))
            .unwrap_or_else(|_| "???".to_string());
        let line = source
            .read_field(script_ptr, layout.script_line)
            .unwrap_or(0) as u32;
        (file, line)
    } else {
        (NO_SCRIPT.to_string(), 0)
    };

    ScriptFrame {
        function,
        file,
        line,
        pc,
    }
}

fn read_atom(source: &dyn FrameSource, layout: &InterpreterLayout, atom: u64) -> String {
    source
        .read_field(atom, layout.atom_chars)
        .and_then(|chars| source.read_c_string(chars))
        .unwrap_or_else(|_| "???".to_string())
}
