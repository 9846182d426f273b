mod assembler;
mod classifier;
mod context;
mod paths;
mod values;

pub use assembler::{
    BacktraceAssembler, DisplayMode, DisplayRecord, HighlightRef, LocalVariable, RangeSelector,
    VariableView,
};
pub use classifier::{Classification, FrameClassifier, InterpreterDesc, TransitionKind};
pub use context::{
    ScriptExecutionContext, ScriptFrame, ANONYMOUS_FRAME, NO_SCRIPT, OUTERMOST_FRAME_SPAN,
    UNNAMED_FUNCTION, WALK_STEP_LIMIT,
};
pub use paths::PathCompressor;
pub use values::{InterestingValue, ValueCorrelator, INTERESTING_LIMIT};
