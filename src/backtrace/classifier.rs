use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use tracing::{debug, warn};

use crate::backend::{FrameSource, InterpreterLayout, NativeFrame};
use crate::error::{ConfigurationError, WalkError};

use super::context::{ScriptExecutionContext, ScriptFrame};

/// What a native frame's pc means for the interleaved walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Interpreter main loop; hidden, the surrounding boundary pops.
    InterpreterLoop,
    /// Generic invoke entry; pops script frames up to its target.
    GenericInvoke,
    /// Generic execute entry; pops like invoke, then restores the segment
    /// the entry diverted on its way in.
    GenericExecute,
    /// Trampoline into host-native bindings; hidden, no synthesis.
    HostDispatch,
}

/// Everything the classifier needs to know about the embedded interpreter:
/// entry-point symbols, the boundary frames' local names, the runtime's
/// internal naming conventions, and the structure layout for the walker.
#[derive(Debug, Clone)]
pub struct InterpreterDesc {
    pub loop_symbol: String,
    pub invoke_symbol: String,
    pub execute_symbol: String,
    pub dispatch_symbol: String,
    /// Local holding the execution-context pointer in boundary frames.
    pub context_local: String,
    /// Local holding the walk's stop frame pointer in invoke frames.
    pub invoke_target_local: String,
    /// Local holding the walk's stop frame pointer in execute frames.
    pub execute_target_local: String,
    /// Symbol prefixes of interpreter/runtime internals, suppressed as
    /// uninteresting.
    pub internal_prefixes: Vec<String>,
    pub layout: InterpreterLayout,
    /// Span for the fallback walk when a stop pointer is unreadable.
    pub outermost_frame_span: u64,
}

/// Result of classifying one native frame.
pub struct Classification {
    pub hidden: bool,
    pub synthesized: Vec<ScriptFrame>,
}

impl Classification {
    fn visible() -> Self {
        Self {
            hidden: false,
            synthesized: Vec::new(),
        }
    }

    fn hidden() -> Self {
        Self {
            hidden: true,
            synthesized: Vec::new(),
        }
    }
}

/// Maps native frame pcs to transition kinds via an ordered range table.
///
/// Built once per debugging session (symbol addresses do not move while
/// the binary stays loaded) and shared read-only by every assembler
/// invocation afterwards.
pub struct FrameClassifier {
    desc: InterpreterDesc,
    /// `(pc range, kind)`, sorted by range start.
    ranges: Vec<(Range<u64>, TransitionKind)>,
}

impl FrameClassifier {
    /// Resolve the entry-point table against the loaded binary. A missing
    /// symbol just never triggers its transition; all of them missing is a
    /// `ConfigurationError`, after which `native_only` keeps the session
    /// usable without synthesis.
    pub fn build(
        source: &dyn FrameSource,
        desc: InterpreterDesc,
    ) -> Result<Self, ConfigurationError> {
        let entries = [
            (&desc.loop_symbol, TransitionKind::InterpreterLoop),
            (&desc.invoke_symbol, TransitionKind::GenericInvoke),
            (&desc.execute_symbol, TransitionKind::GenericExecute),
            (&desc.dispatch_symbol, TransitionKind::HostDispatch),
        ];

        let mut ranges = Vec::new();
        let mut missing = Vec::new();
        for (symbol, kind) in entries {
            match source.resolve_symbol_range(symbol) {
                Some(range) => ranges.push((range, kind)),
                None => {
                    debug!(symbol, "interpreter entry point not in binary");
                    missing.push(symbol.clone());
                }
            }
        }

        if ranges.is_empty() {
            warn!(
                ?missing,
                "no interpreter entry points resolved, script-frame synthesis disabled"
            );
            return Err(ConfigurationError { missing });
        }

        ranges.sort_by_key(|(range, _)| range.start);
        Ok(Self { desc, ranges })
    }

    /// A classifier with no entry-point ranges: no frame synthesis, but
    /// internals-prefix suppression still applies.
    pub fn native_only(desc: InterpreterDesc) -> Self {
        Self {
            desc,
            ranges: Vec::new(),
        }
    }

    fn kind_for(&self, pc: u64) -> Option<TransitionKind> {
        let i = self.ranges.partition_point(|(range, _)| range.start <= pc);
        if i == 0 {
            return None;
        }
        let (range, kind) = &self.ranges[i - 1];
        if pc < range.end {
            Some(*kind)
        } else {
            None
        }
    }

    fn is_internal(&self, frame: &dyn NativeFrame) -> bool {
        match frame.resolved_name() {
            Some(name) => self
                .desc
                .internal_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str())),
            None => false,
        }
    }

    /// Classify one native frame, synthesizing script frames at invoke and
    /// execute boundaries. `contexts` is the invocation-scoped map of live
    /// execution contexts, keyed by context address.
    pub fn classify(
        &self,
        frame: &dyn NativeFrame,
        source: &dyn FrameSource,
        contexts: &mut HashMap<u64, ScriptExecutionContext>,
    ) -> Classification {
        match self.kind_for(frame.program_counter()) {
            Some(TransitionKind::InterpreterLoop) | Some(TransitionKind::HostDispatch) => {
                Classification::hidden()
            }
            Some(TransitionKind::GenericInvoke) => {
                self.synthesize(frame, source, contexts, false)
            }
            Some(TransitionKind::GenericExecute) => {
                self.synthesize(frame, source, contexts, true)
            }
            None => {
                if self.is_internal(frame) {
                    Classification::hidden()
                } else {
                    Classification::visible()
                }
            }
        }
    }

    fn synthesize(
        &self,
        frame: &dyn NativeFrame,
        source: &dyn FrameSource,
        contexts: &mut HashMap<u64, ScriptExecutionContext>,
        restore_after: bool,
    ) -> Classification {
        match self.try_synthesize(frame, source, contexts, restore_after) {
            Ok(synthesized) => Classification {
                hidden: true,
                synthesized,
            },
            // The boundary's synthesis failed; show the native frame as an
            // ordinary one and leave the rest of the backtrace alone.
            Err(e) => {
                warn!(
                    pc = frame.program_counter(),
                    error = %e,
                    "abandoning script-frame synthesis for boundary frame"
                );
                Classification::visible()
            }
        }
    }

    fn try_synthesize(
        &self,
        frame: &dyn NativeFrame,
        source: &dyn FrameSource,
        contexts: &mut HashMap<u64, ScriptExecutionContext>,
        restore_after: bool,
    ) -> Result<Vec<ScriptFrame>, WalkError> {
        let context_addr = frame.read_local_address(&self.desc.context_local)?;
        let layout = &self.desc.layout;

        let context = match contexts.entry(context_addr) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(ScriptExecutionContext::capture(source, layout, context_addr)?)
            }
        };

        let target_local = if restore_after {
            &self.desc.execute_target_local
        } else {
            &self.desc.invoke_target_local
        };

        let mut synthesized = Vec::new();
        match frame.read_local_address(target_local) {
            Ok(stop_frame_ptr) => {
                context.pop_until_frame(source, layout, stop_frame_ptr, &mut synthesized)?
            }
            Err(e) => {
                debug!(
                    local = target_local.as_str(),
                    error = %e,
                    "stop pointer unreadable, walking within the stack span bound"
                );
                context.pop_within_span(
                    source,
                    layout,
                    self.desc.outermost_frame_span,
                    &mut synthesized,
                )?
            }
        }

        if restore_after {
            context.restore_segment(source, layout)?;
        }
        Ok(synthesized)
    }
}
