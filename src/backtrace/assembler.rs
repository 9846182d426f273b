use std::collections::HashMap;

use serde::Serialize;

use crate::backend::{BlockSymbol, FrameKind, FrameSource, NativeFrame};

use super::classifier::{Classification, FrameClassifier};
use super::context::ScriptExecutionContext;
use super::paths::PathCompressor;
use super::values::ValueCorrelator;

/// Which slice of the wrapped frame list to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelector {
    All,
    /// Innermost `n` frames.
    FirstN(usize),
    /// Outermost `n` frames.
    LastN(usize),
    /// Inclusive ordinal range.
    Slice(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Terse,
    Normal,
    Full,
    Paste,
}

/// One local or argument enumerated from a frame's lexical block chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub value: String,
    pub is_argument: bool,
}

/// Highlight annotation for a repeated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightRef {
    pub label: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableView {
    pub name: String,
    pub value: String,
    pub highlight: Option<HighlightRef>,
}

/// One renderable entry of the assembled backtrace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    /// The native frame's build-pass ordinal. Synthetic records carry the
    /// ordinal of the boundary frame they replace.
    pub ordinal: usize,
    pub kind: FrameKind,
    pub synthetic: bool,
    pub name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub pc: Option<u64>,
    pub arguments: Vec<VariableView>,
    pub locals: Vec<VariableView>,
}

/// Per-invocation mutable state, built at the start of `assemble` and
/// threaded by reference through the passes; discarded at the end so
/// nothing leaks into the next stop.
struct PassContext {
    paths: PathCompressor,
    values: ValueCorrelator,
    contexts: HashMap<u64, ScriptExecutionContext>,
}

struct WrappedFrame<'a> {
    ordinal: usize,
    frame: &'a dyn NativeFrame,
    variables: Vec<LocalVariable>,
    classification: Classification,
}

/// Two-pass backtrace orchestration: build wrapped native frames (feeding
/// the path trie and value table, synthesizing script frames at
/// boundaries), finalize correlation, then render the requested range.
pub struct BacktraceAssembler<'a> {
    source: &'a dyn FrameSource,
    classifier: &'a FrameClassifier,
}

impl<'a> BacktraceAssembler<'a> {
    pub fn new(source: &'a dyn FrameSource, classifier: &'a FrameClassifier) -> Self {
        Self { source, classifier }
    }

    pub fn assemble(
        &self,
        range: RangeSelector,
        mode: DisplayMode,
        apply_filter: bool,
    ) -> Vec<DisplayRecord> {
        let mut pass = PassContext {
            paths: PathCompressor::new(),
            values: ValueCorrelator::new(),
            contexts: HashMap::new(),
        };

        // Build pass. Ordinals are assigned here, before any hiding or
        // synthesis, and never change afterwards.
        let mut wrapped = Vec::new();
        for (ordinal, frame) in self.source.frames(apply_filter).into_iter().enumerate() {
            if let Some(location) = frame.source_location() {
                pass.paths.consider_path(&location.file);
            }

            let variables = frame_variables(frame);
            for var in &variables {
                pass.values.consider_value(ordinal, &var.name, &var.value);
            }

            let classification = self.classifier.classify(frame, self.source, &mut pass.contexts);
            wrapped.push(WrappedFrame {
                ordinal,
                frame,
                variables,
                classification,
            });
        }

        pass.values.finalize();

        // Render pass over the selected sub-range.
        let mut records = Vec::new();
        for entry in select_range(&wrapped, range) {
            // Synthetic frames sit between the boundary frame and its
            // newer neighbors, so they come out first.
            for syn in &entry.classification.synthesized {
                records.push(synthetic_record(entry.ordinal, syn, mode, &pass));
            }
            if !entry.classification.hidden {
                records.push(native_record(entry, mode, &pass));
            }
        }
        records
    }
}

/// Enumerate a frame's locals and arguments by walking its lexical block;
/// a locals-only scope pulls arguments from its enclosing block. Read
/// failures substitute the error text for that one value.
fn frame_variables(frame: &dyn NativeFrame) -> Vec<LocalVariable> {
    let block = match frame.lexical_block() {
        Some(block) => block,
        None => return Vec::new(),
    };

    let mut symbols: Vec<BlockSymbol> = block.symbols.clone();
    if block.function.is_none() {
        if let Some(enclosing) = &block.enclosing {
            symbols.extend(enclosing.symbols.iter().cloned());
        }
    }

    symbols
        .into_iter()
        .map(|sym| {
            let value = match frame.read_local(&sym.name) {
                Ok(value) => value,
                Err(e) => e.to_string(),
            };
            LocalVariable {
                name: sym.name,
                value,
                is_argument: sym.is_argument,
            }
        })
        .collect()
}

fn select_range<'a>(wrapped: &'a [WrappedFrame<'a>], range: RangeSelector) -> &'a [WrappedFrame<'a>] {
    let len = wrapped.len();
    match range {
        RangeSelector::All => wrapped,
        RangeSelector::FirstN(n) => &wrapped[..n.min(len)],
        RangeSelector::LastN(n) => &wrapped[len.saturating_sub(n)..],
        RangeSelector::Slice(a, b) => {
            if a >= len || a > b {
                &[]
            } else {
                &wrapped[a..=b.min(len - 1)]
            }
        }
    }
}

fn variable_views(
    variables: &[LocalVariable],
    want_arguments: bool,
    pass: &PassContext,
) -> Vec<VariableView> {
    variables
        .iter()
        .filter(|var| var.is_argument == want_arguments)
        .map(|var| {
            let highlight = pass.values.info(&var.value).map(|info| HighlightRef {
                label: info.label.clone(),
                index: info.highlight,
            });
            VariableView {
                name: var.name.clone(),
                value: var.value.clone(),
                highlight,
            }
        })
        .collect()
}

fn native_record(entry: &WrappedFrame, mode: DisplayMode, pass: &PassContext) -> DisplayRecord {
    let frame = entry.frame;
    let name = frame.resolved_name().unwrap_or_else(|| "??".to_string());
    let location = frame.source_location();
    let line = location.as_ref().map(|loc| loc.line);
    let file = location.map(|loc| pass.paths.chew_path(&loc.file));

    let mut record = DisplayRecord {
        ordinal: entry.ordinal,
        kind: frame.kind(),
        synthetic: false,
        name,
        file: None,
        line,
        pc: None,
        arguments: Vec::new(),
        locals: Vec::new(),
    };

    match mode {
        DisplayMode::Terse => {}
        DisplayMode::Normal => {
            record.file = file;
            record.pc = Some(frame.program_counter());
            record.arguments = variable_views(&entry.variables, true, pass);
        }
        DisplayMode::Full => {
            record.file = file;
            record.pc = Some(frame.program_counter());
            record.arguments = variable_views(&entry.variables, true, pass);
            record.locals = variable_views(&entry.variables, false, pass);
        }
        DisplayMode::Paste => {
            record.file = file;
            record.arguments = variable_views(&entry.variables, true, pass);
        }
    }
    record
}

fn synthetic_record(
    ordinal: usize,
    frame: &super::context::ScriptFrame,
    mode: DisplayMode,
    pass: &PassContext,
) -> DisplayRecord {
    let mut record = DisplayRecord {
        ordinal,
        kind: FrameKind::Normal,
        synthetic: true,
        name: frame.function.clone(),
        file: None,
        line: Some(frame.line),
        pc: None,
        arguments: Vec::new(),
        locals: Vec::new(),
    };

    match mode {
        DisplayMode::Terse => {}
        DisplayMode::Normal | DisplayMode::Full => {
            record.file = Some(pass.paths.chew_path(&frame.file));
            record.pc = Some(frame.pc);
        }
        DisplayMode::Paste => {
            record.file = Some(pass.paths.chew_path(&frame.file));
        }
    }
    record
}
