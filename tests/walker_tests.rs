use script_backtrace::backend::replay::{word_layout, ReplayFrame, ReplaySource};
use script_backtrace::backend::InterpreterLayout;
use script_backtrace::backtrace::{
    BacktraceAssembler, DisplayMode, FrameClassifier, InterpreterDesc, PathCompressor,
    RangeSelector, ScriptExecutionContext, ScriptFrame, ValueCorrelator, ANONYMOUS_FRAME,
    INTERESTING_LIMIT, NO_SCRIPT, OUTERMOST_FRAME_SPAN, UNNAMED_FUNCTION,
};
use script_backtrace::error::WalkError;

fn layout() -> InterpreterLayout {
    word_layout()
}

fn desc() -> InterpreterDesc {
    InterpreterDesc {
        loop_symbol: "vm::Interpret".to_string(),
        invoke_symbol: "vm::RunScript".to_string(),
        execute_symbol: "vm::Execute".to_string(),
        dispatch_symbol: "vm::CallHostMethod".to_string(),
        context_local: "cx".to_string(),
        invoke_target_local: "fp".to_string(),
        execute_target_local: "prev".to_string(),
        internal_prefixes: vec!["vm::".to_string()],
        layout: word_layout(),
        outermost_frame_span: OUTERMOST_FRAME_SPAN,
    }
}

fn map_entry_symbols(source: &mut ReplaySource) {
    source.map_symbol("vm::Interpret", 0x1000..0x2000);
    source.map_symbol("vm::RunScript", 0x2000..0x3000);
    source.map_symbol("vm::Execute", 0x3000..0x4000);
    source.map_symbol("vm::CallHostMethod", 0x4000..0x5000);
}

// Top-level (non-function) script frame in the word layout.
fn map_script_frame(source: &mut ReplaySource, fp: u64, script: u64, prev: u64, prev_pc: u64) {
    source.map_word(fp, 0);
    source.map_word(fp + 16, script);
    source.map_word(fp + 24, prev);
    source.map_word(fp + 32, prev_pc);
}

fn map_script(source: &mut ReplaySource, script: u64, path_addr: u64, path: &str, line: u64) {
    source.map_word(script, path_addr);
    source.map_word(script + 8, line);
    source.map_string(path_addr, path);
}

fn map_context(source: &mut ReplaySource, cx: u64, fp: u64, pc: u64) {
    let regs = cx + 0x100;
    let segment = cx + 0x200;
    source.map_word(cx, regs);
    source.map_word(cx + 8, segment);
    source.map_word(regs, fp);
    source.map_word(regs + 8, pc);
    source.map_word(segment, 0);
}

#[cfg(test)]
mod path_tests {
    use super::*;

    #[test]
    fn sibling_paths_chew_to_divergent_suffixes() {
        let mut paths = PathCompressor::new();
        paths.consider_path("/src/repo/a/b/file.cpp");
        paths.consider_path("/src/repo/a/c/file2.cpp");

        assert_eq!(paths.chew_path("/src/repo/a/b/file.cpp"), "b/file.cpp");
        assert_eq!(paths.chew_path("/src/repo/a/c/file2.cpp"), "c/file2.cpp");
    }

    #[test]
    fn lone_path_is_unchanged() {
        let mut paths = PathCompressor::new();
        paths.consider_path("/src/repo/only/file.cpp");
        assert_eq!(
            paths.chew_path("/src/repo/only/file.cpp"),
            "/src/repo/only/file.cpp",
            "a path with no siblings has no divergence point"
        );
    }

    #[test]
    fn single_segment_path_is_unchanged() {
        let mut paths = PathCompressor::new();
        paths.consider_path("file.cpp");
        assert_eq!(paths.chew_path("file.cpp"), "file.cpp");
    }

    #[test]
    fn novel_path_chews_to_itself() {
        let mut paths = PathCompressor::new();
        paths.consider_path("/src/a/file.cpp");
        // Never considered: well-defined, just uncompressed.
        assert_eq!(paths.chew_path("/other/b/file.cpp"), "/other/b/file.cpp");
    }

    #[test]
    fn empty_segments_are_skipped() {
        let mut paths = PathCompressor::new();
        paths.consider_path("//x/y/f.c");
        paths.consider_path("/x/z/g.c");

        assert_eq!(paths.chew_path("//x/y/f.c"), "y/f.c");
        assert_eq!(paths.chew_path("/x/z/g.c"), "z/g.c");
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn singletons_are_never_interesting() {
        let mut values = ValueCorrelator::new();
        values.consider_value(0, "p", "0x1000");
        values.finalize();
        assert!(!values.is_interesting("0x1000"));
    }

    #[test]
    fn repeated_values_rank_by_count() {
        let mut values = ValueCorrelator::new();
        values.consider_value(0, "a", "0x1000");
        values.consider_value(1, "b", "0x2000");
        values.consider_value(2, "c", "0x2000");
        values.consider_value(3, "d", "0x2000");
        values.consider_value(4, "e", "0x1000");
        values.finalize();

        let top = values.info("0x2000").expect("count 3 is interesting");
        assert_eq!(top.highlight, 0);
        assert_eq!(top.label, "b1", "label comes from the first sighting");

        let second = values.info("0x1000").expect("count 2 is interesting");
        assert_eq!(second.highlight, 1);
        assert_eq!(second.label, "a0");
    }

    #[test]
    fn count_ties_break_by_first_seen_order() {
        let mut values = ValueCorrelator::new();
        values.consider_value(0, "x", "0xaaaa");
        values.consider_value(0, "y", "0xbbbb");
        values.consider_value(1, "x2", "0xaaaa");
        values.consider_value(1, "y2", "0xbbbb");
        values.finalize();

        assert_eq!(values.info("0xaaaa").unwrap().highlight, 0);
        assert_eq!(values.info("0xbbbb").unwrap().highlight, 1);
    }

    #[test]
    fn selection_is_capped_at_the_limit() {
        let mut values = ValueCorrelator::new();
        for i in 0..(INTERESTING_LIMIT + 2) {
            let value = format!("0x{:04x}", i);
            values.consider_value(0, "v", &value);
            values.consider_value(1, "w", &value);
        }
        values.finalize();

        let interesting = (0..(INTERESTING_LIMIT + 2))
            .filter(|i| values.is_interesting(&format!("0x{:04x}", i)))
            .count();
        assert_eq!(interesting, INTERESTING_LIMIT);
        // All counts tie, so the first-seen values win the cap.
        assert!(values.is_interesting("0x0000"));
        assert!(!values.is_interesting(&format!("0x{:04x}", INTERESTING_LIMIT + 1)));
    }

    #[test]
    fn only_pointer_shaped_values_participate() {
        let mut values = ValueCorrelator::new();
        values.consider_value(0, "n", "42");
        values.consider_value(1, "n2", "42");
        values.consider_value(0, "s", "hello");
        values.consider_value(1, "s2", "hello");
        values.consider_value(0, "u", "0XCAFE");
        values.consider_value(1, "u2", "0XCAFE");
        values.finalize();

        assert!(!values.is_interesting("42"));
        assert!(!values.is_interesting("hello"));
        assert!(
            values.is_interesting("0XCAFE"),
            "hex prefix matching is case-insensitive"
        );
    }

    #[test]
    fn queries_before_finalize_find_nothing() {
        let mut values = ValueCorrelator::new();
        values.consider_value(0, "a", "0x1");
        values.consider_value(1, "b", "0x1");
        assert!(!values.is_interesting("0x1"));
        assert!(values.info("0x1").is_none());
    }
}

#[cfg(test)]
mod walker_tests {
    use super::*;

    #[test]
    fn pops_chain_callee_before_caller() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (f1, f2, f3) = (0x20000, 0x20100, 0x20200);
        map_context(&mut source, cx, f1, 0xa1);
        map_script_frame(&mut source, f1, 0x30000, f2, 0xa2);
        map_script_frame(&mut source, f2, 0x31000, f3, 0xa3);
        map_script_frame(&mut source, f3, 0x32000, 0, 0);
        map_script(&mut source, 0x30000, 0x30100, "/ui/inner.js", 5);
        map_script(&mut source, 0x31000, 0x31100, "/ui/middle.js", 17);
        map_script(&mut source, 0x32000, 0x32100, "/ui/outer.js", 1);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f3, &mut frames)
            .expect("walk reaches the stop pointer");

        let files: Vec<&str> = frames.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files, vec!["/ui/inner.js", "/ui/middle.js", "/ui/outer.js"]);
        let lines: Vec<u32> = frames.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![5, 17, 1]);
        assert!(frames.iter().all(|f| f.function == ANONYMOUS_FRAME));
    }

    #[test]
    fn function_frames_resolve_their_atom_names() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (f1, f2) = (0x20000, 0x20100);
        map_context(&mut source, cx, f1, 0xa1);

        // f1: function frame with a named callee.
        source.map_word(f1, 0x2);
        source.map_word(f1 + 8, 0x40000); // callee
        source.map_word(f1 + 24, f2);
        source.map_word(f1 + 32, 0xa2);
        source.map_word(0x40000, 0x40100); // atom
        source.map_word(0x40000 + 8, 0x41000); // script
        source.map_word(0x40100, 0x40200); // atom chars
        source.map_string(0x40200, "onClick");
        map_script(&mut source, 0x41000, 0x41100, "/ui/app.js", 12);

        // f2: function frame with a null atom and null script.
        source.map_word(f2, 0x2);
        source.map_word(f2 + 8, 0x42000);
        source.map_word(f2 + 24, 0);
        source.map_word(f2 + 32, 0);
        source.map_word(0x42000, 0); // atom is null
        source.map_word(0x42000 + 8, 0); // script is null

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f2, &mut frames)
            .expect("walk reaches the stop pointer");

        assert_eq!(
            frames[0],
            ScriptFrame {
                function: "onClick".to_string(),
                file: "/ui/app.js".to_string(),
                line: 12,
                pc: 0xa1,
            }
        );
        assert_eq!(frames[1].function, UNNAMED_FUNCTION);
        assert_eq!(frames[1].file, NO_SCRIPT);
        assert_eq!(frames[1].line, 0);
    }

    #[test]
    fn capture_with_null_frame_pointer_resolves_a_suspended_segment() {
        // A context that pushed a new segment without establishing a frame
        // yet: expected, not an error.
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (regs, segment, older, saved_regs) = (0x10100, 0x10200, 0x10300, 0x10400);
        let f1 = 0x20000;
        source.map_word(cx, regs);
        source.map_word(cx + 8, segment);
        source.map_word(regs, 0); // no live frame
        source.map_word(regs + 8, 0);
        source.map_word(segment, older);
        source.map_word(older, 0);
        source.map_word(older + 8, saved_regs);
        source.map_word(saved_regs, f1);
        source.map_word(saved_regs + 8, 0xb1);
        map_script_frame(&mut source, f1, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("suspended state resolves");
        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f1, &mut frames)
            .expect("walk runs on the restored registers");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pc, 0xb1);
    }

    #[test]
    fn capture_with_null_register_block_resolves_a_suspended_segment() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (segment, older, saved_regs) = (0x10200, 0x10300, 0x10400);
        let f1 = 0x20000;
        source.map_word(cx, 0); // no register block at all
        source.map_word(cx + 8, segment);
        source.map_word(segment, older);
        source.map_word(older, 0);
        source.map_word(older + 8, saved_regs);
        source.map_word(saved_regs, f1);
        source.map_word(saved_regs + 8, 0xb1);

        let context = ScriptExecutionContext::capture(&source, &layout(), cx);
        assert!(context.is_ok());
    }

    #[test]
    fn capture_of_an_empty_context_is_an_inconsistency() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (regs, segment) = (0x10100, 0x10200);
        source.map_word(cx, regs);
        source.map_word(cx + 8, segment);
        source.map_word(regs, 0);
        source.map_word(regs + 8, 0);
        source.map_word(segment, 0); // and nothing suspended either

        let result = ScriptExecutionContext::capture(&source, &layout(), cx);
        assert!(matches!(result, Err(WalkError::NoSuspendedState)));
    }

    #[test]
    fn walk_advances_past_the_stop_frame() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (f1, f2, f3) = (0x20000, 0x20100, 0x20200);
        map_context(&mut source, cx, f1, 0xa1);
        map_script_frame(&mut source, f1, 0, f2, 0xa2);
        map_script_frame(&mut source, f2, 0, f3, 0xa3);
        map_script_frame(&mut source, f3, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");

        let mut first = Vec::new();
        context
            .pop_until_frame(&source, &layout, f1, &mut first)
            .expect("inner walk succeeds");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].pc, 0xa1);

        // A later boundary picks up exactly where the first walk stopped.
        let mut second = Vec::new();
        context
            .pop_until_frame(&source, &layout, f3, &mut second)
            .expect("outer walk succeeds");
        let pcs: Vec<u64> = second.iter().map(|f| f.pc).collect();
        assert_eq!(pcs, vec![0xa2, 0xa3]);
    }

    #[test]
    fn mid_walk_null_frame_pointer_restores_the_next_segment() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (regs, segment, older, saved_regs) = (0x10100, 0x10200, 0x10300, 0x10400);
        let (f1, f2) = (0x20000, 0x20100);

        source.map_word(cx, regs);
        source.map_word(cx + 8, segment);
        source.map_word(regs, f1);
        source.map_word(regs + 8, 0xa1);
        source.map_word(segment, older);
        source.map_word(older, 0);
        source.map_word(older + 8, saved_regs);
        source.map_word(saved_regs, f2);
        source.map_word(saved_regs + 8, 0xb1);

        map_script_frame(&mut source, f1, 0, 0, 0); // chain ends here
        map_script_frame(&mut source, f2, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f2, &mut frames)
            .expect("walk crosses the segment boundary");
        let pcs: Vec<u64> = frames.iter().map(|f| f.pc).collect();
        assert_eq!(pcs, vec![0xa1, 0xb1]);
    }

    #[test]
    fn zero_pc_dummy_frames_are_skipped() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (f1, f2) = (0x20000, 0x20100);
        map_context(&mut source, cx, f1, 0); // dummy linkage frame on top
        map_script_frame(&mut source, f1, 0, f2, 0xa2);
        map_script_frame(&mut source, f2, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f2, &mut frames)
            .expect("walk still reaches the stop pointer");
        assert_eq!(frames.len(), 1, "the dummy frame is not emitted");
        assert_eq!(frames[0].pc, 0xa2);
    }

    #[test]
    fn exhausted_chain_is_an_error_not_a_truncated_result() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let f1 = 0x20000;
        map_context(&mut source, cx, f1, 0xa1);
        map_script_frame(&mut source, f1, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        let result = context.pop_until_frame(&source, &layout, 0xdead0000, &mut frames);
        assert!(matches!(result, Err(WalkError::ChainExhausted)));
    }

    #[test]
    fn self_referencing_chain_hits_the_step_limit() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let f1 = 0x20000;
        map_context(&mut source, cx, f1, 0xa1);
        map_script_frame(&mut source, f1, 0, f1, 0xa1); // frame links to itself

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        let result = context.pop_until_frame(&source, &layout, 0xdead0000, &mut frames);
        assert!(matches!(result, Err(WalkError::StepLimitExceeded(_))));
    }

    #[test]
    fn unreadable_chain_memory_fails_the_walk() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let f1 = 0x20000;
        map_context(&mut source, cx, f1, 0xa1);
        // f1's prev/prev_pc words are not mapped at all.

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let mut frames = Vec::new();
        let result = context.pop_until_frame(&source, &layout, f1, &mut frames);
        assert!(matches!(result, Err(WalkError::Memory(_))));
    }

    #[test]
    fn restore_segment_pops_explicitly_even_with_a_live_frame() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let (regs, segment, older, saved_regs) = (0x10100, 0x10200, 0x10300, 0x10400);
        let (f1, f2) = (0x20000, 0x20100);
        source.map_word(cx, regs);
        source.map_word(cx + 8, segment);
        source.map_word(regs, f1);
        source.map_word(regs + 8, 0xa1);
        source.map_word(segment, older);
        source.map_word(older, 0);
        source.map_word(older + 8, saved_regs);
        source.map_word(saved_regs, f2);
        source.map_word(saved_regs + 8, 0xb1);
        map_script_frame(&mut source, f2, 0, 0, 0);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        context
            .restore_segment(&source, &layout)
            .expect("a suspended segment exists");

        let mut frames = Vec::new();
        context
            .pop_until_frame(&source, &layout, f2, &mut frames)
            .expect("walk runs on the restored state");
        assert_eq!(frames[0].pc, 0xb1, "the live frame was discarded by the restore");
    }

    #[test]
    fn restore_segment_without_suspended_state_fails() {
        let mut source = ReplaySource::new();
        let cx = 0x10000;
        let f1 = 0x20000;
        map_context(&mut source, cx, f1, 0xa1);

        let layout = layout();
        let mut context =
            ScriptExecutionContext::capture(&source, &layout, cx).expect("context captures");
        let result = context.restore_segment(&source, &layout);
        assert!(matches!(result, Err(WalkError::NoSuspendedState)));
    }
}

#[cfg(test)]
mod classifier_tests {
    use super::*;

    #[test]
    fn loop_and_dispatch_frames_hide_without_synthesis() {
        let mut source = ReplaySource::new();
        map_entry_symbols(&mut source);
        source.push_frame(ReplayFrame::new(0x1500).named("vm::Interpret"));
        source.push_frame(ReplayFrame::new(0x4500).named("vm::CallHostMethod"));
        source.push_frame(ReplayFrame::new(0x9000).named("anchor"));

        let classifier = FrameClassifier::build(&source, desc()).expect("symbols resolve");
        let records = BacktraceAssembler::new(&source, &classifier).assemble(
            RangeSelector::All,
            DisplayMode::Terse,
            true,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "anchor");
    }

    #[test]
    fn execute_boundary_restores_the_diverted_segment() {
        // An execute entry diverts the context's frame into a suspended
        // segment on its way in; unwinding its native frame must restore
        // it so the older invoke boundary continues the chain.
        let mut source = ReplaySource::new();
        map_entry_symbols(&mut source);

        let cx = 0x10000;
        let (regs, segment, older, saved_regs) = (0x10100, 0x10200, 0x10300, 0x10400);
        let (f1, f2, f3) = (0x20000, 0x20100, 0x20200);

        source.map_word(cx, regs);
        source.map_word(cx + 8, segment);
        source.map_word(regs, f1);
        source.map_word(regs + 8, 0xa1);
        source.map_word(segment, older);
        source.map_word(older, 0);
        source.map_word(older + 8, saved_regs);
        source.map_word(saved_regs, f2);
        source.map_word(saved_regs + 8, 0xb1);

        map_script_frame(&mut source, f1, 0x30000, 0, 0);
        map_script_frame(&mut source, f2, 0x31000, f3, 0xb2);
        map_script_frame(&mut source, f3, 0x32000, 0, 0);
        map_script(&mut source, 0x30000, 0x30100, "/ui/eval.js", 8);
        map_script(&mut source, 0x31000, 0x31100, "/ui/caller.js", 21);
        map_script(&mut source, 0x32000, 0x32100, "/ui/main.js", 2);

        source.push_frame(
            ReplayFrame::new(0x3500)
                .named("vm::Execute")
                .address_local("cx", cx)
                .address_local("prev", f1),
        );
        source.push_frame(
            ReplayFrame::new(0x2500)
                .named("vm::RunScript")
                .address_local("cx", cx)
                .address_local("fp", f3),
        );
        source.push_frame(ReplayFrame::new(0x9000).named("bottom"));

        let classifier = FrameClassifier::build(&source, desc()).expect("symbols resolve");
        let records = BacktraceAssembler::new(&source, &classifier).assemble(
            RangeSelector::All,
            DisplayMode::Normal,
            true,
        );

        let files: Vec<Option<&str>> = records.iter().map(|r| r.file.as_deref()).collect();
        assert_eq!(
            files,
            vec![
                Some("/ui/eval.js"),
                Some("/ui/caller.js"),
                Some("/ui/main.js"),
                None, // "bottom" has no source location
            ]
        );
        assert!(records[0].synthetic && records[1].synthetic && records[2].synthetic);
    }

    #[test]
    fn failed_synthesis_shows_the_boundary_frame() {
        // The context local points at unmapped memory: synthesis fails,
        // the boundary frame renders as an ordinary native frame.
        let mut source = ReplaySource::new();
        map_entry_symbols(&mut source);
        source.push_frame(
            ReplayFrame::new(0x2345)
                .named("vm::RunScript")
                .address_local("cx", 0xbad00000)
                .address_local("fp", 0x20000),
        );
        source.push_frame(ReplayFrame::new(0x9000).named("bottom"));

        let classifier = FrameClassifier::build(&source, desc()).expect("symbols resolve");
        let records = BacktraceAssembler::new(&source, &classifier).assemble(
            RangeSelector::All,
            DisplayMode::Terse,
            true,
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "vm::RunScript");
        assert!(!records[0].synthetic);
        assert_eq!(records[1].name, "bottom");
    }

    #[test]
    fn missing_context_local_shows_the_boundary_frame() {
        let mut source = ReplaySource::new();
        map_entry_symbols(&mut source);
        source.push_frame(ReplayFrame::new(0x2345).named("vm::RunScript"));

        let classifier = FrameClassifier::build(&source, desc()).expect("symbols resolve");
        let records = BacktraceAssembler::new(&source, &classifier).assemble(
            RangeSelector::All,
            DisplayMode::Terse,
            true,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "vm::RunScript");
    }

    #[test]
    fn unreadable_stop_pointer_walks_within_the_span_approximate() {
        // Approximate by design: bounded by OUTERMOST_FRAME_SPAN rather
        // than a real stop pointer.
        let mut source = ReplaySource::new();
        map_entry_symbols(&mut source);

        let cx = 0x10000;
        let (f1, f2, f3) = (0x20000, 0x20040, 0x30000); // f3 is ~64 KiB up
        map_context(&mut source, cx, f1, 0xa1);
        map_script_frame(&mut source, f1, 0, f2, 0xa2);
        map_script_frame(&mut source, f2, 0, f3, 0xa3);
        map_script_frame(&mut source, f3, 0, 0, 0);

        // The invoke frame has its context but no readable stop pointer.
        source.push_frame(
            ReplayFrame::new(0x2345)
                .named("vm::RunScript")
                .address_local("cx", cx),
        );
        source.push_frame(ReplayFrame::new(0x9000).named("bottom"));

        let classifier = FrameClassifier::build(&source, desc()).expect("symbols resolve");
        let records = BacktraceAssembler::new(&source, &classifier).assemble(
            RangeSelector::All,
            DisplayMode::Normal,
            true,
        );

        let synthetic: Vec<u64> = records
            .iter()
            .filter(|r| r.synthetic)
            .map(|r| r.pc.unwrap_or(0))
            .collect();
        assert_eq!(
            synthetic,
            vec![0xa1, 0xa2],
            "the walk stops at the frame outside the span bound"
        );
        assert!(
            records.iter().all(|r| r.name != "vm::RunScript"),
            "the fallback still hides the boundary frame"
        );
    }
}
