use script_backtrace::backend::replay::{word_layout, ReplayFrame, ReplaySource};
use script_backtrace::backend::{BlockSymbol, LexicalBlock};
use script_backtrace::backtrace::{
    BacktraceAssembler, FrameClassifier, InterpreterDesc, OUTERMOST_FRAME_SPAN,
};
use script_backtrace::render::{json, Renderer};
use script_backtrace::{parse_request, DisplayMode, RangeSelector};

/// Replay a canned stop of a process with an embedded interpreter and
/// print the unified backtrace a live session would show.
fn main() {
    let source = build_stop();
    let classifier = FrameClassifier::build(&source, interpreter_desc())
        .expect("replayed binary should resolve the interpreter entry points");
    let assembler = BacktraceAssembler::new(&source, &classifier);

    // Same default invocation the command layer would produce.
    let request = parse_request("").expect("empty argument string parses");
    let records = assembler.assemble(request.range, request.mode, request.apply_filter);

    let renderer = Renderer::new(true).strip_prefix("app::");
    println!("=== normal ===");
    print!("{}", renderer.render(&records, DisplayMode::Normal));

    let full = assembler.assemble(RangeSelector::All, DisplayMode::Full, true);
    println!("=== full ===");
    print!("{}", renderer.render(&full, DisplayMode::Full));

    println!("=== json ===");
    println!(
        "{}",
        json::to_json_string(&records).expect("records serialize")
    );
}

fn interpreter_desc() -> InterpreterDesc {
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

const CX: u64 = 0x10000;
const REGS: u64 = 0x10100;
const SEGMENT: u64 = 0x10200;
const FRAME_CLICK: u64 = 0x20000;
const FRAME_BOOT: u64 = 0x20100;
const CALLEE: u64 = 0x21000;
const ATOM: u64 = 0x21100;
const ATOM_CHARS: u64 = 0x21200;
const SCRIPT_CLICK: u64 = 0x22000;
const SCRIPT_CLICK_PATH: u64 = 0x22100;
const SCRIPT_BOOT: u64 = 0x23000;
const SCRIPT_BOOT_PATH: u64 = 0x23100;

fn build_stop() -> ReplaySource {
    let mut source = ReplaySource::new();

    source.map_symbol("vm::Interpret", 0x1000..0x2000);
    source.map_symbol("vm::RunScript", 0x2000..0x3000);
    source.map_symbol("vm::Execute", 0x3000..0x4000);
    source.map_symbol("vm::CallHostMethod", 0x4000..0x5000);

    // The interpreter context: live registers point at the click handler
    // frame, which links back to the top-level boot frame.
    source.map_word(CX, REGS);
    source.map_word(CX + 8, SEGMENT);
    source.map_word(REGS, FRAME_CLICK);
    source.map_word(REGS + 8, 0xa1);
    source.map_word(SEGMENT, 0);

    source.map_word(FRAME_CLICK, 0x2); // function frame
    source.map_word(FRAME_CLICK + 8, CALLEE);
    source.map_word(FRAME_CLICK + 24, FRAME_BOOT);
    source.map_word(FRAME_CLICK + 32, 0xa2);
    source.map_word(CALLEE, ATOM);
    source.map_word(CALLEE + 8, SCRIPT_CLICK);
    source.map_word(ATOM, ATOM_CHARS);
    source.map_string(ATOM_CHARS, "onClick");
    source.map_word(SCRIPT_CLICK, SCRIPT_CLICK_PATH);
    source.map_word(SCRIPT_CLICK + 8, 12);
    source.map_string(SCRIPT_CLICK_PATH, "/ui/app.js");

    source.map_word(FRAME_BOOT, 0); // top-level script frame
    source.map_word(FRAME_BOOT + 16, SCRIPT_BOOT);
    source.map_word(FRAME_BOOT + 24, 0);
    source.map_word(FRAME_BOOT + 32, 0);
    source.map_word(SCRIPT_BOOT, SCRIPT_BOOT_PATH);
    source.map_word(SCRIPT_BOOT + 8, 3);
    source.map_string(SCRIPT_BOOT_PATH, "/ui/boot.js");

    source.push_frame(
        ReplayFrame::new(0x9100)
            .named("app::native_sink")
            .at("/src/app/native/sink.cpp", 42)
            .block(LexicalBlock {
                function: Some("app::native_sink".to_string()),
                symbols: vec![BlockSymbol {
                    name: "data".to_string(),
                    is_argument: true,
                }],
                enclosing: None,
            })
            .local("data", "0xdeadbeef"),
    );
    source.push_frame(ReplayFrame::new(0x1234).named("vm::Interpret"));
    source.push_frame(
        ReplayFrame::new(0x2345)
            .named("vm::RunScript")
            .address_local("cx", CX)
            .address_local("fp", FRAME_BOOT),
    );
    source.push_frame(
        ReplayFrame::new(0x9500)
            .named("app::main")
            .at("/src/app/main.cpp", 10)
            .block(LexicalBlock {
                function: Some("app::main".to_string()),
                symbols: vec![BlockSymbol {
                    name: "event".to_string(),
                    is_argument: true,
                }],
                enclosing: None,
            })
            .local("event", "0xdeadbeef"),
    );

    source
}
