pub mod json;

use std::fmt::Write;

use crate::backend::FrameKind;
use crate::backtrace::{DisplayMode, DisplayRecord, VariableView};

/// Column where the `at file:line` section starts.
const LOCATION_COLUMN: usize = 48;

/// 256-color terminal palette, one slot per display role.
#[derive(Debug, Clone)]
pub struct Palette {
    pub normal: u8,
    pub subtle: u8,
    pub function: u8,
    pub container: u8,
    pub script_function: u8,
    pub line_number: u8,
    pub key: u8,
    pub value: u8,
    /// Cycled through by highlight index for interesting values.
    pub highlights: Vec<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            normal: 0xf8,
            subtle: 0xee,
            function: 0x4d,
            container: 0x41,
            script_function: 0xc9,
            line_number: 0x34,
            key: 129,
            value: 38,
            highlights: vec![196, 46, 226, 51, 201, 208, 118, 87],
        }
    }
}

/// Formats display records for a terminal. Paste mode always renders
/// plain; otherwise color is the constructor's choice.
pub struct Renderer {
    palette: Palette,
    color: bool,
    strip_prefixes: Vec<String>,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            palette: Palette::default(),
            color,
            strip_prefixes: Vec::new(),
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Strip a namespace prefix from native frame names before display.
    pub fn strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_prefixes.push(prefix.to_string());
        self
    }

    pub fn render(&self, records: &[DisplayRecord], mode: DisplayMode) -> String {
        let color = self.color && mode != DisplayMode::Paste;
        let mut out = String::new();
        for record in records {
            self.render_record(&mut out, record, mode, color);
        }
        out
    }

    fn paint(&self, code: u8, color: bool) -> String {
        if color {
            format!("\x1b[38;5;{}m", code)
        } else {
            String::new()
        }
    }

    fn reset(&self, color: bool) -> &'static str {
        if color {
            "\x1b[0m"
        } else {
            ""
        }
    }

    fn display_name(&self, record: &DisplayRecord) -> String {
        for prefix in &self.strip_prefixes {
            if let Some(rest) = record.name.strip_prefix(prefix.as_str()) {
                return rest.to_string();
            }
        }
        record.name.clone()
    }

    fn render_record(&self, out: &mut String, record: &DisplayRecord, mode: DisplayMode, color: bool) {
        let p = &self.palette;
        let subtle = self.paint(p.subtle, color);
        let reset = self.reset(color);

        match record.kind {
            FrameKind::CalledFromDebugger => {
                let _ = writeln!(
                    out,
                    "{}{:03} <function called from debugger>{}",
                    subtle, record.ordinal, reset
                );
                return;
            }
            FrameKind::SignalHandler => {
                let _ = writeln!(
                    out,
                    "{}{:03} <signal handler called>{}",
                    subtle, record.ordinal, reset
                );
                return;
            }
            FrameKind::Normal => {}
        }

        let name_code = if record.synthetic {
            p.script_function
        } else {
            p.function
        };
        let name = if record.synthetic {
            record.name.clone()
        } else {
            self.display_name(record)
        };
        let line = record.line.unwrap_or(0);

        match mode {
            DisplayMode::Terse => {
                let _ = writeln!(
                    out,
                    "{}{}{}{}{}:{}{}{}",
                    subtle,
                    self.lead(record),
                    self.paint(name_code, color),
                    name,
                    subtle,
                    self.paint(p.line_number, color),
                    line,
                    reset
                );
            }
            DisplayMode::Paste => {
                let file = record.file.as_deref().unwrap_or("???");
                let _ = writeln!(out, "{}{}", self.lead(record), name);
                let _ = writeln!(out, "    {}:{}", file, line);
            }
            DisplayMode::Normal | DisplayMode::Full => {
                let file = record.file.as_deref().unwrap_or("???");
                let head = format!("{}{}", self.lead(record), name);
                let pad = LOCATION_COLUMN.saturating_sub(head.len()).max(1);
                let _ = writeln!(
                    out,
                    "{}{}{}{}{}{}at {}{}{}:{}{} {}{:010x}{}",
                    subtle,
                    self.lead(record),
                    self.paint(name_code, color),
                    name,
                    " ".repeat(pad),
                    subtle,
                    self.paint(p.container, color),
                    file,
                    subtle,
                    self.paint(p.line_number, color),
                    line,
                    subtle,
                    record.pc.unwrap_or(0),
                    reset
                );
                self.render_variables(out, &record.arguments, color);
                if mode == DisplayMode::Full {
                    self.render_variables(out, &record.locals, color);
                }
            }
        }
    }

    /// Ordinal column for native records, a marker for synthetic ones.
    fn lead(&self, record: &DisplayRecord) -> String {
        if record.synthetic {
            "  ~ ".to_string()
        } else {
            format!("{:03} ", record.ordinal)
        }
    }

    fn render_variables(&self, out: &mut String, variables: &[VariableView], color: bool) {
        let p = &self.palette;
        for var in variables {
            let mut line = format!(
                "      {}{}{}={}{}",
                self.paint(p.key, color),
                var.name,
                self.paint(p.subtle, color),
                self.paint(p.value, color),
                var.value
            );
            if let Some(highlight) = &var.highlight {
                let code = p.highlights[highlight.index % p.highlights.len()];
                let _ = write!(line, " {}{}", self.paint(code, color), highlight.label);
            }
            line.push_str(self.reset(color));
            out.push_str(&line);
            out.push('\n');
        }
    }
}
