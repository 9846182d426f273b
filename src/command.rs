use crate::backtrace::{DisplayMode, RangeSelector};
use crate::error::CommandError;

/// A parsed backtrace command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktraceRequest {
    pub range: RangeSelector,
    pub mode: DisplayMode,
    pub apply_filter: bool,
}

impl Default for BacktraceRequest {
    fn default() -> Self {
        Self {
            range: RangeSelector::All,
            mode: DisplayMode::Normal,
            apply_filter: true,
        }
    }
}

/// Parse the command's argument string.
///
/// Word syntax: `full` / `terse` / `paste` pick the display mode, `raw`
/// skips the backend's frame filters, a positive count keeps the innermost
/// N frames, a negative count the outermost N, and `A:B` an inclusive
/// ordinal range. Later words win over earlier ones.
pub fn parse_request(arg: &str) -> Result<BacktraceRequest, CommandError> {
    let words = shlex::split(arg).ok_or_else(|| CommandError::UnknownWord(arg.to_string()))?;

    let mut request = BacktraceRequest::default();
    for word in words {
        match word.as_str() {
            "raw" => request.apply_filter = false,
            "full" => request.mode = DisplayMode::Full,
            "terse" => request.mode = DisplayMode::Terse,
            "paste" => request.mode = DisplayMode::Paste,
            w if w.contains(':') => {
                request.range = parse_slice(w)?;
            }
            w => {
                let count: i64 = w
                    .parse()
                    .map_err(|_| CommandError::UnknownWord(w.to_string()))?;
                request.range = if count > 0 {
                    RangeSelector::FirstN(count as usize)
                } else if count < 0 {
                    RangeSelector::LastN(count.unsigned_abs() as usize)
                } else {
                    RangeSelector::All
                };
            }
        }
    }
    Ok(request)
}

fn parse_slice(word: &str) -> Result<RangeSelector, CommandError> {
    let bad = || CommandError::BadRange(word.to_string());
    let (a, b) = word.split_once(':').ok_or_else(bad)?;
    let start: usize = a.parse().map_err(|_| bad())?;
    let end: usize = b.parse().map_err(|_| bad())?;
    if start > end {
        return Err(bad());
    }
    Ok(RangeSelector::Slice(start, end))
}
