use std::{fmt::Write, path::Path};

use backtrace::Backtrace;

use crate::format::Caller;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    file: Option<String>,
    line: Option<u32>,
    symbol: Option<String>,
}

impl Frame {
    /// `file:line`. Without line info falls back to the symbol name, then `???`, with line 0.
    fn location(&self) -> String {
        match (&self.file, self.line, &self.symbol) {
            (Some(file), line, _) => format!("{file}:{}", line.unwrap_or(0)),
            (None, _, Some(symbol)) => format!("{symbol}:0"),
            (None, _, None) => "???:0".to_string(),
        }
    }

    fn symbol_contains(&self, pattern: &str) -> bool {
        self.symbol.as_deref().is_some_and(|s| s.contains(pattern))
    }
}

/// Every frame of the current stack, with or without debug info.
fn captured_frames() -> Vec<Frame> {
    let backtrace = Backtrace::new();
    let mut frames = Vec::new();
    for frame in backtrace.frames() {
        if frame.symbols().is_empty() {
            frames.push(Frame {
                file: None,
                line: None,
                symbol: Some(format!("{:?}", frame.ip())),
            });
        }
        for symbol in frame.symbols() {
            frames.push(Frame {
                file: symbol.filename().map(|f| f.display().to_string()),
                line: symbol.lineno(),
                symbol: symbol.name().map(|n| n.to_string()),
            });
        }
    }
    frames
}

/// Index of the first frame belonging to the code that asked for the trace.
fn start_of(frames: &[Frame], caller: Option<Caller<'_>>) -> usize {
    if let Some(caller) = caller
        && let Some(pos) = frames.iter().position(|f| {
            f.line == Some(caller.line)
                && f.file
                    .as_deref()
                    .is_some_and(|file| Path::new(file).ends_with(caller.file))
        })
    {
        return pos;
    }
    frames
        .iter()
        .rposition(|f| f.symbol_contains("backtrace::") || f.symbol_contains("daylog_core::trace"))
        .map_or(0, |pos| pos + 1)
}

/// `message` followed by a traceback block, one `\n\t<file>:<line>` per frame
/// walking outward from `caller`.
pub fn traceback(message: &str, caller: Option<Caller<'_>>) -> String {
    let frames = captured_frames();
    let mut out = String::with_capacity(message.len() + 64 * frames.len());
    out.push_str(message);
    if !message.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("Traceback:");
    for frame in &frames[start_of(&frames, caller)..] {
        let _ = write!(out, "\n\t{}", frame.location());
    }
    out.push('\n');
    out
}
