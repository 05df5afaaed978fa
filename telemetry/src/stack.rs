//! Best-effort stack trace acquisition.
//!
//! Two strategies sit behind [`StackCapture`]. [`probe_stack_capture`] picks
//! one once, at pipeline construction: the native strategy when backtraces are
//! enabled for this process, otherwise the frame walk.

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub trait StackCapture: Send + Sync + fmt::Debug {
    /// Returns the current call stack as text. Never fails; an empty string
    /// stands in for a trace that could not be taken.
    fn capture(&self) -> String;
}

/// Full structured backtrace as rendered by the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeStackCapture;

impl StackCapture for NativeStackCapture {
    fn capture(&self) -> String {
        suppress(|| {
            let backtrace = Backtrace::force_capture();
            match backtrace.status() {
                BacktraceStatus::Captured => backtrace.to_string(),
                _ => String::new(),
            }
        })
    }
}

/// Walks the active call stack and records one signature line per frame,
/// dropping source positions, up to `max_frames` frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameWalkStackCapture {
    max_frames: usize,
}

impl FrameWalkStackCapture {
    pub fn new(max_frames: usize) -> Self {
        Self { max_frames }
    }
}

impl StackCapture for FrameWalkStackCapture {
    fn capture(&self) -> String {
        suppress(|| {
            let backtrace = Backtrace::force_capture();
            if backtrace.status() != BacktraceStatus::Captured {
                return String::new();
            }
            frame_signatures(&backtrace.to_string(), self.max_frames)
        })
    }
}

/// Chooses the capture strategy for this process.
pub fn probe_stack_capture(max_frames: usize) -> Arc<dyn StackCapture> {
    let native = suppress(|| Backtrace::capture().status() == BacktraceStatus::Captured);
    if native {
        Arc::new(NativeStackCapture)
    } else {
        Arc::new(FrameWalkStackCapture::new(max_frames))
    }
}

/// Keeps the first line of every rendered frame (`  N: symbol`), without its
/// index, and ignores the `at file:line:col` continuation lines.
fn frame_signatures(rendered: &str, max_frames: usize) -> String {
    rendered
        .lines()
        .filter_map(|line| {
            let (index, signature) = line.trim_start().split_once(": ")?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(signature.trim())
        })
        .take(max_frames)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs a capture step, turning a panic inside it into the default value.
pub(crate) fn suppress<T: Default>(f: impl FnOnce() -> T) -> T {
    std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_default()
}
