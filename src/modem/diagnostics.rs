//! Optional on-wire diagnostic channel
//!
//! A [`HostLink`](super::HostLink) either holds a [`Diagnostics`] or it does
//! not; the protocol logic is identical in both cases. Diagnostic frames are
//! written with `flush = true` so they reach the host immediately.

use super::FrameSink;
use crate::mmdvm::encoder::FrameBuilder;

/// Diagnostic frame writer
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    frames_sent: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic frames written so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub(crate) fn debug<S: FrameSink>(
        &mut self,
        builder: &mut FrameBuilder,
        sink: &mut S,
        text: &str,
        values: &[i16],
    ) {
        sink.write(builder.debug(text, values), true);
        self.frames_sent += 1;
    }

    pub(crate) fn dump<S: FrameSink>(&mut self, builder: &mut FrameBuilder, sink: &mut S, data: &[u8]) {
        sink.write(builder.dump(data), true);
        self.frames_sent += 1;
    }

    pub(crate) fn samples<S: FrameSink>(
        &mut self,
        builder: &mut FrameBuilder,
        sink: &mut S,
        samples: &[i16],
    ) {
        sink.write(builder.samples(samples), true);
        self.frames_sent += 1;
    }

    pub(crate) fn assertion<S: FrameSink>(
        &mut self,
        builder: &mut FrameBuilder,
        sink: &mut S,
        text: &str,
        file: &str,
        line: u32,
    ) {
        sink.write(builder.assertion(text, file, line), true);
        self.frames_sent += 1;
    }
}
