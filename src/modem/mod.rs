//! # Modem Host Link
//!
//! The single owned context for one host connection.
//!
//! [`HostLink`] holds the frame reassembler, the mode state machine, every
//! engine collaborator, the outbound sink and the optional diagnostic channel.
//! It is driven from one polling loop: call [`HostLink::process`] with
//! whatever bytes the transport has available, then drain the sink.
//!
//! This module handles:
//! - Inbound reassembly and dispatch (see `dispatcher`)
//! - Outbound passthrough frames originated by the engines
//! - Status snapshots for GetStatus
//! - Diagnostic frames, when a diagnostic channel is attached

pub mod diagnostics;
pub mod dispatcher;
pub mod engines;
pub mod sim;
pub mod state;

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::mmdvm::encoder::FrameBuilder;
use crate::mmdvm::frame::{FrameReassembler, Reassembly};
use crate::mmdvm::protocol::*;

pub use diagnostics::Diagnostics;
pub use engines::Engines;
pub use state::{ConfigSnapshot, ModeStateMachine};

/// Destination for outbound frames
///
/// Writes are assumed buffered; `flush` asks for immediate delivery.
pub trait FrameSink {
    fn write(&mut self, data: &[u8], flush: bool);
}

/// One queued outbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub bytes: Bytes,
    pub flush: bool,
}

/// FIFO of outbound frames, drained by the transport loop
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    frames: VecDeque<OutboundFrame>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<OutboundFrame> {
        self.frames.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = OutboundFrame> + '_ {
        self.frames.drain(..)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSink for OutboundQueue {
    fn write(&mut self, data: &[u8], flush: bool) {
        self.frames.push_back(OutboundFrame {
            bytes: Bytes::copy_from_slice(data),
            flush,
        });
    }
}

/// Host-link context
pub struct HostLink<S: FrameSink = OutboundQueue> {
    reassembler: FrameReassembler,
    state: ModeStateMachine,
    engines: Engines,
    builder: FrameBuilder,
    sink: S,
    diagnostics: Option<Diagnostics>,
}

impl<S: FrameSink> std::fmt::Debug for HostLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLink")
            .field("mode", &self.state.mode())
            .field("enabled", &self.state.enabled())
            .field("buffered", &self.reassembler.buffered())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: FrameSink> HostLink<S> {
    /// Create a link in Idle with every protocol disabled
    pub fn new(engines: Engines, sink: S) -> Self {
        Self {
            reassembler: FrameReassembler::new(),
            state: ModeStateMachine::new(),
            engines,
            builder: FrameBuilder::new(),
            sink,
            diagnostics: None,
        }
    }

    /// Attach an on-wire diagnostic channel
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Consume every byte currently available from the transport
    pub fn process(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.feed(byte);
        }
    }

    /// Consume one byte
    pub fn feed(&mut self, byte: u8) {
        match self.reassembler.feed(byte) {
            Some(Reassembly::Complete(frame)) => {
                debug!("Received frame: {:?}", frame);
                self.dispatch(&frame);
            }
            Some(Reassembly::Rejected { command, error }) => {
                warn!("Rejected frame for command 0x{:02X}: {}", command, error);
                self.send_nak(command, error);
            }
            None => {}
        }
    }

    pub fn mode(&self) -> ModemMode {
        self.state.mode()
    }

    pub fn enabled(&self) -> EnableFlags {
        self.state.enabled()
    }

    /// Last configuration accepted by SetConfig
    pub fn config(&self) -> Option<&ConfigSnapshot> {
        self.state.config()
    }

    /// True while a frame is partially received
    pub fn has_partial_frame(&self) -> bool {
        self.reassembler.in_progress()
    }

    /// Bytes held for the partial frame
    pub fn buffered(&self) -> usize {
        self.reassembler.buffered()
    }

    /// Drop a stalled partial frame without replying
    pub fn abandon_partial_frame(&mut self) {
        if self.reassembler.in_progress() {
            warn!(
                "Dropping stalled frame after {} bytes",
                self.reassembler.buffered()
            );
            self.reassembler.reset();
        }
    }

    /// Apply the stalled-frame timeout
    ///
    /// `idle` is the time since the last received byte. Drops the partial
    /// frame without replying and returns `true` once `idle` reaches
    /// `timeout`; a `timeout` of `None` never expires anything.
    pub fn expire_stalled(&mut self, idle: Duration, timeout: Option<Duration>) -> bool {
        match timeout {
            Some(timeout) if self.reassembler.in_progress() && idle >= timeout => {
                self.abandon_partial_frame();
                true
            }
            _ => false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    /// Snapshot of the values reported by GetStatus
    pub fn status(&self) -> ModemStatus {
        let enabled = self.state.enabled();
        let io = &self.engines.io;

        ModemStatus {
            enabled,
            mode: self.state.mode(),
            transmitting: io.is_transmitting(),
            adc_overflow: io.has_adc_overflow(),
            rx_overflow: io.has_rx_overflow(),
            tx_overflow: io.has_tx_overflow(),
            dstar_space: if enabled.dstar { self.engines.dstar_tx.space() } else { 0 },
            dmr_space1: if enabled.dmr { self.engines.dmr_tx.space(DmrSlot::One) } else { 0 },
            dmr_space2: if enabled.dmr { self.engines.dmr_tx.space(DmrSlot::Two) } else { 0 },
            ysf_space: if enabled.ysf { self.engines.ysf_tx.space() } else { 0 },
        }
    }

    // Outbound passthrough, called when an engine finishes a reception

    pub fn write_dstar_header(&mut self, header: &[u8]) -> bool {
        self.passthrough(ModemMode::DStar, Command::DStarHeader, header, DSTAR_HEADER_MAX_PAYLOAD)
    }

    pub fn write_dstar_data(&mut self, data: &[u8]) -> bool {
        self.passthrough(ModemMode::DStar, Command::DStarData, data, DSTAR_DATA_MAX_PAYLOAD)
    }

    pub fn write_dstar_lost(&mut self) -> bool {
        self.signal(ModemMode::DStar, Command::DStarLost)
    }

    pub fn write_dstar_eot(&mut self) -> bool {
        self.signal(ModemMode::DStar, Command::DStarEot)
    }

    pub fn write_dmr_data(&mut self, slot: DmrSlot, data: &[u8]) -> bool {
        let command = match slot {
            DmrSlot::One => Command::DmrData1,
            DmrSlot::Two => Command::DmrData2,
        };
        self.passthrough(ModemMode::Dmr, command, data, DMR_DATA_MAX_PAYLOAD)
    }

    pub fn write_dmr_lost(&mut self, slot: DmrSlot) -> bool {
        let command = match slot {
            DmrSlot::One => Command::DmrLost1,
            DmrSlot::Two => Command::DmrLost2,
        };
        self.signal(ModemMode::Dmr, command)
    }

    pub fn write_ysf_data(&mut self, data: &[u8]) -> bool {
        self.passthrough(ModemMode::Ysf, Command::YsfData, data, YSF_DATA_MAX_PAYLOAD)
    }

    pub fn write_ysf_lost(&mut self) -> bool {
        self.signal(ModemMode::Ysf, Command::YsfLost)
    }

    /// Calibration passthrough; only sent in Calibrate mode
    pub fn write_cal_data(&mut self, data: &[u8]) -> bool {
        self.passthrough(ModemMode::Calibrate, Command::CalData, data, CAL_DATA_MAX_PAYLOAD)
    }

    fn outbound_allowed(&self, protocol: ModemMode, command: Command) -> bool {
        if self.state.permits_outbound(protocol) {
            return true;
        }

        debug!(
            "Suppressed {:?} frame: mode is {}, protocol {}",
            command,
            self.state.mode(),
            protocol
        );
        false
    }

    fn passthrough(&mut self, protocol: ModemMode, command: Command, payload: &[u8], cap: usize) -> bool {
        if !self.outbound_allowed(protocol, command) {
            return false;
        }

        let frame = self.builder.passthrough(command, payload, cap);
        self.sink.write(frame, false);
        true
    }

    fn signal(&mut self, protocol: ModemMode, command: Command) -> bool {
        if !self.outbound_allowed(protocol, command) {
            return false;
        }

        let frame = self.builder.signal(command);
        self.sink.write(frame, false);
        true
    }

    // Diagnostic channel. Messages are always traced; frames are only written
    // when a channel is attached. Each returns whether a frame was written.

    pub fn write_debug(&mut self, text: &str, values: &[i16]) -> bool {
        debug!("{} {:?}", text, values);
        match self.diagnostics.as_mut() {
            Some(diagnostics) => {
                diagnostics.debug(&mut self.builder, &mut self.sink, text, values);
                true
            }
            None => false,
        }
    }

    pub fn write_dump(&mut self, data: &[u8]) -> bool {
        debug!("Dump: {:02X?}", data);
        match self.diagnostics.as_mut() {
            Some(diagnostics) => {
                diagnostics.dump(&mut self.builder, &mut self.sink, data);
                true
            }
            None => false,
        }
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> bool {
        trace!("Samples: {:?}", samples);
        match self.diagnostics.as_mut() {
            Some(diagnostics) => {
                diagnostics.samples(&mut self.builder, &mut self.sink, samples);
                true
            }
            None => false,
        }
    }

    /// Report a failed assertion; does nothing when `condition` holds
    pub fn write_assert(&mut self, condition: bool, text: &str, file: &str, line: u32) -> bool {
        if condition {
            return false;
        }

        warn!("Assertion failed: {} at {}:{}", text, file, line);
        match self.diagnostics.as_mut() {
            Some(diagnostics) => {
                diagnostics.assertion(&mut self.builder, &mut self.sink, text, file, line);
                true
            }
            None => false,
        }
    }

    fn send_ack(&mut self, command: u8) {
        let frame = self.builder.ack(command);
        self.sink.write(frame, false);
    }

    fn send_nak(&mut self, command: u8, error: ErrorCode) {
        let frame = self.builder.nak(command, error);
        self.sink.write(frame, false);
    }

    fn send_status(&mut self) {
        let status = self.status();
        let frame = self.builder.status(&status);
        self.sink.write(frame, false);
    }

    fn send_version(&mut self) {
        let frame = self.builder.version(PROTOCOL_VERSION, HARDWARE_DESCRIPTION);
        self.sink.write(frame, false);
    }

    fn set_mode(&mut self, mode: ModemMode) {
        if self.state.transition(mode, &mut self.engines) {
            self.write_debug(&format!("Mode set to {}", mode), &[]);
        }
    }
}
