//! Mode state machine and SetConfig validation
//!
//! Exactly one mode owns the modem at a time. Entering a non-Idle mode resets
//! the receive side of every other protocol so no partial reception survives
//! a switch; entering Calibrate resets all three receivers.

use tracing::{debug, info};

use super::engines::{Engines, IoParameters};
use crate::mmdvm::protocol::*;

/// Validated SetConfig payload
///
/// Produced only by [`ConfigSnapshot::parse`], so holding one means every
/// field already passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub rx_invert: bool,
    pub tx_invert: bool,
    pub ptt_invert: bool,
    pub enabled: EnableFlags,
    pub tx_delay: u8,
    pub mode: ModemMode,
    pub rx_level: u8,
    pub tx_level: u8,
    pub color_code: u8,
}

impl ConfigSnapshot {
    /// Parse and validate a SetConfig payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if:
    /// - The payload is shorter than 7 bytes
    /// - TX delay exceeds 50
    /// - The mode byte is not a known mode, or names a disabled protocol
    /// - The color code exceeds 15
    pub fn parse(payload: &[u8]) -> Result<Self, ErrorCode> {
        if payload.len() < SET_CONFIG_PAYLOAD_SIZE {
            return Err(ErrorCode::InvalidParameter);
        }

        let invert = payload[0];
        let enabled = EnableFlags::from_bits(payload[1]);

        let tx_delay = payload[2];
        if tx_delay > MAX_TX_DELAY {
            return Err(ErrorCode::InvalidParameter);
        }

        let mode = ModemMode::from_byte(payload[3]).ok_or(ErrorCode::InvalidParameter)?;
        if !enabled.allows(mode) {
            return Err(ErrorCode::InvalidParameter);
        }

        let color_code = payload[6];
        if color_code > MAX_COLOR_CODE {
            return Err(ErrorCode::InvalidParameter);
        }

        Ok(Self {
            rx_invert: invert & 0x01 != 0,
            tx_invert: invert & 0x02 != 0,
            ptt_invert: invert & 0x04 != 0,
            enabled,
            tx_delay,
            mode,
            rx_level: payload[4],
            tx_level: payload[5],
            color_code,
        })
    }

    /// Parameters handed to the I/O layer
    pub fn io_parameters(&self) -> IoParameters {
        IoParameters {
            rx_invert: self.rx_invert,
            tx_invert: self.tx_invert,
            ptt_invert: self.ptt_invert,
            rx_level: self.rx_level,
            tx_level: self.tx_level,
        }
    }
}

/// Current mode, enable flags and last applied configuration
#[derive(Debug, Clone, Default)]
pub struct ModeStateMachine {
    mode: ModemMode,
    enabled: EnableFlags,
    config: Option<ConfigSnapshot>,
}

impl ModeStateMachine {
    /// Start in Idle with every protocol disabled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ModemMode {
        self.mode
    }

    pub fn enabled(&self) -> EnableFlags {
        self.enabled
    }

    /// Last configuration accepted by SetConfig
    pub fn config(&self) -> Option<&ConfigSnapshot> {
        self.config.as_ref()
    }

    /// Move to `to`, resetting the other protocols' receivers
    ///
    /// Returns `false` without touching any engine when `to` is already the
    /// current mode.
    pub fn transition(&mut self, to: ModemMode, engines: &mut Engines) -> bool {
        if to == self.mode {
            return false;
        }

        match to {
            ModemMode::DStar => {
                engines.dmr_rx.reset();
                engines.ysf_rx.reset();
            }
            ModemMode::Dmr => {
                engines.dstar_rx.reset();
                engines.ysf_rx.reset();
            }
            ModemMode::Ysf => {
                engines.dstar_rx.reset();
                engines.dmr_rx.reset();
            }
            ModemMode::Calibrate => {
                engines.dstar_rx.reset();
                engines.dmr_rx.reset();
                engines.ysf_rx.reset();
            }
            ModemMode::Idle => {}
        }

        info!("Mode changed from {} to {}", self.mode, to);
        self.mode = to;
        true
    }

    /// SetMode semantics
    ///
    /// Requesting the current mode succeeds with no side effects. Otherwise
    /// the mode must be enabled.
    pub fn request_mode(&mut self, to: ModemMode, engines: &mut Engines) -> Result<bool, ErrorCode> {
        if to == self.mode {
            debug!("Mode {} already selected", to);
            return Ok(false);
        }

        if !self.enabled.allows(to) {
            return Err(ErrorCode::InvalidParameter);
        }

        Ok(self.transition(to, engines))
    }

    /// Apply a validated configuration in one step
    ///
    /// Returns whether the mode changed.
    pub fn apply_config(&mut self, snapshot: ConfigSnapshot, engines: &mut Engines) -> bool {
        self.enabled = snapshot.enabled;
        self.config = Some(snapshot);

        engines.dstar_tx.set_tx_delay(snapshot.tx_delay);
        engines.ysf_tx.set_tx_delay(snapshot.tx_delay);
        engines.dmr_tx.set_color_code(snapshot.color_code);
        engines.dmr_rx.set_color_code(snapshot.color_code);

        let changed = self.transition(snapshot.mode, engines);

        engines.io.set_parameters(snapshot.io_parameters());
        engines.io.start();

        changed
    }

    /// Admission check for an inbound payload command of `protocol`
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` when the protocol is disabled
    /// - `InvalidLength` when another mode holds the modem
    pub fn admit(&self, protocol: ModemMode) -> Result<(), ErrorCode> {
        if !self.enabled.allows(protocol) {
            return Err(ErrorCode::InvalidParameter);
        }

        if self.mode != ModemMode::Idle && self.mode != protocol {
            return Err(ErrorCode::InvalidLength);
        }

        Ok(())
    }

    /// Whether an outbound passthrough frame of `protocol` may be sent
    pub fn permits_outbound(&self, protocol: ModemMode) -> bool {
        match protocol {
            ModemMode::Calibrate => self.mode == ModemMode::Calibrate,
            ModemMode::Idle => false,
            _ => {
                self.enabled.allows(protocol)
                    && (self.mode == ModemMode::Idle || self.mode == protocol)
            }
        }
    }
}
