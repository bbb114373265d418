//! # MMDVM Protocol Constants and Types
//!
//! Core protocol definitions for the MMDVM host link.
//!
//! Every frame on the wire has the shape:
//!
//! ```text
//! [0xE0, length, command, payload...]
//! ```
//!
//! where `length` counts the whole frame including the three header bytes.

use thiserror::Error;

/// Frame start marker (always 0xE0)
pub const MMDVM_FRAME_START: u8 = 0xE0;

/// Header size: marker(1) + length(1) + command(1)
pub const MMDVM_HEADER_SIZE: usize = 3;

/// Maximum legal value of the length byte
pub const MMDVM_MAX_FRAME_LENGTH: usize = 130;

/// Maximum payload size (130 - 3 = 127 bytes)
pub const MMDVM_MAX_PAYLOAD_SIZE: usize = MMDVM_MAX_FRAME_LENGTH - MMDVM_HEADER_SIZE;

/// Host-link protocol version reported by GetVersion
pub const PROTOCOL_VERSION: u8 = 1;

/// Identification string reported by GetVersion
pub const HARDWARE_DESCRIPTION: &str = "MMDVM 20160114 (D-Star/DMR/System Fusion)";

/// Status reply payload size
pub const STATUS_PAYLOAD_SIZE: usize = 7;

/// SetConfig minimum payload size
pub const SET_CONFIG_PAYLOAD_SIZE: usize = 7;

/// Longest TX delay accepted by SetConfig
pub const MAX_TX_DELAY: u8 = 50;

/// Largest DMR color code accepted by SetConfig
pub const MAX_COLOR_CODE: u8 = 15;

/// Outbound passthrough payload caps
pub const DSTAR_HEADER_MAX_PAYLOAD: usize = 47;
pub const DSTAR_DATA_MAX_PAYLOAD: usize = 17;
pub const DMR_DATA_MAX_PAYLOAD: usize = 37;
pub const YSF_DATA_MAX_PAYLOAD: usize = MMDVM_MAX_PAYLOAD_SIZE;
pub const CAL_DATA_MAX_PAYLOAD: usize = MMDVM_MAX_PAYLOAD_SIZE;

/// Command byte of an MMDVM frame
///
/// Covers both directions: some commands are only ever sent by the modem
/// (ACK/NAK, lost-signal notifications, diagnostics) and are answered with
/// `UnknownCommand` when they arrive from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetVersion,
    GetStatus,
    SetConfig,
    SetMode,
    CalData,
    DStarHeader,
    DStarData,
    DStarLost,
    DStarEot,
    DmrData1,
    DmrLost1,
    DmrData2,
    DmrLost2,
    DmrShortLc,
    DmrStart,
    YsfData,
    YsfLost,
    Ack,
    Nak,
    Dump,
    Debug1,
    Debug2,
    Debug3,
    Debug4,
    Debug5,
    Samples,
}

impl Command {
    /// Decode a command byte, returning `None` for bytes outside the command set
    pub fn from_byte(byte: u8) -> Option<Self> {
        let command = match byte {
            0x00 => Command::GetVersion,
            0x01 => Command::GetStatus,
            0x02 => Command::SetConfig,
            0x03 => Command::SetMode,
            0x08 => Command::CalData,
            0x10 => Command::DStarHeader,
            0x11 => Command::DStarData,
            0x12 => Command::DStarLost,
            0x13 => Command::DStarEot,
            0x18 => Command::DmrData1,
            0x19 => Command::DmrLost1,
            0x1A => Command::DmrData2,
            0x1B => Command::DmrLost2,
            0x1C => Command::DmrShortLc,
            0x1D => Command::DmrStart,
            0x20 => Command::YsfData,
            0x21 => Command::YsfLost,
            0x70 => Command::Ack,
            0x7F => Command::Nak,
            0xF0 => Command::Dump,
            0xF1 => Command::Debug1,
            0xF2 => Command::Debug2,
            0xF3 => Command::Debug3,
            0xF4 => Command::Debug4,
            0xF5 => Command::Debug5,
            0xF8 => Command::Samples,
            _ => return None,
        };

        Some(command)
    }

    /// Wire value of this command
    pub fn byte(self) -> u8 {
        match self {
            Command::GetVersion => 0x00,
            Command::GetStatus => 0x01,
            Command::SetConfig => 0x02,
            Command::SetMode => 0x03,
            Command::CalData => 0x08,
            Command::DStarHeader => 0x10,
            Command::DStarData => 0x11,
            Command::DStarLost => 0x12,
            Command::DStarEot => 0x13,
            Command::DmrData1 => 0x18,
            Command::DmrLost1 => 0x19,
            Command::DmrData2 => 0x1A,
            Command::DmrLost2 => 0x1B,
            Command::DmrShortLc => 0x1C,
            Command::DmrStart => 0x1D,
            Command::YsfData => 0x20,
            Command::YsfLost => 0x21,
            Command::Ack => 0x70,
            Command::Nak => 0x7F,
            Command::Dump => 0xF0,
            Command::Debug1 => 0xF1,
            Command::Debug2 => 0xF2,
            Command::Debug3 => 0xF3,
            Command::Debug4 => 0xF4,
            Command::Debug5 => 0xF5,
            Command::Samples => 0xF8,
        }
    }
}

/// NAK error code
///
/// Engines and the calibration sink report failures with these codes; the
/// dispatcher passes them back to the host unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(u8)]
pub enum ErrorCode {
    /// Command byte not accepted from the host (code 1)
    #[error("unknown command")]
    UnknownCommand = 1,

    /// Generic rejection (code 2)
    ///
    /// Engines report payloads of the wrong size with it. It is also the code
    /// for a payload command refused because another mode holds the modem,
    /// and for a frame whose length byte is shorter than its own header.
    #[error("invalid length or rejected by engine")]
    InvalidLength = 2,

    /// Length byte above 130 (code 3)
    #[error("oversize frame")]
    OversizeFrame = 3,

    /// Field out of range, or the protocol is disabled (code 4)
    #[error("invalid parameter")]
    InvalidParameter = 4,
}

impl ErrorCode {
    /// Wire value of this code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire value
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ErrorCode::UnknownCommand),
            2 => Some(ErrorCode::InvalidLength),
            3 => Some(ErrorCode::OversizeFrame),
            4 => Some(ErrorCode::InvalidParameter),
            _ => None,
        }
    }
}

/// Modem operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModemMode {
    #[default]
    Idle,
    DStar,
    Dmr,
    Ysf,
    Calibrate,
}

impl ModemMode {
    /// Decode a mode byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ModemMode::Idle),
            1 => Some(ModemMode::DStar),
            2 => Some(ModemMode::Dmr),
            3 => Some(ModemMode::Ysf),
            99 => Some(ModemMode::Calibrate),
            _ => None,
        }
    }

    /// Wire value of this mode
    pub fn byte(self) -> u8 {
        match self {
            ModemMode::Idle => 0,
            ModemMode::DStar => 1,
            ModemMode::Dmr => 2,
            ModemMode::Ysf => 3,
            ModemMode::Calibrate => 99,
        }
    }
}

impl std::fmt::Display for ModemMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModemMode::Idle => write!(f, "Idle"),
            ModemMode::DStar => write!(f, "D-Star"),
            ModemMode::Dmr => write!(f, "DMR"),
            ModemMode::Ysf => write!(f, "System Fusion"),
            ModemMode::Calibrate => write!(f, "Calibrate"),
        }
    }
}

/// Per-protocol enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnableFlags {
    pub dstar: bool,
    pub dmr: bool,
    pub ysf: bool,
}

impl EnableFlags {
    const DSTAR_BIT: u8 = 0x01;
    const DMR_BIT: u8 = 0x02;
    const YSF_BIT: u8 = 0x04;

    /// Decode an enable bitmask; unused bits are ignored
    pub fn from_bits(bits: u8) -> Self {
        Self {
            dstar: bits & Self::DSTAR_BIT != 0,
            dmr: bits & Self::DMR_BIT != 0,
            ysf: bits & Self::YSF_BIT != 0,
        }
    }

    /// Encode as the wire bitmask
    pub fn bits(self) -> u8 {
        let mut bits = 0;
        if self.dstar {
            bits |= Self::DSTAR_BIT;
        }
        if self.dmr {
            bits |= Self::DMR_BIT;
        }
        if self.ysf {
            bits |= Self::YSF_BIT;
        }
        bits
    }

    /// Whether `mode` may be selected under these flags
    ///
    /// Idle and Calibrate are always allowed.
    pub fn allows(self, mode: ModemMode) -> bool {
        match mode {
            ModemMode::Idle | ModemMode::Calibrate => true,
            ModemMode::DStar => self.dstar,
            ModemMode::Dmr => self.dmr,
            ModemMode::Ysf => self.ysf,
        }
    }
}

/// Contents of a GetStatus reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModemStatus {
    /// Enabled protocols
    pub enabled: EnableFlags,

    /// Current operating mode
    pub mode: ModemMode,

    /// Modem is keyed up
    pub transmitting: bool,

    /// ADC overflow seen by the I/O layer
    pub adc_overflow: bool,

    /// Receive buffer overflow
    pub rx_overflow: bool,

    /// Transmit buffer overflow
    pub tx_overflow: bool,

    /// Free D-Star transmit space (0 when disabled)
    pub dstar_space: u8,

    /// Free DMR slot 1 transmit space (0 when disabled)
    pub dmr_space1: u8,

    /// Free DMR slot 2 transmit space (0 when disabled)
    pub dmr_space2: u8,

    /// Free System Fusion transmit space (0 when disabled)
    pub ysf_space: u8,
}

impl ModemStatus {
    const TX_BIT: u8 = 0x01;
    const ADC_OVERFLOW_BIT: u8 = 0x02;
    const RX_OVERFLOW_BIT: u8 = 0x04;
    const TX_OVERFLOW_BIT: u8 = 0x08;

    /// Transmit/overflow bitmask
    pub fn flag_bits(&self) -> u8 {
        let mut bits = 0;
        if self.transmitting {
            bits |= Self::TX_BIT;
        }
        if self.adc_overflow {
            bits |= Self::ADC_OVERFLOW_BIT;
        }
        if self.rx_overflow {
            bits |= Self::RX_OVERFLOW_BIT;
        }
        if self.tx_overflow {
            bits |= Self::TX_OVERFLOW_BIT;
        }
        bits
    }

    /// Apply a transmit/overflow bitmask
    pub fn set_flag_bits(&mut self, bits: u8) {
        self.transmitting = bits & Self::TX_BIT != 0;
        self.adc_overflow = bits & Self::ADC_OVERFLOW_BIT != 0;
        self.rx_overflow = bits & Self::RX_OVERFLOW_BIT != 0;
        self.tx_overflow = bits & Self::TX_OVERFLOW_BIT != 0;
    }
}

/// Contents of a GetVersion reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Host-link protocol version
    pub protocol_version: u8,

    /// Free-form hardware/firmware identification
    pub description: String,
}

/// DMR time slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmrSlot {
    One,
    Two,
}
