//! Collaborator interfaces consumed by the host link
//!
//! The protocol engines, calibration sink and modem I/O layer are owned
//! elsewhere; the host link only forwards payloads to them, resets their
//! receive side on mode changes, and reads their space/overflow state.

use crate::mmdvm::protocol::{DmrSlot, ErrorCode};

/// D-Star transmit engine
#[cfg_attr(test, mockall::automock)]
pub trait DStarTx: Send {
    /// Queue a radio header
    fn write_header(&mut self, header: &[u8]) -> Result<(), ErrorCode>;

    /// Queue a voice/data frame
    fn write_data(&mut self, data: &[u8]) -> Result<(), ErrorCode>;

    /// Queue the end-of-transmission marker
    fn write_eot(&mut self, data: &[u8]) -> Result<(), ErrorCode>;

    fn set_tx_delay(&mut self, delay: u8);

    /// Free transmit space
    fn space(&self) -> u8;
}

/// DMR transmit engine (two time slots)
#[cfg_attr(test, mockall::automock)]
pub trait DmrTx: Send {
    fn write_data(&mut self, slot: DmrSlot, data: &[u8]) -> Result<(), ErrorCode>;

    fn write_short_lc(&mut self, data: &[u8]) -> Result<(), ErrorCode>;

    /// Start or stop the continuous DMR transmitter
    fn set_start(&mut self, start: bool);

    fn set_color_code(&mut self, color_code: u8);

    /// Free transmit space in `slot`
    fn space(&self, slot: DmrSlot) -> u8;
}

/// System Fusion transmit engine
#[cfg_attr(test, mockall::automock)]
pub trait YsfTx: Send {
    fn write_data(&mut self, data: &[u8]) -> Result<(), ErrorCode>;

    fn set_tx_delay(&mut self, delay: u8);

    fn space(&self) -> u8;
}

/// Receive side of one protocol engine
#[cfg_attr(test, mockall::automock)]
pub trait RxEngine: Send {
    /// Drop any partial reception
    fn reset(&mut self);

    /// Only DMR receivers care about the color code
    fn set_color_code(&mut self, _color_code: u8) {}
}

/// Sink for calibration payloads
#[cfg_attr(test, mockall::automock)]
pub trait CalibrationSink: Send {
    fn write(&mut self, data: &[u8]) -> Result<(), ErrorCode>;
}

/// Analog/RF parameters applied by SetConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoParameters {
    pub rx_invert: bool,
    pub tx_invert: bool,
    pub ptt_invert: bool,
    pub rx_level: u8,
    pub tx_level: u8,
}

/// Analog/RF I/O layer
#[cfg_attr(test, mockall::automock)]
pub trait ModemIo: Send {
    fn set_parameters(&mut self, parameters: IoParameters);

    /// Start sampling; called after every accepted SetConfig
    fn start(&mut self);

    fn is_transmitting(&self) -> bool;

    fn has_adc_overflow(&self) -> bool;

    fn has_rx_overflow(&self) -> bool;

    fn has_tx_overflow(&self) -> bool;
}

/// Every collaborator the host link talks to
pub struct Engines {
    pub dstar_tx: Box<dyn DStarTx>,
    pub dmr_tx: Box<dyn DmrTx>,
    pub ysf_tx: Box<dyn YsfTx>,
    pub dstar_rx: Box<dyn RxEngine>,
    pub dmr_rx: Box<dyn RxEngine>,
    pub ysf_rx: Box<dyn RxEngine>,
    pub calibration: Box<dyn CalibrationSink>,
    pub io: Box<dyn ModemIo>,
}

impl std::fmt::Debug for Engines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engines").finish_non_exhaustive()
    }
}
