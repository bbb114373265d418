//! Command dispatcher
//!
//! Turns one complete inbound frame into exactly one reply: an ACK, a NAK, or
//! the command's own reply frame (status/version). Validation happens before
//! any state is touched, so a rejected command leaves mode, enable flags and
//! configuration exactly as they were.

use tracing::warn;

use super::engines::Engines;
use super::state::ConfigSnapshot;
use super::{FrameSink, HostLink};
use crate::mmdvm::frame::Frame;
use crate::mmdvm::protocol::*;

impl<S: FrameSink> HostLink<S> {
    /// Dispatch a complete frame
    pub(crate) fn dispatch(&mut self, frame: &Frame) {
        let command_byte = frame.command();
        let payload = frame.payload();

        let Some(command) = Command::from_byte(command_byte) else {
            warn!("Unknown command 0x{:02X}", command_byte);
            self.send_nak(command_byte, ErrorCode::UnknownCommand);
            return;
        };

        let (result, context) = match command {
            Command::GetStatus => {
                self.send_status();
                return;
            }
            Command::GetVersion => {
                self.send_version();
                return;
            }
            Command::SetConfig => (self.set_config(payload), "Received invalid configuration"),
            Command::SetMode => (self.request_mode(payload), "Received invalid mode"),
            Command::CalData => (self.cal_data(payload), "Received invalid calibration data"),
            Command::DStarHeader => (
                self.forward(ModemMode::DStar, payload, |e, p| e.dstar_tx.write_header(p)),
                "Received invalid D-Star header",
            ),
            Command::DStarData => (
                self.forward(ModemMode::DStar, payload, |e, p| e.dstar_tx.write_data(p)),
                "Received invalid D-Star data",
            ),
            Command::DStarEot => (
                self.forward(ModemMode::DStar, payload, |e, p| e.dstar_tx.write_eot(p)),
                "Received invalid D-Star EOT",
            ),
            Command::DmrData1 => (
                self.forward(ModemMode::Dmr, payload, |e, p| e.dmr_tx.write_data(DmrSlot::One, p)),
                "Received invalid DMR data",
            ),
            Command::DmrData2 => (
                self.forward(ModemMode::Dmr, payload, |e, p| e.dmr_tx.write_data(DmrSlot::Two, p)),
                "Received invalid DMR data",
            ),
            Command::DmrShortLc => (self.dmr_short_lc(payload), "Received invalid DMR Short LC"),
            Command::DmrStart => (self.dmr_start(payload), "Received invalid DMR start"),
            Command::YsfData => (
                self.forward(ModemMode::Ysf, payload, |e, p| e.ysf_tx.write_data(p)),
                "Received invalid System Fusion data",
            ),
            // Only ever sent by the modem
            Command::DStarLost
            | Command::DmrLost1
            | Command::DmrLost2
            | Command::YsfLost
            | Command::Ack
            | Command::Nak
            | Command::Dump
            | Command::Debug1
            | Command::Debug2
            | Command::Debug3
            | Command::Debug4
            | Command::Debug5
            | Command::Samples => (Err(ErrorCode::UnknownCommand), "Received modem-only command"),
        };

        match result {
            Ok(()) => self.send_ack(command_byte),
            Err(error) => {
                warn!("{} (command 0x{:02X}): {}", context, command_byte, error);
                self.write_debug(context, &[error.code() as i16]);
                self.send_nak(command_byte, error);
            }
        }
    }

    fn set_config(&mut self, payload: &[u8]) -> Result<(), ErrorCode> {
        let snapshot = ConfigSnapshot::parse(payload)?;
        let mode = snapshot.mode;

        if self.state.apply_config(snapshot, &mut self.engines) {
            self.write_debug(&format!("Mode set to {}", mode), &[]);
        }
        Ok(())
    }

    fn request_mode(&mut self, payload: &[u8]) -> Result<(), ErrorCode> {
        let byte = *payload.first().ok_or(ErrorCode::InvalidParameter)?;
        let mode = ModemMode::from_byte(byte).ok_or(ErrorCode::InvalidParameter)?;

        if self.state.request_mode(mode, &mut self.engines)? {
            self.write_debug(&format!("Mode set to {}", mode), &[]);
        }
        Ok(())
    }

    fn cal_data(&mut self, payload: &[u8]) -> Result<(), ErrorCode> {
        if self.state.mode() != ModemMode::Calibrate {
            return Err(ErrorCode::InvalidLength);
        }
        self.engines.calibration.write(payload)
    }

    /// Admission check, forward, then promote Idle to `protocol` on success
    fn forward<F>(&mut self, protocol: ModemMode, payload: &[u8], write: F) -> Result<(), ErrorCode>
    where
        F: FnOnce(&mut Engines, &[u8]) -> Result<(), ErrorCode>,
    {
        self.state.admit(protocol)?;
        write(&mut self.engines, payload)?;

        if self.state.mode() == ModemMode::Idle {
            self.set_mode(protocol);
        }
        Ok(())
    }

    fn dmr_short_lc(&mut self, payload: &[u8]) -> Result<(), ErrorCode> {
        if !self.state.enabled().dmr {
            return Err(ErrorCode::InvalidParameter);
        }
        self.engines.dmr_tx.write_short_lc(payload)
    }

    fn dmr_start(&mut self, payload: &[u8]) -> Result<(), ErrorCode> {
        if !self.state.enabled().dmr {
            return Err(ErrorCode::InvalidParameter);
        }

        match (payload, self.state.mode()) {
            ([0x01], ModemMode::Idle) => {
                self.engines.dmr_tx.set_start(true);
                self.set_mode(ModemMode::Dmr);
                Ok(())
            }
            ([0x00], ModemMode::Dmr) => {
                self.engines.dmr_tx.set_start(false);
                self.set_mode(ModemMode::Idle);
                Ok(())
            }
            _ => Err(ErrorCode::InvalidParameter),
        }
    }
}
