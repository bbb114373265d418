//! # MMDVM Reply Decoder
//!
//! Decodes modem replies on the host side (ACK, NAK, status, version).

use super::protocol::*;
use crate::error::{HostLinkError, Result};

/// A decoded modem reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Positive acknowledgment of `command`
    Ack { command: u8 },

    /// Negative acknowledgment of `command`
    Nak { command: u8, error: ErrorCode },

    /// GetStatus reply
    Status(ModemStatus),

    /// GetVersion reply
    Version(VersionInfo),

    /// Any other frame, left undecoded
    Other { command: u8, payload: Vec<u8> },
}

/// Split a complete frame into command byte and payload
///
/// # Errors
///
/// Returns error if:
/// - Frame is shorter than its header
/// - Start marker is incorrect
/// - Length byte does not match the frame size
pub fn decode_frame(frame: &[u8]) -> Result<(u8, &[u8])> {
    if frame.len() < MMDVM_HEADER_SIZE {
        return Err(HostLinkError::Protocol("Frame too short".to_string()));
    }

    if frame[0] != MMDVM_FRAME_START {
        return Err(HostLinkError::Protocol(format!(
            "Invalid start marker: 0x{:02X}",
            frame[0]
        )));
    }

    let length = frame[1] as usize;
    if length != frame.len() {
        return Err(HostLinkError::Protocol(format!(
            "Length mismatch: header says {} bytes, got {}",
            length,
            frame.len()
        )));
    }

    Ok((frame[2], &frame[MMDVM_HEADER_SIZE..]))
}

/// Decode a complete reply frame
pub fn decode_reply(frame: &[u8]) -> Result<Reply> {
    let (command, payload) = decode_frame(frame)?;

    match Command::from_byte(command) {
        Some(Command::Ack) => {
            let command = *payload
                .first()
                .ok_or_else(|| HostLinkError::Protocol("ACK without command byte".to_string()))?;
            Ok(Reply::Ack { command })
        }
        Some(Command::Nak) => {
            if payload.len() < 2 {
                return Err(HostLinkError::Protocol(format!(
                    "NAK payload too short: {} bytes",
                    payload.len()
                )));
            }
            let error = ErrorCode::from_code(payload[1]).ok_or_else(|| {
                HostLinkError::Protocol(format!("Unknown NAK code: {}", payload[1]))
            })?;
            Ok(Reply::Nak {
                command: payload[0],
                error,
            })
        }
        Some(Command::GetStatus) => decode_status(payload).map(Reply::Status),
        Some(Command::GetVersion) => decode_version(payload).map(Reply::Version),
        _ => Ok(Reply::Other {
            command,
            payload: payload.to_vec(),
        }),
    }
}

/// Decode a GetStatus payload (7 bytes)
pub fn decode_status(payload: &[u8]) -> Result<ModemStatus> {
    if payload.len() < STATUS_PAYLOAD_SIZE {
        return Err(HostLinkError::Protocol(format!(
            "Status payload too short: {} bytes",
            payload.len()
        )));
    }

    let mode = ModemMode::from_byte(payload[1])
        .ok_or_else(|| HostLinkError::Protocol(format!("Unknown modem mode: {}", payload[1])))?;

    let mut status = ModemStatus {
        enabled: EnableFlags::from_bits(payload[0]),
        mode,
        dstar_space: payload[3],
        dmr_space1: payload[4],
        dmr_space2: payload[5],
        ysf_space: payload[6],
        ..ModemStatus::default()
    };
    status.set_flag_bits(payload[2]);

    Ok(status)
}

/// Decode a GetVersion payload
pub fn decode_version(payload: &[u8]) -> Result<VersionInfo> {
    let (&protocol_version, description) = payload
        .split_first()
        .ok_or_else(|| HostLinkError::Protocol("Empty version payload".to_string()))?;

    Ok(VersionInfo {
        protocol_version,
        description: String::from_utf8_lossy(description).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmdvm::encoder::FrameBuilder;

    #[test]
    fn test_decode_frame_too_short() {
        assert!(decode_frame(&[0xE0, 0x03]).is_err());
    }

    #[test]
    fn test_decode_frame_invalid_marker() {
        assert!(decode_frame(&[0xC8, 0x03, 0x01]).is_err());
    }

    #[test]
    fn test_decode_frame_length_mismatch() {
        assert!(decode_frame(&[0xE0, 0x05, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_decode_ack_and_nak() {
        assert_eq!(
            decode_reply(&[0xE0, 0x04, 0x70, 0x03]).unwrap(),
            Reply::Ack { command: 0x03 }
        );
        assert_eq!(
            decode_reply(&[0xE0, 0x05, 0x7F, 0x11, 0x02]).unwrap(),
            Reply::Nak { command: 0x11, error: ErrorCode::InvalidLength }
        );
    }

    #[test]
    fn test_decode_nak_unknown_code() {
        assert!(decode_reply(&[0xE0, 0x05, 0x7F, 0x11, 0x09]).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        let status = ModemStatus {
            enabled: EnableFlags { dstar: false, dmr: true, ysf: true },
            mode: ModemMode::Ysf,
            transmitting: true,
            adc_overflow: true,
            rx_overflow: false,
            tx_overflow: true,
            dstar_space: 0,
            dmr_space1: 7,
            dmr_space2: 8,
            ysf_space: 42,
        };

        let mut builder = FrameBuilder::new();
        let frame = builder.status(&status).to_vec();
        assert_eq!(decode_reply(&frame).unwrap(), Reply::Status(status));
    }

    #[test]
    fn test_version_round_trip() {
        let mut builder = FrameBuilder::new();
        let frame = builder.version(PROTOCOL_VERSION, HARDWARE_DESCRIPTION).to_vec();

        match decode_reply(&frame).unwrap() {
            Reply::Version(info) => {
                assert_eq!(info.protocol_version, 1);
                assert_eq!(info.description, HARDWARE_DESCRIPTION);
            }
            other => panic!("expected version reply, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_status_too_short() {
        assert!(decode_status(&[0x01, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_decode_status_unknown_mode() {
        assert!(decode_status(&[0x01, 0x07, 0x00, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_passthrough_as_other() {
        match decode_reply(&[0xE0, 0x05, 0x20, 0xAA, 0xBB]).unwrap() {
            Reply::Other { command, payload } => {
                assert_eq!(command, 0x20);
                assert_eq!(payload, vec![0xAA, 0xBB]);
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
    }
}
