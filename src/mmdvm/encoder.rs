//! # MMDVM Frame Encoder
//!
//! Builds every outbound frame type into one reusable 130-byte buffer.
//!
//! Each builder method returns a slice borrowed from that buffer, valid until
//! the next call. The length byte is filled in after the payload has been
//! assembled, and payloads are truncated so the frame never exceeds
//! [`MMDVM_MAX_FRAME_LENGTH`].

use super::protocol::*;

/// Outbound frame builder
///
/// # Examples
///
/// ```
/// use mmdvm_hostlink::mmdvm::encoder::FrameBuilder;
/// use mmdvm_hostlink::mmdvm::protocol::Command;
///
/// let mut builder = FrameBuilder::new();
/// assert_eq!(builder.ack(Command::SetMode.byte()), &[0xE0, 0x04, 0x70, 0x03]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    buffer: [u8; MMDVM_MAX_FRAME_LENGTH],
    len: usize,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self {
            buffer: [0u8; MMDVM_MAX_FRAME_LENGTH],
            len: 0,
        }
    }

    fn begin(&mut self, command: Command) {
        self.buffer[0] = MMDVM_FRAME_START;
        self.buffer[1] = 0;
        self.buffer[2] = command.byte();
        self.len = MMDVM_HEADER_SIZE;
    }

    fn remaining(&self) -> usize {
        MMDVM_MAX_FRAME_LENGTH - self.len
    }

    fn push(&mut self, byte: u8) {
        if self.len < MMDVM_MAX_FRAME_LENGTH {
            self.buffer[self.len] = byte;
            self.len += 1;
        }
    }

    fn extend(&mut self, data: &[u8]) {
        let take = data.len().min(self.remaining());
        self.buffer[self.len..self.len + take].copy_from_slice(&data[..take]);
        self.len += take;
    }

    fn finish(&mut self) -> &[u8] {
        self.buffer[1] = self.len as u8;
        &self.buffer[..self.len]
    }

    /// `[marker, 4, ACK, command]`
    pub fn ack(&mut self, command: u8) -> &[u8] {
        self.begin(Command::Ack);
        self.push(command);
        self.finish()
    }

    /// `[marker, 5, NAK, command, code]`
    pub fn nak(&mut self, command: u8, error: ErrorCode) -> &[u8] {
        self.begin(Command::Nak);
        self.push(command);
        self.push(error.code());
        self.finish()
    }

    /// GetStatus reply (10 bytes)
    pub fn status(&mut self, status: &ModemStatus) -> &[u8] {
        self.begin(Command::GetStatus);
        self.push(status.enabled.bits());
        self.push(status.mode.byte());
        self.push(status.flag_bits());
        self.push(status.dstar_space);
        self.push(status.dmr_space1);
        self.push(status.dmr_space2);
        self.push(status.ysf_space);
        self.finish()
    }

    /// GetVersion reply: protocol version then the identification string
    pub fn version(&mut self, protocol_version: u8, description: &str) -> &[u8] {
        self.begin(Command::GetVersion);
        self.push(protocol_version);
        self.extend(description.as_bytes());
        self.finish()
    }

    /// Passthrough frame carrying at most `cap` bytes of `payload`
    pub fn passthrough(&mut self, command: Command, payload: &[u8], cap: usize) -> &[u8] {
        self.begin(command);
        let take = payload.len().min(cap);
        self.extend(&payload[..take]);
        self.finish()
    }

    /// Header-only frame (lost-signal and EOT notifications)
    pub fn signal(&mut self, command: Command) -> &[u8] {
        self.begin(command);
        self.finish()
    }

    /// Raw dump frame
    pub fn dump(&mut self, data: &[u8]) -> &[u8] {
        self.begin(Command::Dump);
        self.extend(data);
        self.finish()
    }

    /// Sample frame: big-endian 16-bit values
    pub fn samples(&mut self, samples: &[i16]) -> &[u8] {
        self.begin(Command::Samples);
        for &sample in samples.iter().take(self.remaining() / 2) {
            self.extend(&sample.to_be_bytes());
        }
        self.finish()
    }

    /// Debug frame: text followed by up to four big-endian 16-bit values
    ///
    /// The command is Debug1 for no values through Debug5 for four. Text is
    /// truncated so the values always fit.
    pub fn debug(&mut self, text: &str, values: &[i16]) -> &[u8] {
        let values = &values[..values.len().min(4)];
        let command = match values.len() {
            0 => Command::Debug1,
            1 => Command::Debug2,
            2 => Command::Debug3,
            3 => Command::Debug4,
            _ => Command::Debug5,
        };

        self.begin(command);
        let text_room = self.remaining() - values.len() * 2;
        let text = text.as_bytes();
        self.extend(&text[..text.len().min(text_room)]);
        for &value in values {
            self.extend(&value.to_be_bytes());
        }
        self.finish()
    }

    /// Assertion report, sent as Debug2: `text ' ' file` then the line number
    pub fn assertion(&mut self, text: &str, file: &str, line: u32) -> &[u8] {
        self.begin(Command::Debug2);
        let mut room = self.remaining() - 2;

        let text = text.as_bytes();
        let take = text.len().min(room);
        self.extend(&text[..take]);
        room -= take;

        if room > 0 {
            self.push(b' ');
            room -= 1;
        }

        let file = file.as_bytes();
        self.extend(&file[..file.len().min(room)]);

        // Line number is sent as its low 16 bits
        self.extend(&(line as u16).to_be_bytes());
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_frame() {
        let mut builder = FrameBuilder::new();
        assert_eq!(builder.ack(0x02), &[0xE0, 0x04, 0x70, 0x02]);
    }

    #[test]
    fn test_nak_frame() {
        let mut builder = FrameBuilder::new();
        assert_eq!(
            builder.nak(0x02, ErrorCode::InvalidParameter),
            &[0xE0, 0x05, 0x7F, 0x02, 0x04]
        );
    }

    #[test]
    fn test_status_frame() {
        let status = ModemStatus {
            enabled: EnableFlags { dstar: true, dmr: true, ysf: false },
            mode: ModemMode::Dmr,
            transmitting: true,
            adc_overflow: false,
            rx_overflow: true,
            tx_overflow: false,
            dstar_space: 10,
            dmr_space1: 20,
            dmr_space2: 21,
            ysf_space: 0,
        };

        let mut builder = FrameBuilder::new();
        assert_eq!(
            builder.status(&status),
            &[0xE0, 0x0A, 0x01, 0x03, 0x02, 0x05, 10, 20, 21, 0]
        );
    }

    #[test]
    fn test_version_frame() {
        let mut builder = FrameBuilder::new();
        let frame = builder.version(PROTOCOL_VERSION, HARDWARE_DESCRIPTION).to_vec();

        assert_eq!(frame[0], MMDVM_FRAME_START);
        assert_eq!(frame[1] as usize, frame.len());
        assert_eq!(frame[2], 0x00);
        assert_eq!(frame[3], 1);
        assert_eq!(&frame[4..], HARDWARE_DESCRIPTION.as_bytes());
    }

    #[test]
    fn test_passthrough_is_capped() {
        let mut builder = FrameBuilder::new();
        let payload = [0x11u8; 40];

        let frame = builder.passthrough(Command::DStarData, &payload, DSTAR_DATA_MAX_PAYLOAD);
        assert_eq!(frame.len(), 3 + 17);
        assert_eq!(frame[1], 20);
        assert_eq!(frame[2], 0x11);
    }

    #[test]
    fn test_passthrough_never_exceeds_frame_limit() {
        let mut builder = FrameBuilder::new();
        let payload = [0x22u8; 300];

        let frame = builder.passthrough(Command::YsfData, &payload, usize::MAX);
        assert_eq!(frame.len(), MMDVM_MAX_FRAME_LENGTH);
        assert_eq!(frame[1], 130);
    }

    #[test]
    fn test_signal_frame() {
        let mut builder = FrameBuilder::new();
        assert_eq!(builder.signal(Command::DmrLost2), &[0xE0, 0x03, 0x1B]);
    }

    #[test]
    fn test_buffer_reused_between_frames() {
        let mut builder = FrameBuilder::new();
        builder.passthrough(Command::YsfData, &[0x33u8; 100], YSF_DATA_MAX_PAYLOAD);

        // A shorter frame must not carry stale bytes
        assert_eq!(builder.ack(0x20), &[0xE0, 0x04, 0x70, 0x20]);
    }

    #[test]
    fn test_debug_frames_select_command_by_value_count() {
        let mut builder = FrameBuilder::new();

        assert_eq!(builder.debug("hi", &[]), &[0xE0, 0x05, 0xF1, b'h', b'i']);
        assert_eq!(
            builder.debug("x", &[0x0102]),
            &[0xE0, 0x06, 0xF2, b'x', 0x01, 0x02]
        );
        assert_eq!(
            builder.debug("", &[-1, 2]),
            &[0xE0, 0x07, 0xF3, 0xFF, 0xFF, 0x00, 0x02]
        );
        assert_eq!(builder.debug("", &[0, 0, 0])[2], 0xF4);
        assert_eq!(builder.debug("", &[0, 0, 0, 0])[2], 0xF5);
    }

    #[test]
    fn test_debug_long_text_keeps_values() {
        let mut builder = FrameBuilder::new();
        let text = "a".repeat(200);

        let frame = builder.debug(&text, &[0x7FFF]).to_vec();
        assert_eq!(frame.len(), MMDVM_MAX_FRAME_LENGTH);
        assert_eq!(&frame[frame.len() - 2..], &[0x7F, 0xFF]);
    }

    #[test]
    fn test_samples_frame() {
        let mut builder = FrameBuilder::new();
        assert_eq!(
            builder.samples(&[1, -2]),
            &[0xE0, 0x07, 0xF8, 0x00, 0x01, 0xFF, 0xFE]
        );

        // 63 samples fit in 127 payload bytes
        let frame = builder.samples(&[0i16; 100]).to_vec();
        assert_eq!(frame.len(), 3 + 126);
    }

    #[test]
    fn test_dump_frame_truncated() {
        let mut builder = FrameBuilder::new();
        let frame = builder.dump(&[0xAB; 252]).to_vec();
        assert_eq!(frame.len(), MMDVM_MAX_FRAME_LENGTH);
        assert_eq!(frame[2], 0xF0);
    }

    #[test]
    fn test_assertion_frame() {
        let mut builder = FrameBuilder::new();
        let frame = builder.assertion("len<=8", "io.rs", 300).to_vec();

        assert_eq!(frame[2], 0xF2);
        assert_eq!(&frame[3..frame.len() - 2], b"len<=8 io.rs");
        assert_eq!(&frame[frame.len() - 2..], &300u16.to_be_bytes());
        assert_eq!(frame[1] as usize, frame.len());
    }
}
