//! Simulated engines for running the host link without a radio
//!
//! Each transmit engine is a bounded queue of frames. Every call to
//! [`SimModem::tick`] "transmits" one queued frame per queue, so the free
//! space reported in GetStatus rises and falls the way it would on hardware.
//! Payload sizes are checked against the real frame lengths of each protocol.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use super::engines::*;
use crate::config::EngineConfig;
use crate::mmdvm::protocol::{DmrSlot, ErrorCode};

/// D-Star radio header length
pub const DSTAR_HEADER_LENGTH: usize = 41;

/// D-Star voice frame length
pub const DSTAR_DATA_LENGTH: usize = 12;

/// DMR burst length plus control byte
pub const DMR_DATA_LENGTH: usize = 34;

/// DMR short link control length
pub const DMR_SHORT_LC_LENGTH: usize = 9;

/// System Fusion frame length plus control byte
pub const YSF_DATA_LENGTH: usize = 121;

#[derive(Debug)]
struct TxQueue {
    capacity: usize,
    frames: VecDeque<usize>,
}

impl TxQueue {
    fn new(capacity: u8) -> Self {
        Self {
            capacity: capacity as usize,
            frames: VecDeque::with_capacity(capacity as usize),
        }
    }

    fn push(&mut self, data: &[u8], expected_length: Option<usize>) -> Result<(), ErrorCode> {
        if let Some(expected) = expected_length {
            if data.len() != expected {
                return Err(ErrorCode::InvalidLength);
            }
        }
        if self.frames.len() >= self.capacity {
            return Err(ErrorCode::InvalidLength);
        }
        self.frames.push_back(data.len());
        Ok(())
    }

    fn space(&self) -> u8 {
        (self.capacity - self.frames.len()).min(u8::MAX as usize) as u8
    }

    fn clear(&mut self) {
        self.frames.clear();
    }
}

#[derive(Debug)]
struct SimState {
    dstar: TxQueue,
    dmr: [TxQueue; 2],
    ysf: TxQueue,
    dmr_started: bool,
    tx_delay: u8,
    color_code: u8,
    parameters: IoParameters,
    running: bool,
    rx_resets: u64,
    calibration_bytes: usize,
}

impl SimState {
    fn transmitting(&self) -> bool {
        self.dmr_started
            || !self.dstar.frames.is_empty()
            || self.dmr.iter().any(|q| !q.frames.is_empty())
            || !self.ysf.frames.is_empty()
    }
}

fn slot_index(slot: DmrSlot) -> usize {
    match slot {
        DmrSlot::One => 0,
        DmrSlot::Two => 1,
    }
}

/// Handle on the shared simulated modem
#[derive(Debug, Clone)]
pub struct SimModem {
    state: Arc<Mutex<SimState>>,
}

impl SimModem {
    pub fn new(config: &EngineConfig) -> Self {
        let state = SimState {
            dstar: TxQueue::new(config.dstar_capacity),
            dmr: [
                TxQueue::new(config.dmr_slot_capacity),
                TxQueue::new(config.dmr_slot_capacity),
            ],
            ysf: TxQueue::new(config.ysf_capacity),
            dmr_started: false,
            tx_delay: 0,
            color_code: 0,
            parameters: IoParameters::default(),
            running: false,
            rx_resets: 0,
            calibration_bytes: 0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Engine bundle backed by this simulation
    pub fn engines(&self) -> Engines {
        Engines {
            dstar_tx: Box::new(SimDStarTx(self.clone())),
            dmr_tx: Box::new(SimDmrTx(self.clone())),
            ysf_tx: Box::new(SimYsfTx(self.clone())),
            dstar_rx: Box::new(SimRx(self.clone())),
            dmr_rx: Box::new(SimRx(self.clone())),
            ysf_rx: Box::new(SimRx(self.clone())),
            calibration: Box::new(SimCalibration(self.clone())),
            io: Box::new(SimIo(self.clone())),
        }
    }

    /// Transmit one queued frame from every non-empty queue
    pub fn tick(&self) {
        let mut state = self.lock();
        if state.dstar.frames.pop_front().is_some() {
            trace!("Sent D-Star frame");
        }
        for (index, queue) in state.dmr.iter_mut().enumerate() {
            if queue.frames.pop_front().is_some() {
                trace!("Sent DMR slot {} frame", index + 1);
            }
        }
        if state.ysf.frames.pop_front().is_some() {
            trace!("Sent System Fusion frame");
        }
    }

    /// Receiver resets seen so far
    pub fn rx_resets(&self) -> u64 {
        self.lock().rx_resets
    }

    /// Calibration bytes accepted so far
    pub fn calibration_bytes(&self) -> usize {
        self.lock().calibration_bytes
    }

    pub fn tx_delay(&self) -> u8 {
        self.lock().tx_delay
    }

    pub fn color_code(&self) -> u8 {
        self.lock().color_code
    }

    pub fn parameters(&self) -> IoParameters {
        self.lock().parameters
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock leaves plain counters behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct SimDStarTx(SimModem);

impl DStarTx for SimDStarTx {
    fn write_header(&mut self, header: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().dstar.push(header, Some(DSTAR_HEADER_LENGTH))
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().dstar.push(data, Some(DSTAR_DATA_LENGTH))
    }

    fn write_eot(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().dstar.push(data, None)
    }

    fn set_tx_delay(&mut self, delay: u8) {
        self.0.lock().tx_delay = delay;
    }

    fn space(&self) -> u8 {
        self.0.lock().dstar.space()
    }
}

struct SimDmrTx(SimModem);

impl DmrTx for SimDmrTx {
    fn write_data(&mut self, slot: DmrSlot, data: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().dmr[slot_index(slot)].push(data, Some(DMR_DATA_LENGTH))
    }

    fn write_short_lc(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        if data.len() != DMR_SHORT_LC_LENGTH {
            return Err(ErrorCode::InvalidLength);
        }
        debug!("Short LC updated: {:02X?}", data);
        Ok(())
    }

    fn set_start(&mut self, start: bool) {
        let mut state = self.0.lock();
        state.dmr_started = start;
        if !start {
            state.dmr.iter_mut().for_each(TxQueue::clear);
        }
    }

    fn set_color_code(&mut self, color_code: u8) {
        self.0.lock().color_code = color_code;
    }

    fn space(&self, slot: DmrSlot) -> u8 {
        self.0.lock().dmr[slot_index(slot)].space()
    }
}

struct SimYsfTx(SimModem);

impl YsfTx for SimYsfTx {
    fn write_data(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().ysf.push(data, Some(YSF_DATA_LENGTH))
    }

    fn set_tx_delay(&mut self, delay: u8) {
        self.0.lock().tx_delay = delay;
    }

    fn space(&self) -> u8 {
        self.0.lock().ysf.space()
    }
}

struct SimRx(SimModem);

impl RxEngine for SimRx {
    fn reset(&mut self) {
        self.0.lock().rx_resets += 1;
    }
}

struct SimCalibration(SimModem);

impl CalibrationSink for SimCalibration {
    fn write(&mut self, data: &[u8]) -> Result<(), ErrorCode> {
        self.0.lock().calibration_bytes += data.len();
        Ok(())
    }
}

struct SimIo(SimModem);

impl ModemIo for SimIo {
    fn set_parameters(&mut self, parameters: IoParameters) {
        self.0.lock().parameters = parameters;
    }

    fn start(&mut self) {
        let mut state = self.0.lock();
        if !state.running {
            debug!("Simulated I/O started");
        }
        state.running = true;
    }

    fn is_transmitting(&self) -> bool {
        self.0.lock().transmitting()
    }

    fn has_adc_overflow(&self) -> bool {
        false
    }

    fn has_rx_overflow(&self) -> bool {
        false
    }

    fn has_tx_overflow(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmdvm::decoder::{decode_reply, Reply};
    use crate::modem::{HostLink, OutboundQueue};

    fn engine_config() -> EngineConfig {
        EngineConfig {
            dstar_capacity: 2,
            dmr_slot_capacity: 2,
            ysf_capacity: 2,
            airtime_ms: 20,
        }
    }

    fn frame(command: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xE0, (3 + payload.len()) as u8, command];
        bytes.extend_from_slice(payload);
        bytes
    }

    fn replies(link: &mut HostLink) -> Vec<Reply> {
        link.sink_mut()
            .drain()
            .map(|f| decode_reply(&f.bytes).unwrap())
            .collect()
    }

    #[test]
    fn test_queue_fills_and_drains() {
        let sim = SimModem::new(&engine_config());
        let mut engines = sim.engines();

        assert_eq!(engines.dstar_tx.space(), 2);
        assert!(engines.dstar_tx.write_data(&[0u8; 12]).is_ok());
        assert!(engines.dstar_tx.write_data(&[0u8; 12]).is_ok());
        assert_eq!(engines.dstar_tx.space(), 0);
        assert_eq!(engines.dstar_tx.write_data(&[0u8; 12]), Err(ErrorCode::InvalidLength));
        assert!(engines.io.is_transmitting());

        sim.tick();
        assert_eq!(engines.dstar_tx.space(), 1);
        sim.tick();
        assert!(!engines.io.is_transmitting());
    }

    #[test]
    fn test_wrong_payload_length() {
        let sim = SimModem::new(&engine_config());
        let mut engines = sim.engines();

        assert_eq!(engines.dstar_tx.write_header(&[0u8; 40]), Err(ErrorCode::InvalidLength));
        assert_eq!(
            engines.dmr_tx.write_data(DmrSlot::One, &[0u8; 33]),
            Err(ErrorCode::InvalidLength)
        );
        assert_eq!(engines.ysf_tx.write_data(&[0u8; 120]), Err(ErrorCode::InvalidLength));
        assert_eq!(engines.dmr_tx.write_short_lc(&[0u8; 5]), Err(ErrorCode::InvalidLength));
    }

    #[test]
    fn test_dmr_stop_clears_slots() {
        let sim = SimModem::new(&engine_config());
        let mut engines = sim.engines();

        engines.dmr_tx.set_start(true);
        engines.dmr_tx.write_data(DmrSlot::Two, &[0u8; 34]).unwrap();
        assert_eq!(engines.dmr_tx.space(DmrSlot::Two), 1);

        engines.dmr_tx.set_start(false);
        assert_eq!(engines.dmr_tx.space(DmrSlot::Two), 2);
        assert!(!engines.io.is_transmitting());
    }

    #[test]
    fn test_host_link_over_simulation() {
        let sim = SimModem::new(&engine_config());
        let mut link = HostLink::new(sim.engines(), OutboundQueue::new());

        link.process(&frame(0x02, &[0x01, 0x07, 25, 0, 100, 110, 3]));
        assert_eq!(replies(&mut link), vec![Reply::Ack { command: 0x02 }]);
        assert!(sim.is_running());
        assert_eq!(sim.tx_delay(), 25);
        assert_eq!(sim.color_code(), 3);
        assert!(sim.parameters().rx_invert);

        link.process(&frame(0x20, &[0u8; 121]));
        link.process(&[0xE0, 0x03, 0x01]);

        match replies(&mut link).as_slice() {
            [Reply::Ack { command: 0x20 }, Reply::Status(status)] => {
                assert_eq!(status.ysf_space, 1);
                assert_eq!(status.dstar_space, 2);
                assert!(status.transmitting);
            }
            other => panic!("unexpected replies: {:?}", other),
        }
        assert_eq!(sim.rx_resets(), 2);
    }

    #[test]
    fn test_calibration_bytes_counted() {
        let sim = SimModem::new(&engine_config());
        let mut link = HostLink::new(sim.engines(), OutboundQueue::new());

        link.process(&frame(0x03, &[99]));
        link.process(&frame(0x08, &[1, 2, 3, 4]));

        assert_eq!(
            replies(&mut link),
            vec![Reply::Ack { command: 0x03 }, Reply::Ack { command: 0x08 }]
        );
        assert_eq!(sim.calibration_bytes(), 4);
        assert_eq!(sim.rx_resets(), 3);
    }
}
