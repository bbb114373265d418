//! # MMDVM Host Link Library
//!
//! Host-link control protocol for an MMDVM digital-voice modem.
//!
//! The host talks to the modem over a serial line using `0xE0`-framed commands.
//! This library reassembles those frames byte by byte, validates them against
//! the modem's current operating mode, forwards payloads to the D-Star, DMR,
//! System Fusion and calibration engines, and builds every reply frame.

pub mod config;
pub mod error;
pub mod mmdvm;
pub mod modem;
pub mod serial;
