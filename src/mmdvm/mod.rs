//! # MMDVM Protocol Module
//!
//! Wire format of the MMDVM host link.
//!
//! This module handles:
//! - Command, mode and error-code definitions
//! - Byte-at-a-time frame reassembly with length validation
//! - Encoding of every modem-to-host frame type
//! - Host-side decoding of replies

pub mod protocol;
pub mod frame;
pub mod encoder;
pub mod decoder;
