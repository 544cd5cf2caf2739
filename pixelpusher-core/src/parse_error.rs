//! The errors related to parsing datagrams received from PixelPusher devices.

// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::device_id::DeviceIdError;

/// The errors encountered when parsing discovery, heartbeat and pixel packets.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Supplied buffer does not contain enough data.
    ///
    /// # Arguments
    /// actual: The length of the buffer.
    /// required: The length needed to parse it.
    #[error("Datagram too short ({actual} octets), need at least {required}")]
    InsufficientData {
        /// length of the buffer
        actual: usize,
        /// length needed
        required: usize,
    },

    /// A heartbeat was parsed from a device that does not carry PixelPusher particulars.
    ///
    /// # Arguments
    /// 0: The raw device type of the datagram
    #[error("Device type {0} does not carry PixelPusher parameters")]
    MissingPixelPusherParams(u8),

    /// A pixel packet segment did not hold a whole strip of pixel data.
    ///
    /// # Arguments
    /// offset: Where the truncated segment starts.
    #[error("Truncated strip segment at offset {offset}")]
    TruncatedSegment {
        /// offset of the segment within the packet
        offset: usize,
    },

    /// The device id could not be read.
    #[error("Invalid device id: {0}")]
    DeviceId(#[from] DeviceIdError),
}

impl ParseError {
    pub(crate) fn check_len(buf: &[u8], required: usize) -> Result<(), ParseError> {
        if buf.len() < required {
            return Err(ParseError::InsufficientData {
                actual: buf.len(),
                required,
            });
        }
        Ok(())
    }
}
