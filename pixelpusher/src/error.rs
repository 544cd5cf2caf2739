#![warn(missing_docs)]
//! The errors used within the pixelpusher crate.

// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::net::SocketAddr;

use crate::{device_id::DeviceId, packet::FrameError, parse_error::ParseError};

/// Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to open or bind the discovery listener socket.
    ///
    /// # Arguments
    /// addr: The address the socket was to be bound to.
    #[error("Failed to bind discovery socket to {addr}")]
    Bind {
        /// the listen address
        addr: SocketAddr,
        /// the underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to receive on the discovery listener socket.
    #[error("Failed to receive on discovery socket")]
    Receive(#[source] std::io::Error),

    /// A datagram could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A frame was rejected by the packetizer, e.g. because a strip index was out of range.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No controller with this identifier is currently known. It might never have been discovered or it timed out.
    ///
    /// # Arguments
    /// The identifier that was looked up.
    #[error("No controller with id {0} is known")]
    ControllerNotFound(DeviceId),

    /// Pixel data was submitted to a device that is not a PixelPusher.
    ///
    /// # Arguments
    /// The identifier of the device.
    #[error("Device {0} is not a PixelPusher")]
    NotPixelPusher(DeviceId),
}
