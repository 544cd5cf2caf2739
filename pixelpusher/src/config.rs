// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Service configuration.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::{
    packet::{DedupMode, PacketizerOptions, StripIndexEncoding},
    pp_definitions::{CONTROLLER_TIMEOUT_THRESHOLD, DISCOVERY_LISTENER_PORT, TIMEOUT_CHECK_INTERVAL},
};

/// Configuration of a [crate::service::PixelPusherService].
///
/// # Examples
///
/// ```
/// use pixelpusher::config::PusherConfig;
/// use pixelpusher::packet::DedupMode;
/// use std::time::Duration;
///
/// let config = PusherConfig::default()
///     .with_controller_timeout(Duration::from_secs(10))
///     .with_dedup_mode(DedupMode::ByStripIndex);
///
/// assert_eq!(config.listen_addr.port(), 7331);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PusherConfig {
    /// Where discovery datagrams are received, defaults to `0.0.0.0:7331`.
    pub listen_addr: SocketAddr,
    /// How long a controller may stay silent before it is evicted.
    pub controller_timeout: Duration,
    /// How often silent controllers are looked for.
    pub timeout_check_interval: Duration,
    /// Options handed to every controller's packetizer.
    pub packetizer: PacketizerOptions,
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DISCOVERY_LISTENER_PORT),
            controller_timeout: CONTROLLER_TIMEOUT_THRESHOLD,
            timeout_check_interval: TIMEOUT_CHECK_INTERVAL,
            packetizer: PacketizerOptions::default(),
        }
    }
}

impl PusherConfig {
    /// Listen on a different address.
    pub fn with_listen_addr(mut self, listen_addr: SocketAddr) -> Self {
        self.listen_addr = listen_addr;
        self
    }

    /// Change the liveness timeout.
    pub fn with_controller_timeout(mut self, timeout: Duration) -> Self {
        self.controller_timeout = timeout;
        self
    }

    /// Change how often the liveness sweep runs.
    pub fn with_timeout_check_interval(mut self, interval: Duration) -> Self {
        self.timeout_check_interval = interval;
        self
    }

    /// Change how unchanged strips are detected.
    pub fn with_dedup_mode(mut self, dedup: DedupMode) -> Self {
        self.packetizer.dedup = dedup;
        self
    }

    /// Change what goes into the strip number byte.
    pub fn with_strip_index_encoding(mut self, index_encoding: StripIndexEncoding) -> Self {
        self.packetizer.index_encoding = index_encoding;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PusherConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:7331".parse().unwrap());
        assert_eq!(config.controller_timeout, Duration::from_millis(5000));
        assert_eq!(config.timeout_check_interval, Duration::from_millis(1000));
        assert_eq!(config.packetizer.dedup, DedupMode::Positional);
        assert_eq!(config.packetizer.index_encoding, StripIndexEncoding::FillOrder);
    }

    #[test]
    fn test_setters() {
        let config = PusherConfig::default()
            .with_listen_addr("127.0.0.1:0".parse().unwrap())
            .with_timeout_check_interval(Duration::from_millis(50))
            .with_strip_index_encoding(StripIndexEncoding::Declared);
        assert_eq!(config.listen_addr.port(), 0);
        assert_eq!(config.timeout_check_interval, Duration::from_millis(50));
        assert_eq!(config.packetizer.index_encoding, StripIndexEncoding::Declared);
    }
}
