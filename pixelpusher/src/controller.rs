// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The state kept for every discovered device.

use std::{collections::VecDeque, net::SocketAddrV4, time::Duration};

use log::debug;

use crate::{
    PusherResult,
    device_id::DeviceId,
    discovery::{DeviceType, DiscoveryHeader, DiscoveryPacket, Heartbeat, PixelPusherParams},
    error::Error,
    packet::{Packetizer, PacketizerOptions, StripUpdate},
    parse_error::ParseError,
    pp_definitions::STALE_BACKLOG_KEEP,
    scheduler::TimerId,
    time::Timestamp,
};

/// A discovered device.
///
/// Holds what the device announced about itself, its pacing state and the packets waiting to be sent to it.
#[derive(Debug, Clone)]
pub struct Controller {
    discovery: DiscoveryPacket,
    last_updated: Timestamp,
    next_update: Timestamp,
    pending: VecDeque<Vec<u8>>,
    packetizer: Packetizer,
    pub(crate) armed: Option<TimerId>,
}

impl Controller {
    pub(crate) fn new(discovery: DiscoveryPacket, now: Timestamp, options: PacketizerOptions) -> Self {
        let period = discovery.pixel_pusher().map_or(Duration::ZERO, |p| p.update_period);
        Self {
            discovery,
            last_updated: now,
            next_update: now + period,
            pending: VecDeque::new(),
            packetizer: Packetizer::new(options),
            armed: None,
        }
    }

    /// The device identifier.
    pub fn id(&self) -> DeviceId {
        self.discovery.header.mac_address
    }

    /// The common discovery header as first announced.
    pub fn header(&self) -> &DiscoveryHeader {
        &self.discovery.header
    }

    /// The device type.
    pub fn device_type(&self) -> DeviceType {
        self.discovery.header.device_type
    }

    /// The full discovery state, with pacing and telemetry kept up to date by heartbeats.
    pub fn discovery(&self) -> &DiscoveryPacket {
        &self.discovery
    }

    /// The PixelPusher parameters, `None` for other devices.
    pub fn params(&self) -> Option<&PixelPusherParams> {
        self.discovery.pixel_pusher()
    }

    /// Whether this device accepts pixel data.
    pub fn is_pixel_pusher(&self) -> bool {
        self.params().is_some()
    }

    /// Where pixel packets are sent, `None` for other devices.
    pub fn destination(&self) -> Option<SocketAddrV4> {
        self.params()
            .map(|p| SocketAddrV4::new(self.discovery.header.ip_address, p.my_port))
    }

    /// The current pacing interval.
    pub fn update_period(&self) -> Duration {
        self.params().map_or(Duration::ZERO, |p| p.update_period)
    }

    /// When the device was last heard from.
    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// The earliest time the next packet may be sent.
    pub fn next_update(&self) -> Timestamp {
        self.next_update
    }

    /// The sequence number the next packet will carry.
    pub fn sequence_number(&self) -> u32 {
        self.packetizer.sequence_number()
    }

    /// The strips sent with the last frame that changed anything.
    pub fn last_sent(&self) -> &[StripUpdate] {
        self.packetizer.last_sent()
    }

    /// Packets waiting to be sent, oldest first.
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &[u8]> {
        self.pending.iter().map(Vec::as_slice)
    }

    /// Number of packets waiting to be sent.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a scheduler wake is outstanding.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub(crate) fn pop_pending(&mut self) -> Option<Vec<u8>> {
        self.pending.pop_front()
    }

    pub(crate) fn set_next_update(&mut self, next_update: Timestamp) {
        self.next_update = next_update;
    }

    /// Apply a heartbeat received at `now`.
    ///
    /// Returns true if the heartbeat reported a long sequence gap, the backlog has been trimmed already in that case.
    ///
    /// # Errors
    /// MissingPixelPusherParams: Returned for any other device, nothing is changed.
    pub(crate) fn apply_heartbeat(&mut self, heartbeat: &Heartbeat, now: Timestamp) -> Result<bool, ParseError> {
        let device_type = self.device_type();
        let params = self
            .discovery
            .pixel_pusher_mut()
            .ok_or_else(|| ParseError::MissingPixelPusherParams(device_type.into()))?;

        let cycle_time = params.apply_heartbeat(heartbeat);
        let stale = heartbeat.is_stale();
        if stale {
            self.trim_backlog();
        }

        self.last_updated = now;
        self.next_update = now + cycle_time;
        Ok(stale)
    }

    /// Drop everything but the oldest [STALE_BACKLOG_KEEP] queued packets.
    pub(crate) fn trim_backlog(&mut self) {
        if self.pending.len() >= STALE_BACKLOG_KEEP {
            debug!(
                "Trimming backlog of {} from {} to {} packets",
                self.id(),
                self.pending.len(),
                STALE_BACKLOG_KEEP
            );
            self.pending.truncate(STALE_BACKLOG_KEEP);
        }
    }

    /// Packetize a frame and queue the packets, returns how many were queued.
    ///
    /// # Errors
    /// NotPixelPusher: Returned if the device does not take pixel data.
    ///
    /// Frame: Returned if a strip index is out of range, nothing is queued in that case.
    pub(crate) fn enqueue_frame(&mut self, frame: &[StripUpdate]) -> PusherResult<usize> {
        let params = self.discovery.pixel_pusher().ok_or(Error::NotPixelPusher(self.id()))?;
        let packets = self.packetizer.packetize(frame, params)?;
        let count = packets.len();
        self.pending.extend(packets);
        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{packet::FrameError, testing};

    #[test]
    fn test_new_controller_waits_one_period() {
        let controller = Controller::new(testing::pusher(1, 100), Timestamp::from_millis(20), PacketizerOptions::default());
        assert_eq!(controller.id(), testing::mac(1));
        assert_eq!(controller.last_updated(), Timestamp::from_millis(20));
        assert_eq!(controller.next_update(), Timestamp::from_millis(120));
        assert_eq!(controller.sequence_number(), 1);
        assert!(!controller.is_armed());
        assert_eq!(controller.destination(), Some("10.0.0.1:9761".parse().unwrap()));
    }

    #[test]
    fn test_other_device_has_no_pacing() {
        let controller = Controller::new(testing::ether_dream(2), Timestamp::from_millis(20), PacketizerOptions::default());
        assert!(!controller.is_pixel_pusher());
        assert_eq!(controller.next_update(), Timestamp::from_millis(20));
        assert_eq!(controller.destination(), None);
    }

    #[test]
    fn test_enqueue_frame_queues_packets() {
        let mut controller = Controller::new(testing::pusher(1, 100), Timestamp::ORIGIN, PacketizerOptions::default());
        let frame = testing::frame(&[0, 1, 2], 7);
        // Two strips per packet.
        assert_eq!(controller.enqueue_frame(&frame).unwrap(), 2);
        assert_eq!(controller.pending_len(), 2);
        assert_eq!(controller.sequence_number(), 3);

        // Unchanged frame.
        assert_eq!(controller.enqueue_frame(&frame).unwrap(), 0);
        assert_eq!(controller.pending_len(), 2);
    }

    #[test]
    fn test_enqueue_out_of_range_changes_nothing() {
        let mut controller = Controller::new(testing::pusher(1, 100), Timestamp::ORIGIN, PacketizerOptions::default());
        controller.enqueue_frame(&testing::frame(&[0], 1)).unwrap();

        match controller.enqueue_frame(&testing::frame(&[1, 4], 2)) {
            Err(Error::Frame(FrameError::StripOutOfRange { index: 4, strip_count: 4 })) => {}
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(controller.pending_len(), 1);
        assert_eq!(controller.sequence_number(), 2);
        assert_eq!(controller.last_sent(), testing::frame(&[0], 1).as_slice());
    }

    #[test]
    fn test_enqueue_to_other_device_fails() {
        let mut controller = Controller::new(testing::ether_dream(2), Timestamp::ORIGIN, PacketizerOptions::default());
        match controller.enqueue_frame(&testing::frame(&[0], 1)) {
            Err(Error::NotPixelPusher(id)) => assert_eq!(id, testing::mac(2)),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_heartbeat_updates_pacing() {
        let mut controller = Controller::new(testing::pusher(1, 100), Timestamp::ORIGIN, PacketizerOptions::default());
        let heartbeat = Heartbeat {
            reported_period: Duration::from_millis(50),
            power_total: 9,
            delta_sequence: 0,
        };
        let stale = controller.apply_heartbeat(&heartbeat, Timestamp::from_millis(1000)).unwrap();
        assert!(!stale);
        assert_eq!(controller.update_period(), Duration::from_millis(49));
        assert_eq!(controller.params().unwrap().power_total, 9);
        assert_eq!(controller.last_updated(), Timestamp::from_millis(1000));
        assert_eq!(controller.next_update(), Timestamp::from_millis(1049));
    }

    #[test]
    fn test_stale_heartbeat_trims_to_oldest_two() {
        let mut controller = Controller::new(testing::pusher(1, 100), Timestamp::ORIGIN, PacketizerOptions::default());
        for value in 0..5 {
            controller.enqueue_frame(&testing::frame(&[0], value)).unwrap();
        }
        let expected: Vec<Vec<u8>> = controller.pending().take(2).map(<[u8]>::to_vec).collect();

        let heartbeat = Heartbeat {
            reported_period: Duration::from_millis(100),
            power_total: 0,
            delta_sequence: 6,
        };
        assert!(controller.apply_heartbeat(&heartbeat, Timestamp::from_millis(10)).unwrap());
        assert_eq!(controller.update_period(), Duration::from_millis(105));
        let left: Vec<Vec<u8>> = controller.pending().map(<[u8]>::to_vec).collect();
        assert_eq!(left, expected);
    }

    #[test]
    fn test_trim_leaves_short_backlog_alone() {
        let mut controller = Controller::new(testing::pusher(1, 100), Timestamp::ORIGIN, PacketizerOptions::default());
        controller.enqueue_frame(&testing::frame(&[0], 1)).unwrap();
        controller.trim_backlog();
        assert_eq!(controller.pending_len(), 1);
    }

    #[test]
    fn test_heartbeat_for_other_device_is_rejected() {
        let mut controller = Controller::new(testing::ether_dream(2), Timestamp::ORIGIN, PacketizerOptions::default());
        let heartbeat = Heartbeat {
            reported_period: Duration::from_millis(100),
            power_total: 0,
            delta_sequence: 0,
        };
        assert!(matches!(
            controller.apply_heartbeat(&heartbeat, Timestamp::from_millis(10)),
            Err(ParseError::MissingPixelPusherParams(0))
        ));
        assert_eq!(controller.last_updated(), Timestamp::ORIGIN);
    }
}
