// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![warn(missing_docs)]

//! Parsing of Universal Discovery Protocol datagrams.
//!
//! Every device on the network periodically broadcasts a discovery datagram. The first one seen from a device is parsed
//! in full into a [DiscoveryPacket]; later ones from the same device are heartbeats and only their pacing and telemetry
//! fields are read, see [Heartbeat].
//!
//! All fields are little endian and live at fixed offsets. The tail of a PixelPusher datagram grew over firmware
//! versions, so the optional fields are only present once the datagram is long enough to hold them:
//!
//! | length  | fields                                           |
//! |---------|--------------------------------------------------|
//! | >= 48   | header, strips, pacing, power, ordinals          |
//! | >= 54   | artnet universe, artnet channel, `my_port`       |
//! | >= 62   | strip flags                                      |
//! | >= 66   | pusher flags                                     |
//!
//! # Examples
//!
//! ```
//! # use pixelpusher_core::discovery::{DiscoveryPacket, DeviceType};
//! let mut datagram = [0u8; 48];
//! datagram[..6].copy_from_slice(&[0xd8, 0x80, 0x39, 0x66, 0x4b, 0x12]);
//! datagram[6..10].copy_from_slice(&[192, 168, 1, 20]);
//! datagram[10] = 2; // PixelPusher
//! datagram[24] = 8; // strips attached
//!
//! let packet = DiscoveryPacket::parse(&datagram).unwrap();
//! assert_eq!(packet.header.device_type, DeviceType::PixelPusher);
//! assert_eq!(packet.header.mac_address.to_string(), "d8:80:39:66:4b:12");
//! assert_eq!(packet.pixel_pusher().unwrap().number_strips, 8);
//! assert_eq!(packet.pixel_pusher().unwrap().my_port, 9761);
//! ```

extern crate alloc;
use alloc::vec::Vec;

use core::net::Ipv4Addr;
use core::time::Duration;

/// The byteorder crate is used for marshalling the little endian fields on/off the network.
use byteorder::{ByteOrder, LittleEndian};

use crate::{
    device_id::DeviceId,
    parse_error::ParseError,
    pp_definitions::{
        ARTNET_CHANNEL_INDEX, ARTNET_UNIVERSE_INDEX, CONTROLLER_ORDINAL_INDEX, DEFAULT_PIXEL_PORT, DELTA_SEQUENCE_INDEX,
        DEVICE_TYPE_INDEX, DISCOVERY_PACKET_MIN_LENGTH, DISCOVERY_PACKET_PORT_LENGTH, DISCOVERY_PACKET_PUSHER_FLAGS_LENGTH,
        DISCOVERY_PACKET_STRIP_FLAGS_LENGTH, GROUP_ORDINAL_INDEX, HW_REVISION_INDEX, IP_ADDRESS_INDEX, LINK_SPEED_INDEX,
        MAC_ADDRESS_INDEX, MAX_STRIP_FLAGS, MAX_STRIPS_PER_PACKET_INDEX, MY_PORT_INDEX, OVERLARGE_PERIOD_CORRECTION,
        PARTICULARS_INDEX, PFLAG_PROTECTED, PIXELS_PER_STRIP_INDEX, POWER_TOTAL_INDEX, PRODUCT_ID_INDEX,
        PROTOCOL_VERSION_INDEX, PUSHER_FLAGS_INDEX, SFLAG_RGBOW, SFLAG_WIDEPIXELS, STALE_DELTA_THRESHOLD,
        STALE_PERIOD_COMPENSATION, STRIP_FLAGS_INDEX, STRIPS_ATTACHED_INDEX, SW_REVISION_INDEX, UPDATE_PERIOD_INDEX,
        VENDOR_ID_INDEX,
    },
};

/// The kind of device announcing itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Etherdream laser DAC.
    EtherDream,
    /// Lumia bridge.
    LumiaBridge,
    /// PixelPusher LED strip controller.
    PixelPusher,
    /// Any other value.
    Unknown(u8),
}

impl From<u8> for DeviceType {
    fn from(raw: u8) -> Self {
        match raw {
            0 => DeviceType::EtherDream,
            1 => DeviceType::LumiaBridge,
            2 => DeviceType::PixelPusher,
            other => DeviceType::Unknown(other),
        }
    }
}

impl From<DeviceType> for u8 {
    fn from(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::EtherDream => 0,
            DeviceType::LumiaBridge => 1,
            DeviceType::PixelPusher => 2,
            DeviceType::Unknown(raw) => raw,
        }
    }
}

/// The part of a discovery datagram common to all device types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiscoveryHeader {
    /// Hardware address, the unique key of the device.
    pub mac_address: DeviceId,
    /// The address pixel packets are sent to.
    pub ip_address: Ipv4Addr,
    /// What kind of device this is.
    pub device_type: DeviceType,
    /// Protocol version of the device (not of the discovery protocol).
    pub protocol_version: u8,
    /// Vendor id.
    pub vendor_id: u16,
    /// Product id.
    pub product_id: u16,
    /// Hardware revision.
    pub hw_revision: u16,
    /// Software revision.
    pub sw_revision: u16,
    /// Link speed in bits per second.
    pub link_speed: u32,
}

impl DiscoveryHeader {
    /// Length of the header in bytes.
    pub const LENGTH: usize = PARTICULARS_INDEX;

    /// Parse the header from the start of the given buffer.
    pub fn parse(buf: &[u8]) -> Result<DiscoveryHeader, ParseError> {
        ParseError::check_len(buf, Self::LENGTH)?;

        let ip = &buf[IP_ADDRESS_INDEX..DEVICE_TYPE_INDEX];

        Ok(DiscoveryHeader {
            mac_address: DeviceId::from_slice(&buf[MAC_ADDRESS_INDEX..])?,
            ip_address: Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]),
            device_type: buf[DEVICE_TYPE_INDEX].into(),
            protocol_version: buf[PROTOCOL_VERSION_INDEX],
            vendor_id: LittleEndian::read_u16(&buf[VENDOR_ID_INDEX..]),
            product_id: LittleEndian::read_u16(&buf[PRODUCT_ID_INDEX..]),
            hw_revision: LittleEndian::read_u16(&buf[HW_REVISION_INDEX..]),
            sw_revision: LittleEndian::read_u16(&buf[SW_REVISION_INDEX..]),
            link_speed: LittleEndian::read_u32(&buf[LINK_SPEED_INDEX..]),
        })
    }

    /// Packs the header into the start of the given buffer, which must hold at least [Self::LENGTH] bytes.
    fn pack(&self, buf: &mut [u8]) {
        buf[MAC_ADDRESS_INDEX..IP_ADDRESS_INDEX].copy_from_slice(self.mac_address.as_bytes());
        buf[IP_ADDRESS_INDEX..DEVICE_TYPE_INDEX].copy_from_slice(&self.ip_address.octets());
        buf[DEVICE_TYPE_INDEX] = self.device_type.into();
        buf[PROTOCOL_VERSION_INDEX] = self.protocol_version;
        LittleEndian::write_u16(&mut buf[VENDOR_ID_INDEX..], self.vendor_id);
        LittleEndian::write_u16(&mut buf[PRODUCT_ID_INDEX..], self.product_id);
        LittleEndian::write_u16(&mut buf[HW_REVISION_INDEX..], self.hw_revision);
        LittleEndian::write_u16(&mut buf[SW_REVISION_INDEX..], self.sw_revision);
        LittleEndian::write_u32(&mut buf[LINK_SPEED_INDEX..], self.link_speed);
    }
}

/// Configuration and telemetry of a PixelPusher, the particulars of a discovery datagram with device type 2.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelPusherParams {
    /// Number of strips attached to the controller.
    pub number_strips: u8,
    /// Maximum number of strips the controller accepts in a single pixel packet.
    pub strips_per_packet: u8,
    /// Number of pixels on every strip.
    pub pixels_per_strip: u16,
    /// Minimum interval between two pixel packets. Reported on the wire in microseconds.
    pub update_period: Duration,
    /// Power drawn, in PWM units.
    pub power_total: u32,
    /// Difference between received and expected sequence numbers as seen by the controller.
    pub delta_sequence: u32,
    /// Ordering number of this controller.
    pub controller_ordinal: i32,
    /// Group number of this controller.
    pub group_ordinal: i32,
    /// Configured artnet starting universe.
    pub artnet_universe: Option<u16>,
    /// Configured artnet starting channel.
    pub artnet_channel: Option<u16>,
    /// The port pixel packets are sent to.
    pub my_port: u16,
    /// Flags for the first (up to eight) strips. Empty when the datagram was too short to carry them.
    pub strip_flags: heapless::Vec<u8, MAX_STRIP_FLAGS>,
    /// Flags for the whole pusher.
    pub pusher_flags: Option<i32>,
}

impl PixelPusherParams {
    /// Parse the PixelPusher particulars out of a whole discovery datagram.
    ///
    /// The optional tail fields are only read when the datagram is long enough to carry them, `my_port` falls back to
    /// [DEFAULT_PIXEL_PORT] when it is not.
    pub fn parse(buf: &[u8]) -> Result<PixelPusherParams, ParseError> {
        ParseError::check_len(buf, DISCOVERY_PACKET_MIN_LENGTH)?;

        let mut params = PixelPusherParams {
            number_strips: buf[STRIPS_ATTACHED_INDEX],
            strips_per_packet: buf[MAX_STRIPS_PER_PACKET_INDEX],
            pixels_per_strip: LittleEndian::read_u16(&buf[PIXELS_PER_STRIP_INDEX..]),
            update_period: Duration::from_micros(LittleEndian::read_u32(&buf[UPDATE_PERIOD_INDEX..]).into()),
            power_total: LittleEndian::read_u32(&buf[POWER_TOTAL_INDEX..]),
            delta_sequence: LittleEndian::read_u32(&buf[DELTA_SEQUENCE_INDEX..]),
            controller_ordinal: LittleEndian::read_i32(&buf[CONTROLLER_ORDINAL_INDEX..]),
            group_ordinal: LittleEndian::read_i32(&buf[GROUP_ORDINAL_INDEX..]),
            artnet_universe: None,
            artnet_channel: None,
            my_port: DEFAULT_PIXEL_PORT,
            strip_flags: heapless::Vec::new(),
            pusher_flags: None,
        };

        if buf.len() >= DISCOVERY_PACKET_PORT_LENGTH {
            params.artnet_universe = Some(LittleEndian::read_u16(&buf[ARTNET_UNIVERSE_INDEX..]));
            params.artnet_channel = Some(LittleEndian::read_u16(&buf[ARTNET_CHANNEL_INDEX..]));
            params.my_port = LittleEndian::read_u16(&buf[MY_PORT_INDEX..]);
        }

        if buf.len() >= DISCOVERY_PACKET_STRIP_FLAGS_LENGTH {
            // Capacity and slice length are both MAX_STRIP_FLAGS.
            let _ = params
                .strip_flags
                .extend_from_slice(&buf[STRIP_FLAGS_INDEX..STRIP_FLAGS_INDEX + MAX_STRIP_FLAGS]);
        }

        if buf.len() >= DISCOVERY_PACKET_PUSHER_FLAGS_LENGTH {
            params.pusher_flags = Some(LittleEndian::read_i32(&buf[PUSHER_FLAGS_INDEX..]));
        }

        Ok(params)
    }

    /// Applies the pacing and telemetry fields of a heartbeat.
    ///
    /// Returns the adjusted cycle time, which also becomes the new [Self::update_period].
    pub fn apply_heartbeat(&mut self, heartbeat: &Heartbeat) -> Duration {
        let cycle_time = heartbeat.cycle_time();
        self.update_period = cycle_time;
        self.power_total = heartbeat.power_total;
        self.delta_sequence = heartbeat.delta_sequence;
        cycle_time
    }

    /// Number of bytes of pixel data making up one strip.
    pub fn strip_data_len(&self) -> usize {
        usize::from(self.pixels_per_strip) * crate::pp_definitions::BYTES_PER_PIXEL
    }

    /// The raw flags of the given strip, if the device reported them.
    pub fn strip_flags(&self, strip: usize) -> Option<u8> {
        self.strip_flags.get(strip).copied()
    }

    /// Whether the given strip is made of RGBOW pixels.
    pub fn is_rgbow(&self, strip: usize) -> bool {
        self.strip_flags(strip).is_some_and(|f| f & SFLAG_RGBOW != 0)
    }

    /// Whether the given strip uses 16 bit per colour pixels.
    pub fn has_wide_pixels(&self, strip: usize) -> bool {
        self.strip_flags(strip).is_some_and(|f| f & SFLAG_WIDEPIXELS != 0)
    }

    /// Whether the pusher reported itself as protected.
    pub fn is_protected(&self) -> bool {
        self.pusher_flags.is_some_and(|f| f & PFLAG_PROTECTED != 0)
    }

    /// The datagram length needed to carry every optional field that is set.
    fn packed_len(&self) -> usize {
        if self.pusher_flags.is_some() {
            DISCOVERY_PACKET_PUSHER_FLAGS_LENGTH
        } else if !self.strip_flags.is_empty() {
            DISCOVERY_PACKET_STRIP_FLAGS_LENGTH
        } else if self.artnet_universe.is_some() || self.artnet_channel.is_some() || self.my_port != DEFAULT_PIXEL_PORT {
            DISCOVERY_PACKET_PORT_LENGTH
        } else {
            DISCOVERY_PACKET_MIN_LENGTH
        }
    }

    fn pack(&self, buf: &mut [u8]) {
        buf[STRIPS_ATTACHED_INDEX] = self.number_strips;
        buf[MAX_STRIPS_PER_PACKET_INDEX] = self.strips_per_packet;
        LittleEndian::write_u16(&mut buf[PIXELS_PER_STRIP_INDEX..], self.pixels_per_strip);
        LittleEndian::write_u32(
            &mut buf[UPDATE_PERIOD_INDEX..],
            u32::try_from(self.update_period.as_micros()).unwrap_or(u32::MAX),
        );
        LittleEndian::write_u32(&mut buf[POWER_TOTAL_INDEX..], self.power_total);
        LittleEndian::write_u32(&mut buf[DELTA_SEQUENCE_INDEX..], self.delta_sequence);
        LittleEndian::write_i32(&mut buf[CONTROLLER_ORDINAL_INDEX..], self.controller_ordinal);
        LittleEndian::write_i32(&mut buf[GROUP_ORDINAL_INDEX..], self.group_ordinal);

        if buf.len() >= DISCOVERY_PACKET_PORT_LENGTH {
            LittleEndian::write_u16(&mut buf[ARTNET_UNIVERSE_INDEX..], self.artnet_universe.unwrap_or_default());
            LittleEndian::write_u16(&mut buf[ARTNET_CHANNEL_INDEX..], self.artnet_channel.unwrap_or_default());
            LittleEndian::write_u16(&mut buf[MY_PORT_INDEX..], self.my_port);
        }

        if buf.len() >= DISCOVERY_PACKET_STRIP_FLAGS_LENGTH {
            buf[STRIP_FLAGS_INDEX..STRIP_FLAGS_INDEX + self.strip_flags.len()].copy_from_slice(&self.strip_flags);
        }

        if buf.len() >= DISCOVERY_PACKET_PUSHER_FLAGS_LENGTH {
            LittleEndian::write_i32(&mut buf[PUSHER_FLAGS_INDEX..], self.pusher_flags.unwrap_or_default());
        }
    }
}

/// The device specific part of a discovery datagram.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Particulars {
    /// Fully parsed PixelPusher parameters.
    PixelPusher(PixelPusherParams),

    /// Everything from offset 24 on, kept as is for any other device type.
    Other(Vec<u8>),
}

/// A fully parsed discovery datagram.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiscoveryPacket {
    /// The common header.
    pub header: DiscoveryHeader,
    /// The device specific part.
    pub particulars: Particulars,
}

impl DiscoveryPacket {
    /// Parse a discovery datagram.
    ///
    /// # Errors
    /// InsufficientData: Returned if the datagram is shorter than [DISCOVERY_PACKET_MIN_LENGTH].
    pub fn parse(buf: &[u8]) -> Result<DiscoveryPacket, ParseError> {
        ParseError::check_len(buf, DISCOVERY_PACKET_MIN_LENGTH)?;

        let header = DiscoveryHeader::parse(buf)?;
        let particulars = match header.device_type {
            DeviceType::PixelPusher => Particulars::PixelPusher(PixelPusherParams::parse(buf)?),
            _ => Particulars::Other(buf[PARTICULARS_INDEX..].to_vec()),
        };

        Ok(DiscoveryPacket { header, particulars })
    }

    /// The PixelPusher parameters, if this is a PixelPusher.
    pub fn pixel_pusher(&self) -> Option<&PixelPusherParams> {
        match self.particulars {
            Particulars::PixelPusher(ref params) => Some(params),
            Particulars::Other(_) => None,
        }
    }

    /// Mutable access to the PixelPusher parameters, if this is a PixelPusher.
    pub fn pixel_pusher_mut(&mut self) -> Option<&mut PixelPusherParams> {
        match self.particulars {
            Particulars::PixelPusher(ref mut params) => Some(params),
            Particulars::Other(_) => None,
        }
    }

    /// The opaque payload of a non PixelPusher device.
    pub fn payload(&self) -> Option<&[u8]> {
        match self.particulars {
            Particulars::PixelPusher(_) => None,
            Particulars::Other(ref payload) => Some(payload),
        }
    }

    /// Packs the packet into heap allocated memory, using the shortest layout that carries every field that is set.
    pub fn pack_alloc(&self) -> Vec<u8> {
        let mut buf = alloc::vec![0; self.len()];
        self.header.pack(&mut buf);
        match self.particulars {
            Particulars::PixelPusher(ref params) => params.pack(&mut buf),
            Particulars::Other(ref payload) => buf[PARTICULARS_INDEX..PARTICULARS_INDEX + payload.len()].copy_from_slice(payload),
        }
        buf
    }

    /// The length of the packet when packed.
    pub fn len(&self) -> usize {
        match self.particulars {
            Particulars::PixelPusher(ref params) => params.packed_len(),
            Particulars::Other(ref payload) => DiscoveryHeader::LENGTH + payload.len(),
        }
    }

    /// Always false, a packet holds at least its header.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The fields of a discovery datagram that matter once a device is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Heartbeat {
    /// The update period exactly as reported.
    pub reported_period: Duration,
    /// Power drawn, in PWM units.
    pub power_total: u32,
    /// Difference between received and expected sequence numbers as seen by the controller.
    pub delta_sequence: u32,
}

impl Heartbeat {
    /// Parse the pacing and telemetry fields of a discovery datagram.
    pub fn parse(buf: &[u8]) -> Result<Heartbeat, ParseError> {
        ParseError::check_len(buf, DISCOVERY_PACKET_MIN_LENGTH)?;

        Ok(Heartbeat {
            reported_period: Duration::from_micros(LittleEndian::read_u32(&buf[UPDATE_PERIOD_INDEX..]).into()),
            power_total: LittleEndian::read_u32(&buf[POWER_TOTAL_INDEX..]),
            delta_sequence: LittleEndian::read_u32(&buf[DELTA_SEQUENCE_INDEX..]),
        })
    }

    /// True if the controller reports a long gap in the sequence numbers it received.
    ///
    /// The sender should then trim its backlog of queued packets.
    pub fn is_stale(&self) -> bool {
        self.delta_sequence > STALE_DELTA_THRESHOLD
    }

    /// The pacing interval to use after this heartbeat.
    ///
    /// A long sequence gap slows pacing down by [STALE_PERIOD_COMPENSATION]. A zero delta with a period above
    /// [OVERLARGE_PERIOD_CORRECTION] is taken to be slightly overlarge and shortened by that amount.
    pub fn cycle_time(&self) -> Duration {
        if self.is_stale() {
            self.reported_period.saturating_add(STALE_PERIOD_COMPENSATION)
        } else if self.delta_sequence == 0 && self.reported_period > OVERLARGE_PERIOD_CORRECTION {
            self.reported_period - OVERLARGE_PERIOD_CORRECTION
        } else {
            self.reported_period
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pp_definitions::DEFAULT_PIXEL_PORT;

    const MAC: [u8; 6] = [0xd8, 0x80, 0x39, 0x66, 0x4b, 0x12];

    fn pusher_datagram(len: usize) -> Vec<u8> {
        let mut buf = alloc::vec![0u8; len];
        buf[0..6].copy_from_slice(&MAC);
        buf[6..10].copy_from_slice(&[192, 168, 1, 20]);
        buf[10] = 2;
        buf[11] = 1;
        LittleEndian::write_u16(&mut buf[12..], 2);
        LittleEndian::write_u16(&mut buf[14..], 1);
        LittleEndian::write_u16(&mut buf[16..], 3);
        LittleEndian::write_u16(&mut buf[18..], 131);
        LittleEndian::write_u32(&mut buf[20..], 100_000_000);
        buf[24] = 8;
        buf[25] = 2;
        LittleEndian::write_u16(&mut buf[26..], 240);
        LittleEndian::write_u32(&mut buf[28..], 16_000);
        LittleEndian::write_u32(&mut buf[32..], 42);
        LittleEndian::write_u32(&mut buf[36..], 3);
        LittleEndian::write_i32(&mut buf[40..], -1);
        LittleEndian::write_i32(&mut buf[44..], 7);
        if len >= 54 {
            LittleEndian::write_u16(&mut buf[48..], 12);
            LittleEndian::write_u16(&mut buf[50..], 34);
            LittleEndian::write_u16(&mut buf[52..], 5078);
        }
        if len >= 62 {
            buf[54..62].copy_from_slice(&[1, 2, 3, 0, 0, 0, 0, 0]);
        }
        if len >= 66 {
            LittleEndian::write_i32(&mut buf[62..], 1);
        }
        buf
    }

    #[test]
    fn test_parse_rejects_short_datagram() {
        let mut buf = pusher_datagram(48);
        buf.truncate(40);
        match DiscoveryPacket::parse(&buf) {
            Err(ParseError::InsufficientData { actual: 40, required: 48 }) => {}
            other => panic!("unexpected result {other:?}"),
        }
        assert!(Heartbeat::parse(&buf).is_err());
    }

    #[test]
    fn test_parse_header() {
        let packet = DiscoveryPacket::parse(&pusher_datagram(48)).unwrap();
        let header = &packet.header;
        assert_eq!(header.mac_address, DeviceId::new(MAC));
        assert_eq!(header.ip_address, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(header.device_type, DeviceType::PixelPusher);
        assert_eq!(header.protocol_version, 1);
        assert_eq!(header.vendor_id, 2);
        assert_eq!(header.product_id, 1);
        assert_eq!(header.hw_revision, 3);
        assert_eq!(header.sw_revision, 131);
        assert_eq!(header.link_speed, 100_000_000);
    }

    #[test]
    fn test_parse_minimal_pixel_pusher() {
        let packet = DiscoveryPacket::parse(&pusher_datagram(48)).unwrap();
        let params = packet.pixel_pusher().unwrap();
        assert_eq!(params.number_strips, 8);
        assert_eq!(params.strips_per_packet, 2);
        assert_eq!(params.pixels_per_strip, 240);
        assert_eq!(params.update_period, Duration::from_millis(16));
        assert_eq!(params.power_total, 42);
        assert_eq!(params.delta_sequence, 3);
        assert_eq!(params.controller_ordinal, -1);
        assert_eq!(params.group_ordinal, 7);
        assert_eq!(params.artnet_universe, None);
        assert_eq!(params.artnet_channel, None);
        assert_eq!(params.my_port, DEFAULT_PIXEL_PORT);
        assert!(params.strip_flags.is_empty());
        assert_eq!(params.pusher_flags, None);
        assert_eq!(params.strip_data_len(), 720);
    }

    #[test]
    fn test_optional_fields_follow_length_thresholds() {
        let params = PixelPusherParams::parse(&pusher_datagram(53)).unwrap();
        assert_eq!(params.my_port, DEFAULT_PIXEL_PORT);
        assert_eq!(params.artnet_universe, None);

        let params = PixelPusherParams::parse(&pusher_datagram(54)).unwrap();
        assert_eq!(params.artnet_universe, Some(12));
        assert_eq!(params.artnet_channel, Some(34));
        assert_eq!(params.my_port, 5078);
        assert!(params.strip_flags.is_empty());

        let params = PixelPusherParams::parse(&pusher_datagram(62)).unwrap();
        assert_eq!(&params.strip_flags[..], &[1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(params.pusher_flags, None);
    }

    #[test]
    fn test_full_datagram_populates_every_field() {
        let packet = DiscoveryPacket::parse(&pusher_datagram(66)).unwrap();
        let params = packet.pixel_pusher().unwrap();
        assert_eq!(params.artnet_universe, Some(12));
        assert_eq!(params.artnet_channel, Some(34));
        assert_eq!(params.my_port, 5078);
        assert_eq!(params.strip_flags.len(), MAX_STRIP_FLAGS);
        assert_eq!(params.pusher_flags, Some(1));

        assert!(params.is_rgbow(0));
        assert!(!params.has_wide_pixels(0));
        assert!(params.has_wide_pixels(1));
        assert!(params.is_rgbow(2) && params.has_wide_pixels(2));
        assert!(!params.is_rgbow(9));
        assert!(params.is_protected());
    }

    #[test]
    fn test_other_device_keeps_payload() {
        let mut buf = pusher_datagram(50);
        buf[10] = 0;
        let packet = DiscoveryPacket::parse(&buf).unwrap();
        assert_eq!(packet.header.device_type, DeviceType::EtherDream);
        assert!(packet.pixel_pusher().is_none());
        assert_eq!(packet.payload().unwrap(), &buf[24..]);

        buf[10] = 9;
        let packet = DiscoveryPacket::parse(&buf).unwrap();
        assert_eq!(packet.header.device_type, DeviceType::Unknown(9));
        assert_eq!(packet.len(), 50);
    }

    #[test]
    fn test_pack_uses_shortest_layout() {
        for len in [48, 54, 62, 66] {
            let buf = pusher_datagram(len);
            let packet = DiscoveryPacket::parse(&buf).unwrap();
            assert_eq!(packet.len(), len);
            assert_eq!(packet.pack_alloc(), buf);
        }
    }

    #[test]
    fn test_heartbeat_cycle_time_adjustments() {
        let heartbeat = |period_micros: u64, delta_sequence: u32| Heartbeat {
            reported_period: Duration::from_micros(period_micros),
            power_total: 0,
            delta_sequence,
        };

        // Long gap: compensate and ask for a trim.
        let hb = heartbeat(16_000, 6);
        assert!(hb.is_stale());
        assert_eq!(hb.cycle_time(), Duration::from_millis(21));

        // Exactly at the threshold nothing happens.
        let hb = heartbeat(16_000, 5);
        assert!(!hb.is_stale());
        assert_eq!(hb.cycle_time(), Duration::from_millis(16));

        // No gap and an overlarge reading.
        assert_eq!(heartbeat(16_000, 0).cycle_time(), Duration::from_millis(15));
        assert_eq!(heartbeat(1_000, 0).cycle_time(), Duration::from_millis(1));
        assert_eq!(heartbeat(500, 0).cycle_time(), Duration::from_micros(500));
    }

    #[test]
    fn test_apply_heartbeat() {
        let mut params = PixelPusherParams::parse(&pusher_datagram(48)).unwrap();
        let mut buf = pusher_datagram(48);
        LittleEndian::write_u32(&mut buf[28..], 30_000);
        LittleEndian::write_u32(&mut buf[32..], 99);
        LittleEndian::write_u32(&mut buf[36..], 8);

        let hb = Heartbeat::parse(&buf).unwrap();
        assert_eq!(hb.reported_period, Duration::from_millis(30));
        let cycle_time = params.apply_heartbeat(&hb);
        assert_eq!(cycle_time, Duration::from_millis(35));
        assert_eq!(params.update_period, Duration::from_millis(35));
        assert_eq!(params.power_total, 99);
        assert_eq!(params.delta_sequence, 8);
    }
}
