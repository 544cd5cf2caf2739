// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Fixtures shared by the unit tests.

use std::{
    collections::VecDeque,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use crate::{
    device_id::DeviceId,
    discovery::{DeviceType, DiscoveryHeader, DiscoveryPacket, Particulars, PixelPusherParams},
    packet::StripUpdate,
    pp_definitions::{BYTES_PER_PIXEL, DEFAULT_PIXEL_PORT},
    transport::Transport,
};

pub const STRIPS: u8 = 4;
pub const STRIPS_PER_PACKET: u8 = 2;
pub const PIXELS_PER_STRIP: u16 = 2;

pub fn mac(n: u8) -> DeviceId {
    DeviceId::new([0xd8, 0x80, 0x39, 0x00, 0x00, n])
}

fn header(n: u8, device_type: DeviceType) -> DiscoveryHeader {
    DiscoveryHeader {
        mac_address: mac(n),
        ip_address: Ipv4Addr::new(10, 0, 0, n),
        device_type,
        protocol_version: 1,
        vendor_id: 2,
        product_id: 1,
        hw_revision: 3,
        sw_revision: 131,
        link_speed: 100_000_000,
    }
}

/// A PixelPusher with four strips of two pixels, taking two strips per packet.
pub fn pusher(n: u8, period_ms: u64) -> DiscoveryPacket {
    DiscoveryPacket {
        header: header(n, DeviceType::PixelPusher),
        particulars: Particulars::PixelPusher(PixelPusherParams {
            number_strips: STRIPS,
            strips_per_packet: STRIPS_PER_PACKET,
            pixels_per_strip: PIXELS_PER_STRIP,
            update_period: Duration::from_millis(period_ms),
            power_total: 0,
            delta_sequence: 0,
            controller_ordinal: 0,
            group_ordinal: 0,
            artnet_universe: None,
            artnet_channel: None,
            my_port: DEFAULT_PIXEL_PORT,
            strip_flags: Default::default(),
            pusher_flags: None,
        }),
    }
}

pub fn ether_dream(n: u8) -> DiscoveryPacket {
    DiscoveryPacket {
        header: header(n, DeviceType::EtherDream),
        particulars: Particulars::Other(vec![0; 24]),
    }
}

/// A frame where every listed strip is filled with `value`.
pub fn frame(strips: &[u8], value: u8) -> Vec<StripUpdate> {
    strips
        .iter()
        .map(|&index| StripUpdate::new(index, vec![value; usize::from(PIXELS_PER_STRIP) * BYTES_PER_PIXEL]))
        .collect()
}

/// Records sends and plays back queued datagrams.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<(Vec<u8>, SocketAddrV4)>,
    pub inbound: VecDeque<Vec<u8>>,
    pub fail_sends: bool,
    pub fail_recv: bool,
}

impl Transport for RecordingTransport {
    fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>> {
        if self.fail_recv {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "recv failed"));
        }
        Ok(self.inbound.pop_front().map(|datagram| {
            buf[..datagram.len()].copy_from_slice(&datagram);
            (datagram.len(), SocketAddr::from(([10, 0, 0, 1], 7331)))
        }))
    }

    fn send_to(&mut self, buf: &[u8], dst: SocketAddrV4) -> io::Result<usize> {
        if self.fail_sends {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "send failed"));
        }
        self.sent.push((buf.to_vec(), dst));
        Ok(buf.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([0, 0, 0, 0], 7331)))
    }
}
