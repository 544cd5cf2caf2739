// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Constants of the Universal Discovery Protocol and the PixelPusher pixel packet format.

use core::time::Duration;

/// The UDP port discovery and heartbeat datagrams are broadcast to.
pub const DISCOVERY_LISTENER_PORT: u16 = 7331;

/// The port pixel packets are sent to when the device does not announce its own.
pub const DEFAULT_PIXEL_PORT: u16 = 9761;

/// A controller that has not sent a heartbeat for longer than this is considered gone.
pub const CONTROLLER_TIMEOUT_THRESHOLD: Duration = Duration::from_millis(5000);

/// The cadence of the liveness sweep over all known controllers.
pub const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// The length of the device MAC address field.
pub const MAC_ADDRESS_LENGTH: usize = 6;

/// The shortest datagram accepted as a discovery or heartbeat packet.
pub const DISCOVERY_PACKET_MIN_LENGTH: usize = 48;

/// Datagrams at least this long carry artnet universe, artnet channel and `my_port`.
pub const DISCOVERY_PACKET_PORT_LENGTH: usize = 54;

/// Datagrams at least this long carry the per-strip flags.
pub const DISCOVERY_PACKET_STRIP_FLAGS_LENGTH: usize = 62;

/// Datagrams at least this long carry the pusher flags.
pub const DISCOVERY_PACKET_PUSHER_FLAGS_LENGTH: usize = 66;

/// Maximum number of strips that can carry flags in a discovery packet.
pub const MAX_STRIP_FLAGS: usize = 8;

// Discovery packet header field offsets.
pub(crate) const MAC_ADDRESS_INDEX: usize = 0;
pub(crate) const IP_ADDRESS_INDEX: usize = MAC_ADDRESS_INDEX + MAC_ADDRESS_LENGTH;
pub(crate) const DEVICE_TYPE_INDEX: usize = IP_ADDRESS_INDEX + 4;
pub(crate) const PROTOCOL_VERSION_INDEX: usize = DEVICE_TYPE_INDEX + 1;
pub(crate) const VENDOR_ID_INDEX: usize = PROTOCOL_VERSION_INDEX + 1;
pub(crate) const PRODUCT_ID_INDEX: usize = VENDOR_ID_INDEX + 2;
pub(crate) const HW_REVISION_INDEX: usize = PRODUCT_ID_INDEX + 2;
pub(crate) const SW_REVISION_INDEX: usize = HW_REVISION_INDEX + 2;
pub(crate) const LINK_SPEED_INDEX: usize = SW_REVISION_INDEX + 2;

/// Offset of the device specific part of a discovery packet.
pub const PARTICULARS_INDEX: usize = LINK_SPEED_INDEX + 4;

// PixelPusher particulars field offsets.
pub(crate) const STRIPS_ATTACHED_INDEX: usize = PARTICULARS_INDEX;
pub(crate) const MAX_STRIPS_PER_PACKET_INDEX: usize = STRIPS_ATTACHED_INDEX + 1;
pub(crate) const PIXELS_PER_STRIP_INDEX: usize = MAX_STRIPS_PER_PACKET_INDEX + 1;
pub(crate) const UPDATE_PERIOD_INDEX: usize = PIXELS_PER_STRIP_INDEX + 2;
pub(crate) const POWER_TOTAL_INDEX: usize = UPDATE_PERIOD_INDEX + 4;
pub(crate) const DELTA_SEQUENCE_INDEX: usize = POWER_TOTAL_INDEX + 4;
pub(crate) const CONTROLLER_ORDINAL_INDEX: usize = DELTA_SEQUENCE_INDEX + 4;
pub(crate) const GROUP_ORDINAL_INDEX: usize = CONTROLLER_ORDINAL_INDEX + 4;
pub(crate) const ARTNET_UNIVERSE_INDEX: usize = GROUP_ORDINAL_INDEX + 4;
pub(crate) const ARTNET_CHANNEL_INDEX: usize = ARTNET_UNIVERSE_INDEX + 2;
pub(crate) const MY_PORT_INDEX: usize = ARTNET_CHANNEL_INDEX + 2;
pub(crate) const STRIP_FLAGS_INDEX: usize = MY_PORT_INDEX + 2;
pub(crate) const PUSHER_FLAGS_INDEX: usize = STRIP_FLAGS_INDEX + MAX_STRIP_FLAGS;

/// Strip flag: the strip is made of RGBOW pixels.
pub const SFLAG_RGBOW: u8 = 1 << 0;

/// Strip flag: the strip uses 16 bit per colour pixels.
pub const SFLAG_WIDEPIXELS: u8 = 1 << 1;

/// Pusher flag: the pusher is protected.
pub const PFLAG_PROTECTED: i32 = 1 << 0;

/// A heartbeat reporting a sequence delta above this asks for the send backlog to be trimmed.
pub const STALE_DELTA_THRESHOLD: u32 = 5;

/// Added to the update period after a heartbeat reporting a long sequence gap.
pub const STALE_PERIOD_COMPENSATION: Duration = Duration::from_millis(5);

/// Subtracted from an apparently overlarge update period reported with a zero delta.
pub const OVERLARGE_PERIOD_CORRECTION: Duration = Duration::from_millis(1);

/// Number of packets kept in the send queue by the stale-backlog trim.
pub const STALE_BACKLOG_KEEP: usize = 2;

/// The length of the sequence number at the start of every pixel packet.
pub const SEQUENCE_NUMBER_FIELD_LENGTH: usize = 4;

/// The length of the strip number preceding each strip's pixel data.
pub const STRIP_NUMBER_FIELD_LENGTH: usize = 1;

/// Bytes used by one RGB pixel in a pixel packet.
pub const BYTES_PER_PIXEL: usize = 3;

/// The first sequence number stamped by a freshly discovered controller.
pub const INITIAL_SEQUENCE_NUMBER: u32 = 1;
