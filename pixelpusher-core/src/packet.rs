// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![warn(missing_docs)]

//! Pixel packets and the frame packetizer.
//!
//! A pixel packet is a little endian sequence number followed by one or more strip segments, each segment being a
//! single strip number byte followed by the strip's pixel data:
//!
//! ```text
//! uint32_t sequence_number;  // monotonically ascends, per-pusher.
//! while (packet_not_full_up) {
//!    uint8_t strip_number;
//!    pixel_t strip_data[NUMBER_OF_PIXELS];  // a whole strip, 3 bytes per pixel.
//! }
//! ```
//!
//! The [Packetizer] turns an application frame into such packets: unchanged strips are skipped, and what is left is
//! split over as many packets as the controller's strips-per-packet limit requires.
//!
//! # Examples
//!
//! ```
//! # use pixelpusher_core::packet::{PixelPacket, StripSegment};
//! let packet = PixelPacket {
//!     sequence_number: 7,
//!     strips: vec![StripSegment::new(0, vec![255, 0, 0, 0, 255, 0])],
//! };
//!
//! let buf = packet.pack_alloc();
//! assert_eq!(buf, [7, 0, 0, 0, 0, 255, 0, 0, 0, 255, 0]);
//! assert_eq!(PixelPacket::parse(&buf, 6).unwrap(), packet);
//! ```

extern crate alloc;
use alloc::{borrow::Cow, vec::Vec};

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    discovery::PixelPusherParams,
    parse_error::ParseError,
    pp_definitions::{INITIAL_SEQUENCE_NUMBER, SEQUENCE_NUMBER_FIELD_LENGTH, STRIP_NUMBER_FIELD_LENGTH},
};

/// New pixel data for one strip, as submitted by the application.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StripUpdate {
    /// Which strip of the controller the data is for.
    pub strip_index: u8,
    /// Three bytes (r, g, b) per pixel.
    pub pixels: Vec<u8>,
}

impl StripUpdate {
    /// Create a new strip update
    pub fn new(strip_index: u8, pixels: impl Into<Vec<u8>>) -> Self {
        Self {
            strip_index,
            pixels: pixels.into(),
        }
    }
}

/// One strip's worth of data inside a pixel packet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StripSegment<'a> {
    /// The strip number byte written in front of the pixel data.
    pub strip_number: u8,
    /// The pixel data.
    pub pixels: Cow<'a, [u8]>,
}

impl<'a> StripSegment<'a> {
    /// Create a new segment
    pub fn new(strip_number: u8, pixels: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            strip_number,
            pixels: pixels.into(),
        }
    }
}

/// A packet of pixel data as sent to a PixelPusher.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelPacket<'a> {
    /// Per controller sequence number, wraps at 2^32.
    pub sequence_number: u32,
    /// The strips carried by this packet.
    pub strips: Vec<StripSegment<'a>>,
}

impl<'a> PixelPacket<'a> {
    /// Parse a pixel packet whose strips each carry `strip_len` bytes of pixel data.
    ///
    /// # Errors
    /// InsufficientData: Returned if the buffer can't even hold the sequence number.
    ///
    /// TruncatedSegment: Returned if the buffer ends in the middle of a strip.
    pub fn parse(buf: &'a [u8], strip_len: usize) -> Result<PixelPacket<'a>, ParseError> {
        ParseError::check_len(buf, SEQUENCE_NUMBER_FIELD_LENGTH)?;

        let sequence_number = LittleEndian::read_u32(&buf[..SEQUENCE_NUMBER_FIELD_LENGTH]);

        let mut strips = Vec::new();
        let mut offset = SEQUENCE_NUMBER_FIELD_LENGTH;
        while offset < buf.len() {
            let end = offset + STRIP_NUMBER_FIELD_LENGTH + strip_len;
            if end > buf.len() {
                return Err(ParseError::TruncatedSegment { offset });
            }
            strips.push(StripSegment::new(buf[offset], &buf[offset + STRIP_NUMBER_FIELD_LENGTH..end]));
            offset = end;
        }

        Ok(PixelPacket { sequence_number, strips })
    }

    /// Packs the packet into heap allocated memory.
    pub fn pack_alloc(&self) -> Vec<u8> {
        let mut buf = alloc::vec![0; self.len()];
        self.pack(&mut buf);
        buf
    }

    /// Packs the packet into the given buffer, which must hold at least [Self::len] bytes.
    pub fn pack(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[..SEQUENCE_NUMBER_FIELD_LENGTH], self.sequence_number);

        let mut offset = SEQUENCE_NUMBER_FIELD_LENGTH;
        for strip in &self.strips {
            buf[offset] = strip.strip_number;
            offset += STRIP_NUMBER_FIELD_LENGTH;
            buf[offset..offset + strip.pixels.len()].copy_from_slice(&strip.pixels);
            offset += strip.pixels.len();
        }
    }

    /// The length of the packet when packed.
    pub fn len(&self) -> usize {
        SEQUENCE_NUMBER_FIELD_LENGTH
            + self
                .strips
                .iter()
                .map(|s| STRIP_NUMBER_FIELD_LENGTH + s.pixels.len())
                .sum::<usize>()
    }

    /// True if the packet carries no strips.
    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }
}

/// How a new frame is compared with what was sent before to find unchanged strips.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DedupMode {
    /// Compare the n-th strip of the frame with the n-th strip that was actually sent last round.
    ///
    /// The snapshot only holds the strips that survived deduplication, so once a strip has been skipped the positions
    /// stop lining up with strip identities. Matches the behaviour deployed PixelPusher drivers have always had.
    #[default]
    Positional,

    /// Compare each strip with the data last sent for the same strip index.
    ByStripIndex,
}

/// What goes into the strip number byte of a segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StripIndexEncoding {
    /// The position of the strip among the strips sent this round, counted across all packets of the frame.
    ///
    /// Only equal to the declared index when no strip was skipped. Kept as the default until it is confirmed on real
    /// hardware that switching to [StripIndexEncoding::Declared] is safe.
    #[default]
    FillOrder,

    /// The strip index declared by the application.
    Declared,
}

/// Tunables of the [Packetizer].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PacketizerOptions {
    /// How unchanged strips are detected.
    pub dedup: DedupMode,
    /// What goes into the strip number byte.
    pub index_encoding: StripIndexEncoding,
}

/// Turns application frames into pixel packets for a single controller.
///
/// Owns the controller's sequence counter and the snapshot of what was sent last round.
#[derive(Clone, Debug)]
pub struct Packetizer {
    sequence_number: u32,
    last_sent: Vec<StripUpdate>,
    options: PacketizerOptions,
}

impl Default for Packetizer {
    fn default() -> Self {
        Self::new(PacketizerOptions::default())
    }
}

impl Packetizer {
    /// Create a packetizer starting at [INITIAL_SEQUENCE_NUMBER] with an empty snapshot.
    pub fn new(options: PacketizerOptions) -> Self {
        Self {
            sequence_number: INITIAL_SEQUENCE_NUMBER,
            last_sent: Vec::new(),
            options,
        }
    }

    /// Start the sequence counter at the given value instead.
    pub fn with_sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// The sequence number the next packet will carry.
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// The strips sent last round.
    pub fn last_sent(&self) -> &[StripUpdate] {
        &self.last_sent
    }

    /// The options this packetizer was created with.
    pub fn options(&self) -> PacketizerOptions {
        self.options
    }

    /// Converts a frame into packed pixel packets, oldest first.
    ///
    /// Strips identical to what was sent last round are skipped; a frame with no changes yields no packets. Every
    /// packet consumes one sequence number.
    ///
    /// # Errors
    /// StripOutOfRange: Returned if any strip index is not below the controller's strip count. Nothing is changed in
    /// that case, neither the snapshot nor the sequence counter.
    pub fn packetize(&mut self, frame: &[StripUpdate], params: &PixelPusherParams) -> Result<Vec<Vec<u8>>, FrameError> {
        if let Some(strip) = frame.iter().find(|s| s.strip_index >= params.number_strips) {
            return Err(FrameError::StripOutOfRange {
                index: strip.strip_index,
                strip_count: params.number_strips,
            });
        }

        let changed: Vec<StripUpdate> = frame
            .iter()
            .enumerate()
            .filter(|(position, strip)| !self.is_unchanged(*position, strip))
            .map(|(_, strip)| strip.clone())
            .collect();

        // A controller reporting zero would otherwise never make progress.
        let strips_per_packet = usize::from(params.strips_per_packet.max(1));

        let mut packets = Vec::with_capacity(changed.len().div_ceil(strips_per_packet));
        let mut fill_position: u8 = 0;
        for chunk in changed.chunks(strips_per_packet) {
            let strips = chunk
                .iter()
                .map(|strip| {
                    let strip_number = match self.options.index_encoding {
                        StripIndexEncoding::FillOrder => fill_position,
                        StripIndexEncoding::Declared => strip.strip_index,
                    };
                    fill_position = fill_position.wrapping_add(1);
                    StripSegment::new(strip_number, strip.pixels.as_slice())
                })
                .collect();

            let packet = PixelPacket {
                sequence_number: self.sequence_number,
                strips,
            };
            self.sequence_number = self.sequence_number.wrapping_add(1);
            packets.push(packet.pack_alloc());
        }

        self.remember(changed);

        Ok(packets)
    }

    fn is_unchanged(&self, position: usize, strip: &StripUpdate) -> bool {
        match self.options.dedup {
            DedupMode::Positional => self.last_sent.get(position).is_some_and(|prev| prev.pixels == strip.pixels),
            DedupMode::ByStripIndex => self
                .last_sent
                .iter()
                .any(|prev| prev.strip_index == strip.strip_index && prev.pixels == strip.pixels),
        }
    }

    fn remember(&mut self, sent: Vec<StripUpdate>) {
        match self.options.dedup {
            DedupMode::Positional => self.last_sent = sent,
            DedupMode::ByStripIndex => {
                for strip in sent {
                    match self.last_sent.iter_mut().find(|prev| prev.strip_index == strip.strip_index) {
                        Some(prev) => prev.pixels = strip.pixels,
                        None => self.last_sent.push(strip),
                    }
                }
            }
        }
    }
}

/// Errors when submitting a frame
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A strip index is outside of the strips the controller has.
    ///
    /// # Arguments
    /// index: The offending strip index.
    /// strip_count: The number of strips of the controller, valid indices are `0..strip_count`.
    #[error("Strip index {index} out of range, strips must be numbered from 0 to {}", .strip_count.saturating_sub(1))]
    StripOutOfRange {
        /// offending index
        index: u8,
        /// number of strips
        strip_count: u8,
    },
}
