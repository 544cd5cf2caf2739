// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! This module contains the `DeviceId`, the hardware address a controller announces itself with.

use core::{fmt::Display, str::FromStr, write};

use crate::pp_definitions::MAC_ADDRESS_LENGTH;

/// Device identifier, the 6 byte MAC address of a controller.
///
/// Displayed in its canonical form: lowercase hex octets separated by colons, e.g. `d8:80:39:66:4b:12`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceId([u8; MAC_ADDRESS_LENGTH]);

impl Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl From<[u8; MAC_ADDRESS_LENGTH]> for DeviceId {
    fn from(bytes: [u8; MAC_ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<DeviceId> for [u8; MAC_ADDRESS_LENGTH] {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl TryFrom<&[u8]> for DeviceId {
    type Error = DeviceIdError;

    /// Takes the identifier from the first 6 bytes of the given buffer.
    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(buf)
    }
}

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    /// Parses the canonical colon separated form. Hex digits may be upper or lower case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; MAC_ADDRESS_LENGTH];
        let mut octets = s.split(':');

        for byte in bytes.iter_mut() {
            let octet = octets.next().ok_or(DeviceIdError::Malformed)?;
            if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(DeviceIdError::Malformed);
            }
            *byte = u8::from_str_radix(octet, 16).map_err(|_| DeviceIdError::Malformed)?;
        }

        if octets.next().is_some() {
            return Err(DeviceIdError::Malformed);
        }

        Ok(Self(bytes))
    }
}

impl DeviceId {
    /// Create a new identifier from its raw bytes
    pub const fn new(bytes: [u8; MAC_ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Takes the identifier from the start of a discovery packet.
    ///
    /// # Errors
    /// TooShort: Returned if the buffer holds less than 6 bytes.
    pub fn from_slice(buf: &[u8]) -> Result<Self, DeviceIdError> {
        let bytes: [u8; MAC_ADDRESS_LENGTH] = buf
            .get(..MAC_ADDRESS_LENGTH)
            .and_then(|b| b.try_into().ok())
            .ok_or(DeviceIdError::TooShort(buf.len()))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub const fn as_bytes(&self) -> &[u8; MAC_ADDRESS_LENGTH] {
        &self.0
    }
}

/// Error for creation of [DeviceId]
#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    /// The buffer was too short to hold a MAC address.
    ///
    /// # Arguments
    /// 0: Length of the buffer
    #[error("Need {} bytes for a device id, got {}", MAC_ADDRESS_LENGTH, .0)]
    TooShort(usize),

    /// The string is not six colon separated hex octets.
    #[error("Device id must be six colon separated hex octets")]
    Malformed,
}

#[cfg(test)]
mod test {
    extern crate alloc;
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display_is_lowercase_colon_hex() {
        let id = DeviceId::new([0xD8, 0x80, 0x39, 0x66, 0x0B, 0x12]);
        assert_eq!(id.to_string(), "d8:80:39:66:0b:12");
    }

    #[test]
    fn test_parse_canonical_form() {
        let id: DeviceId = "d8:80:39:66:0B:12".parse().unwrap();
        assert_eq!(id.as_bytes(), &[0xd8, 0x80, 0x39, 0x66, 0x0b, 0x12]);
        assert_eq!(id.to_string().parse::<DeviceId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("d8:80:39:66:0b".parse::<DeviceId>().is_err());
        assert!("d8:80:39:66:0b:12:00".parse::<DeviceId>().is_err());
        assert!("d8:80:39:66:0b:1".parse::<DeviceId>().is_err());
        assert!("d8:80:39:66:0b:zz".parse::<DeviceId>().is_err());
    }

    #[test]
    fn test_from_slice_takes_first_six_bytes() {
        let buf = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(DeviceId::from_slice(&buf).unwrap(), DeviceId::new([1, 2, 3, 4, 5, 6]));
        assert!(matches!(DeviceId::try_from(&buf[..5]), Err(DeviceIdError::TooShort(5))));
    }
}
