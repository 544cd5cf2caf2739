#![no_std]
#![warn(missing_docs)]

//! Core types for the pixelpusher crate
//!
//! Wire formats of the Universal Discovery Protocol and of PixelPusher pixel packets, free of any socket or clock.

extern crate alloc;

pub mod device_id;
pub mod discovery;
pub mod packet;
pub mod parse_error;
pub mod pp_definitions;
pub mod time;
