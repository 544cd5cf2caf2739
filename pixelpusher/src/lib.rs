// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Discovery of and pixel streaming to PixelPusher LED controllers.
//!
//! PixelPushers announce themselves by broadcasting Universal Discovery Protocol datagrams to UDP port 7331 about once a
//! second. This crate listens for them, keeps a registry of every device seen and evicts the ones that go silent for
//! more than five seconds. Frames of pixel data submitted by the application are split into pixel packets, unchanged
//! strips are left out, and the packets are sent to each controller no faster than the update period it reports in its
//! heartbeats.
//!
//! Everything runs on the caller's thread: [service::PixelPusherService::poll] waits for the next datagram or the next
//! due timer, whichever comes first, and handles it.
//!
//! # Examples
//!
//! Discovering controllers and reacting to them through a notification sink.
//! ```no_run
//! use pixelpusher::config::PusherConfig;
//! use pixelpusher::controller::Controller;
//! use pixelpusher::events::PusherEvents;
//! use pixelpusher::service::PixelPusherService;
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl PusherEvents for Printer {
//!     fn on_discover(&mut self, controller: &Controller) {
//!         println!("{} at {}", controller.id(), controller.header().ip_address);
//!     }
//!
//!     fn on_timeout(&mut self, controller: &Controller) {
//!         println!("{} went away", controller.id());
//!     }
//! }
//!
//! let mut service = PixelPusherService::bind(PusherConfig::default(), Printer).unwrap();
//! loop {
//!     service.poll(Duration::from_millis(100)).unwrap();
//! }
//! ```
//!
//! Sending a frame to a known controller.
//! ```no_run
//! use pixelpusher::config::PusherConfig;
//! use pixelpusher::device_id::DeviceId;
//! use pixelpusher::packet::StripUpdate;
//! use pixelpusher::service::PixelPusherService;
//! use std::time::Duration;
//!
//! let mut service = PixelPusherService::bind(PusherConfig::default(), ()).unwrap();
//! let id: DeviceId = "d8:80:39:66:4b:12".parse().unwrap();
//!
//! // Wait until the controller has announced itself.
//! while !service.registry().contains(&id) {
//!     service.poll(Duration::from_millis(100)).unwrap();
//! }
//!
//! let pixels_per_strip = usize::from(service.controller(&id).unwrap().params().unwrap().pixels_per_strip);
//! let frame = vec![StripUpdate::new(0, vec![0xff; 3 * pixels_per_strip])];
//! let queued = service.submit_frame(&id, &frame).unwrap();
//! println!("{queued} packets queued");
//!
//! loop {
//!     service.poll(Duration::from_millis(10)).unwrap();
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pixelpusher/")]
#![warn(missing_docs)]

pub use pixelpusher_core::{device_id, discovery, packet, parse_error, pp_definitions, time};

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod transport;

#[cfg(test)]
mod testing;

/// Result of the fallible operations of this crate.
pub type PusherResult<T> = Result<T, error::Error>;
