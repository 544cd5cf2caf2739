// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Notifications about controllers coming, changing and going.

use crate::{controller::Controller, device_id::DeviceId, error::Error};

/// Receives notifications from a [crate::service::PixelPusherService].
///
/// Every method defaults to doing nothing, implement the ones of interest.
pub trait PusherEvents {
    /// A device was seen for the first time.
    fn on_discover(&mut self, _controller: &Controller) {}

    /// A heartbeat from a known PixelPusher was applied.
    fn on_update(&mut self, _controller: &Controller) {}

    /// A device went silent and was evicted.
    fn on_timeout(&mut self, _controller: &Controller) {}

    /// The discovery socket failed.
    fn on_error(&mut self, _error: &Error) {}
}

impl PusherEvents for () {}

impl<E: PusherEvents + ?Sized> PusherEvents for &mut E {
    fn on_discover(&mut self, controller: &Controller) {
        (**self).on_discover(controller)
    }

    fn on_update(&mut self, controller: &Controller) {
        (**self).on_update(controller)
    }

    fn on_timeout(&mut self, controller: &Controller) {
        (**self).on_timeout(controller)
    }

    fn on_error(&mut self, error: &Error) {
        (**self).on_error(error)
    }
}

/// A notification, as recorded by the [PusherEvents] implementation of `Vec<PusherEvent>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PusherEvent {
    /// See [PusherEvents::on_discover].
    Discovered(DeviceId),
    /// See [PusherEvents::on_update].
    Updated(DeviceId),
    /// See [PusherEvents::on_timeout].
    TimedOut(DeviceId),
    /// See [PusherEvents::on_error], holds the rendered error.
    Error(String),
}

impl PusherEvents for Vec<PusherEvent> {
    fn on_discover(&mut self, controller: &Controller) {
        self.push(PusherEvent::Discovered(controller.id()));
    }

    fn on_update(&mut self, controller: &Controller) {
        self.push(PusherEvent::Updated(controller.id()));
    }

    fn on_timeout(&mut self, controller: &Controller) {
        self.push(PusherEvent::TimedOut(controller.id()));
    }

    fn on_error(&mut self, error: &Error) {
        self.push(PusherEvent::Error(error.to_string()));
    }
}
