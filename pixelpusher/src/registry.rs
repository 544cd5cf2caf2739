// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The known controllers and their liveness.

use std::{
    collections::{HashMap, hash_map},
    time::Duration,
};

use log::info;

use crate::{controller::Controller, device_id::DeviceId, events::PusherEvents, time::Timestamp};

/// Maps device identifiers to controllers and evicts the ones that went silent.
#[derive(Debug, Clone)]
pub struct Registry {
    controllers: HashMap<DeviceId, Controller>,
    timeout: Duration,
}

impl Registry {
    /// An empty registry evicting controllers silent for longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            controllers: HashMap::new(),
            timeout,
        }
    }

    /// The liveness timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The controller with the given identifier.
    pub fn get(&self, id: &DeviceId) -> Option<&Controller> {
        self.controllers.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &DeviceId) -> Option<&mut Controller> {
        self.controllers.get_mut(id)
    }

    /// Whether a controller with the given identifier is known.
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.controllers.contains_key(id)
    }

    /// All known controllers, in no particular order.
    pub fn iter(&self) -> hash_map::Values<'_, DeviceId, Controller> {
        self.controllers.values()
    }

    /// Number of known controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// True if no controller is known.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Add a newly discovered controller, returns a reference to it.
    pub(crate) fn insert(&mut self, controller: Controller) -> &Controller {
        match self.controllers.entry(controller.id()) {
            hash_map::Entry::Occupied(mut entry) => {
                entry.insert(controller);
                entry.into_mut()
            }
            hash_map::Entry::Vacant(entry) => entry.insert(controller),
        }
    }

    /// Evict every controller not heard from within the timeout before `now`.
    ///
    /// Each evicted controller has its wake cancelled and is reported once through [PusherEvents::on_timeout]. Returns
    /// the evicted identifiers, in ascending order.
    pub fn sweep<E: PusherEvents>(&mut self, now: Timestamp, events: &mut E) -> Vec<DeviceId> {
        let mut expired: Vec<DeviceId> = self
            .controllers
            .values()
            .filter(|c| c.last_updated() + self.timeout < now)
            .map(Controller::id)
            .collect();
        expired.sort_unstable();

        for id in &expired {
            if let Some(mut controller) = self.controllers.remove(id) {
                controller.armed = None;
                info!("Controller {} at {} timed out", id, controller.header().ip_address);
                events.on_timeout(&controller);
            }
        }

        expired
    }

    /// Drop every controller without reporting them as timed out. Returns how many there were.
    pub fn shutdown(&mut self) -> usize {
        let count = self.controllers.len();
        self.controllers.clear();
        count
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Controller;
    type IntoIter = hash_map::Values<'a, DeviceId, Controller>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
