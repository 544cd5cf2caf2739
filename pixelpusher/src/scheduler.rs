// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Pacing of outbound pixel packets.
//!
//! Every controller drains its queue at most one packet per update period. Wakes are kept in a single [TimerQueue]
//! shared by all controllers; a controller holds the [TimerId] of its one outstanding wake and cancels it by forgetting
//! the id, so a wake that no longer matches is discarded when it comes due.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use log::{trace, warn};

use crate::{controller::Controller, device_id::DeviceId, time::Timestamp, transport::Transport};

/// Handle of a scheduled wake.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Wake {
    deadline: Timestamp,
    id: TimerId,
    device: DeviceId,
}

impl Ord for Wake {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties are broken by arming order.
        (self.deadline, self.id).cmp(&(other.deadline, other.id))
    }
}

impl PartialOrd for Wake {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One shot wakes, ordered by deadline.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Wake>>,
    next_id: u64,
}

impl TimerQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a wake for `device` at `deadline`.
    pub fn arm(&mut self, device: DeviceId, deadline: Timestamp) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.heap.push(Reverse(Wake { deadline, id, device }));
        id
    }

    /// The earliest deadline, which may belong to a cancelled wake.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.heap.peek().map(|Reverse(wake)| wake.deadline)
    }

    /// Remove and return the earliest wake if it is due at `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(TimerId, DeviceId)> {
        if self.next_deadline()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(wake)| (wake.id, wake.device))
    }

    /// Number of scheduled wakes, cancelled ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every scheduled wake.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

/// Run one scheduler step for `controller` at `now`.
///
/// Before the controller's next update time this only arms a wake for it. Otherwise the oldest queued packet is sent
/// and, if more are waiting, a wake is armed one update period later.
pub fn step<T: Transport>(controller: &mut Controller, now: Timestamp, timers: &mut TimerQueue, transport: &mut T) {
    if now < controller.next_update() {
        controller.armed = Some(timers.arm(controller.id(), controller.next_update()));
        return;
    }

    controller.armed = None;
    let Some(packet) = controller.pop_pending() else {
        return;
    };

    if let Some(dst) = controller.destination() {
        trace!("Sending {} octets to {} at {}", packet.len(), controller.id(), dst);
        if let Err(e) = transport.send_to(&packet, dst) {
            warn!("Failed to send pixel packet to {dst}: {e}");
        }
    }

    let period = controller.update_period();
    controller.set_next_update(now + period);
    if controller.pending_len() > 0 {
        controller.armed = Some(timers.arm(controller.id(), now + period));
    }
}

/// Cancel the controller's wake, if any, and step right away.
pub fn resync<T: Transport>(controller: &mut Controller, now: Timestamp, timers: &mut TimerQueue, transport: &mut T) {
    if controller.armed.take().is_some() {
        step(controller, now, timers, transport);
    }
}

/// Step the controller if it has packets waiting and no wake armed.
pub fn kick<T: Transport>(controller: &mut Controller, now: Timestamp, timers: &mut TimerQueue, transport: &mut T) {
    if !controller.is_armed() && controller.pending_len() > 0 {
        step(controller, now, timers, transport);
    }
}
