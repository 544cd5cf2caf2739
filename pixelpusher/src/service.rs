// Copyright 2024 pixelpusher Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![warn(missing_docs)]

//! The discovery listener and pixel sender.
//!
//! A [PixelPusherService] owns the socket, the registry of controllers and the pacing timers. Nothing runs in the
//! background: the application drives the service by calling [PixelPusherService::poll] in a loop, which receives at
//! most one datagram and then runs whatever timers and liveness sweeps have come due.
//!
//! # Examples
//!
//! ```no_run
//! use pixelpusher::config::PusherConfig;
//! use pixelpusher::events::PusherEvent;
//! use pixelpusher::packet::StripUpdate;
//! use pixelpusher::service::PixelPusherService;
//! use std::time::Duration;
//!
//! let mut events: Vec<PusherEvent> = Vec::new();
//! let mut service = PixelPusherService::bind(PusherConfig::default(), &mut events).unwrap();
//!
//! loop {
//!     service.poll(Duration::from_millis(10)).unwrap();
//!
//!     let ids: Vec<_> = service.registry().iter().filter(|c| c.is_pixel_pusher()).map(|c| c.id()).collect();
//!     for id in ids {
//!         let frame = vec![StripUpdate::new(0, vec![255; 3 * 240])];
//!         service.submit_frame(&id, &frame).unwrap();
//!     }
//! }
//! ```

use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::{
    PusherResult,
    clock::{Clock, SystemClock},
    config::PusherConfig,
    controller::Controller,
    device_id::DeviceId,
    discovery::{DiscoveryPacket, Heartbeat},
    error::Error,
    events::PusherEvents,
    packet::StripUpdate,
    parse_error::ParseError,
    pp_definitions::DISCOVERY_PACKET_MIN_LENGTH,
    registry::Registry,
    scheduler::{self, TimerQueue},
    time::Timestamp,
    transport::{Transport, UdpTransport},
};

/// Large enough for any discovery datagram seen in the wild.
const RECV_BUFFER_LENGTH: usize = 1500;

/// What a datagram turned out to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// First sighting of a device, which is now registered.
    Discovery(DeviceId),
    /// A heartbeat from a known PixelPusher, which was applied.
    Heartbeat(DeviceId),
    /// A datagram from a known device that is not a PixelPusher, ignored.
    Ignored(DeviceId),
}

/// Discovers PixelPushers and streams pixel data to them.
pub struct PixelPusherService<E, C = SystemClock, T = UdpTransport> {
    config: PusherConfig,
    events: E,
    clock: C,
    transport: T,
    registry: Registry,
    timers: TimerQueue,
    next_sweep: Timestamp,
    recv_buf: Vec<u8>,
}

impl<E: PusherEvents> PixelPusherService<E> {
    /// Listen on the configured address using the system clock.
    ///
    /// # Errors
    /// Bind: Returned if the socket could not be opened or bound. The error is passed to [PusherEvents::on_error] as
    /// well.
    pub fn bind(config: PusherConfig, mut events: E) -> PusherResult<Self> {
        let transport = match UdpTransport::bind(config.listen_addr) {
            Ok(transport) => transport,
            Err(source) => {
                let err = Error::Bind {
                    addr: config.listen_addr,
                    source,
                };
                error!("{err}");
                events.on_error(&err);
                return Err(err);
            }
        };
        info!("Listening for PixelPushers on {}", config.listen_addr);

        Ok(Self::with_transport(config, events, SystemClock::new(), transport))
    }
}

impl<E: PusherEvents, C: Clock, T: Transport> PixelPusherService<E, C, T> {
    /// Build a service on top of an already open transport.
    pub fn with_transport(config: PusherConfig, events: E, clock: C, transport: T) -> Self {
        let next_sweep = clock.now() + config.timeout_check_interval;
        Self {
            registry: Registry::new(config.controller_timeout),
            config,
            events,
            clock,
            transport,
            timers: TimerQueue::new(),
            next_sweep,
            recv_buf: vec![0; RECV_BUFFER_LENGTH],
        }
    }

    /// Wait up to `max_wait` for a datagram, then run every timer and sweep that is due.
    ///
    /// The wait is cut short by the earliest pacing wake or liveness sweep. Malformed datagrams are logged and dropped.
    ///
    /// # Errors
    /// Receive: Returned if the socket failed. The error is passed to [PusherEvents::on_error] as well.
    pub fn poll(&mut self, max_wait: Duration) -> PusherResult<()> {
        let now = self.clock.now();
        let deadline = match self.timers.next_deadline() {
            Some(wake) => wake.min(self.next_sweep),
            None => self.next_sweep,
        };
        let wait = (deadline - now).min(max_wait);

        let mut buf = std::mem::take(&mut self.recv_buf);
        let received = self.transport.recv(&mut buf, wait);
        let result = match received {
            Ok(Some((len, src))) => {
                trace!("Received {len} octets from {src}");
                if let Err(e) = self.handle_datagram(&buf[..len]) {
                    debug!("Dropped datagram from {src}: {e}");
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                let err = Error::Receive(e);
                error!("{err}");
                self.events.on_error(&err);
                Err(err)
            }
        };
        self.recv_buf = buf;

        self.tick();
        result
    }

    /// Process one discovery datagram.
    ///
    /// # Errors
    /// Parse: Returned if the datagram is malformed, nothing is changed in that case.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> PusherResult<Datagram> {
        if datagram.len() < DISCOVERY_PACKET_MIN_LENGTH {
            warn!(
                "Dropping {} octet discovery datagram, need at least {}",
                datagram.len(),
                DISCOVERY_PACKET_MIN_LENGTH
            );
            return Err(ParseError::InsufficientData {
                actual: datagram.len(),
                required: DISCOVERY_PACKET_MIN_LENGTH,
            }
            .into());
        }

        let id = DeviceId::from_slice(datagram).map_err(ParseError::from)?;
        let now = self.clock.now();

        if let Some(controller) = self.registry.get_mut(&id) {
            if !controller.is_pixel_pusher() {
                return Ok(Datagram::Ignored(id));
            }

            let heartbeat = Heartbeat::parse(datagram)?;
            let stale = controller.apply_heartbeat(&heartbeat, now)?;
            debug!(
                "Heartbeat from {id}: period {:?}, delta {}{}",
                controller.update_period(),
                heartbeat.delta_sequence,
                if stale { ", backlog trimmed" } else { "" }
            );
            scheduler::resync(controller, now, &mut self.timers, &mut self.transport);
            self.events.on_update(controller);
            return Ok(Datagram::Heartbeat(id));
        }

        let discovery = DiscoveryPacket::parse(datagram)?;
        info!(
            "{:?} discovered at ip address [{}] with id {id}",
            discovery.header.device_type, discovery.header.ip_address
        );
        let controller = self
            .registry
            .insert(Controller::new(discovery, now, self.config.packetizer));
        self.events.on_discover(controller);
        Ok(Datagram::Discovery(id))
    }

    /// Run every pacing wake that is due, then the liveness sweep if it is due.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        while let Some((timer, id)) = self.timers.pop_due(now) {
            if let Some(controller) = self.registry.get_mut(&id) {
                if controller.armed == Some(timer) {
                    scheduler::step(controller, now, &mut self.timers, &mut self.transport);
                }
            }
        }

        if now >= self.next_sweep {
            self.registry.sweep(now, &mut self.events);
            self.next_sweep = now + self.config.timeout_check_interval;
        }
    }

    /// Queue a frame for the given controller, returns the number of packets queued.
    ///
    /// Strips unchanged since the last frame are left out. If the controller is idle the first packet goes out as
    /// soon as its pacing allows.
    ///
    /// # Errors
    /// ControllerNotFound: Returned if no controller has this identifier.
    ///
    /// NotPixelPusher: Returned if the device does not take pixel data.
    ///
    /// Frame: Returned if a strip index is out of range. Nothing is queued in that case.
    pub fn submit_frame(&mut self, id: &DeviceId, frame: &[StripUpdate]) -> PusherResult<usize> {
        let controller = self.registry.get_mut(id).ok_or(Error::ControllerNotFound(*id))?;
        let count = controller.enqueue_frame(frame)?;
        scheduler::kick(controller, self.clock.now(), &mut self.timers, &mut self.transport);
        Ok(count)
    }

    /// Drop every controller and pending wake without reporting timeouts.
    pub fn shutdown(&mut self) {
        let count = self.registry.shutdown();
        self.timers.clear();
        info!("Shut down, dropped {count} controllers");
    }

    /// The known controllers.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The controller with the given identifier.
    pub fn controller(&self, id: &DeviceId) -> Option<&Controller> {
        self.registry.get(id)
    }

    /// The configuration the service was built with.
    pub fn config(&self) -> &PusherConfig {
        &self.config
    }

    /// The notification sink.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Mutable access to the notification sink.
    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the service, returning the notification sink.
    pub fn into_events(self) -> E {
        self.events
    }
}
