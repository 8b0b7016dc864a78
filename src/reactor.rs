//! Single-threaded poll reactor.
//!
//! One `poll(2)` over the button value files and the evdev streams, with a
//! 50 ms timeout.  Ready descriptors are dispatched in fixed index order
//! (buttons, screen, proximity, ambient), then the scheduler is ticked.
//! That tick is the scheduler's only time source, so the poll timeout
//! bounds timer latency.
//!
//! ```text
//!   ┌──────── poll(50 ms) ────────┐
//!   │ 0,1  gpio value   POLLPRI   │──▶ ButtonEdge ──▶ gestures
//!   │ 2    screen       POLLIN    │──▶ wake on EV_KEY
//!   │ 3    proximity    POLLIN    │──▶ first record vs threshold
//!   │ 4,5  ambient      POLLIN    │──▶ drained, ignored
//!   └─────────────────────────────┘
//!                 │
//!                 ▼
//!        TaskScheduler::update
//! ```

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

use log::{debug, info};

use crate::app::ports::{DevicePort, EventSink};
use crate::app::service::RelayService;
use crate::drivers::sysfs::{InputSources, drain_input_events, read_byte};
use crate::error::{Error, Result};
use crate::events::{ButtonEdge, InputEvent};
use crate::scheduler::TaskScheduler;

/// Upper bound on the time between two scheduler ticks.
pub const POLL_TIMEOUT_MS: libc::c_int = 50;

/// What a poll slot is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Button(usize),
    Screen,
    Proximity,
    AmbientLight,
    AmbientLightIr,
}

impl Source {
    fn interest(self) -> libc::c_short {
        match self {
            Self::Button(_) => libc::POLLPRI | libc::POLLERR,
            _ => libc::POLLIN,
        }
    }

    fn file(self, inputs: &mut InputSources) -> Option<&mut File> {
        match self {
            Self::Button(i) => inputs.buttons.get_mut(i),
            Self::Screen => Some(&mut inputs.screen),
            Self::Proximity => Some(&mut inputs.proximity),
            Self::AmbientLight => inputs.ambient[0].as_mut(),
            Self::AmbientLightIr => inputs.ambient[1].as_mut(),
        }
    }
}

pub struct Reactor {
    inputs: InputSources,
    sources: Vec<Source>,
    pollfds: Vec<libc::pollfd>,
    /// Reused evdev batch buffer.
    batch: Vec<InputEvent>,
}

impl Reactor {
    pub fn new(mut inputs: InputSources) -> Self {
        let mut sources = vec![
            Source::Button(0),
            Source::Button(1),
            Source::Screen,
            Source::Proximity,
        ];
        if inputs.ambient[0].is_some() {
            sources.push(Source::AmbientLight);
        }
        if inputs.ambient[1].is_some() {
            sources.push(Source::AmbientLightIr);
        }

        let pollfds = sources
            .iter()
            .filter_map(|&source| {
                let fd = source.file(&mut inputs)?.as_raw_fd();
                Some(libc::pollfd {
                    fd,
                    events: source.interest(),
                    revents: 0,
                })
            })
            .collect();

        Self {
            inputs,
            sources,
            pollfds,
            batch: Vec::with_capacity(16),
        }
    }

    /// Poll slots in dispatch order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Run until `poll` fails.
    pub fn run<D, E>(
        &mut self,
        service: &mut RelayService<D, E>,
        sched: &mut TaskScheduler<RelayService<D, E>>,
    ) -> Result<()>
    where
        D: DevicePort + 'static,
        E: EventSink + 'static,
    {
        info!("reactor running ({} poll sources)", self.sources.len());
        loop {
            self.turn(service, sched)?;
        }
    }

    /// One poll, dispatch and scheduler tick.
    pub fn turn<D, E>(
        &mut self,
        service: &mut RelayService<D, E>,
        sched: &mut TaskScheduler<RelayService<D, E>>,
    ) -> Result<()>
    where
        D: DevicePort + 'static,
        E: EventSink + 'static,
    {
        for pfd in &mut self.pollfds {
            pfd.revents = 0;
        }
        // SAFETY: `pollfds` is a live array of `len` entries whose
        // descriptors are owned by `self.inputs` for the whole call.
        let ready = unsafe {
            libc::poll(
                self.pollfds.as_mut_ptr(),
                self.pollfds.len() as libc::nfds_t,
                POLL_TIMEOUT_MS,
            )
        };
        if ready == -1 {
            return Err(Error::Poll(io::Error::last_os_error()));
        }

        if ready > 0 {
            for slot in 0..self.pollfds.len() {
                let revents = self.pollfds[slot].revents;
                if revents != 0 {
                    self.dispatch(self.sources[slot], revents, service, sched);
                }
            }
        }

        sched.update(service);
        Ok(())
    }

    fn dispatch<D, E>(
        &mut self,
        source: Source,
        revents: libc::c_short,
        service: &mut RelayService<D, E>,
        sched: &mut TaskScheduler<RelayService<D, E>>,
    ) where
        D: DevicePort + 'static,
        E: EventSink + 'static,
    {
        let Some(file) = source.file(&mut self.inputs) else {
            return;
        };

        if let Source::Button(button) = source {
            if revents & libc::POLLPRI == 0 {
                return;
            }
            match read_byte(file) {
                Ok(value) => match ButtonEdge::from_value(value) {
                    Some(edge) => service.button_edge(sched, button, edge),
                    None => debug!("button {}: unexpected value {:#04x}", button, value),
                },
                Err(e) => debug!("button {}: read failed: {}", button, e),
            }
            return;
        }

        if revents & libc::POLLIN == 0 {
            return;
        }
        self.batch.clear();
        let batch = &mut self.batch;
        drain_input_events(file, |event| batch.push(event));

        match source {
            Source::Screen => service.screen_input(sched, &self.batch),
            Source::Proximity => service.proximity_input(sched, &self.batch),
            Source::AmbientLight | Source::AmbientLightIr => service.ambient_light_input(&self.batch),
            Source::Button(_) => {}
        }
    }
}
