//! Local button → relay binding.
//!
//! Wraps any [`EventSink`]: a single click on a button whose flags carry
//! [`ButtonFlags::TOGGLE`] toggles the matching relay, whether or not a
//! broker is connected.  Every event is then forwarded unchanged.

use std::sync::Arc;

use log::debug;

use crate::app::commands::AppCommand;
use crate::app::events::AppEvent;
use crate::app::ports::{CommandPort, EventSink};
use crate::config::ButtonFlags;

pub struct ButtonBinding<E> {
    flags: [ButtonFlags; 2],
    commands: Arc<dyn CommandPort>,
    inner: E,
}

impl<E: EventSink> ButtonBinding<E> {
    pub fn new(flags: [ButtonFlags; 2], commands: Arc<dyn CommandPort>, inner: E) -> Self {
        Self {
            flags,
            commands,
            inner,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }
}

impl<E: EventSink> EventSink for ButtonBinding<E> {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::ButtonClicked { button, clicks: 1 } = *event {
            if self.flags.get(button).is_some_and(|f| f.contains(ButtonFlags::TOGGLE)) {
                debug!("button {} bound: toggling relay {}", button, button);
                self.commands.send(AppCommand::ToggleRelay(button));
            }
        }
        self.inner.emit(event);
    }
}
