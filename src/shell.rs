use std::sync::Arc;
use std::time::Duration;

use crate::binding::{Label, ValueObserverBinding};
use crate::config::Settings;
use crate::dispatcher::MainHandle;
use crate::error::Result;
use crate::session::SessionStore;
use crate::timer_state::TimerState;

/// Layout the screen is built for. Terminals much wider than tall get the
/// side-by-side layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn for_size(width: u16, height: u16) -> Self {
        // terminal cells are roughly twice as tall as they are wide
        if u32::from(width) >= 2 * u32::from(height) {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// One instance of the elapsed-time screen.
///
/// A new `TimerScreen` is built on every configuration change (resize or a
/// manual rebuild) while the `TimerState` it shows stays in the session
/// store. Dropping the screen detaches it from the timer.
#[derive(Debug)]
pub struct TimerScreen {
    orientation: Orientation,
    generation: u64,
    period: Duration,
    binding: ValueObserverBinding,
}

impl TimerScreen {
    pub fn start(
        store: &mut SessionStore,
        main: &MainHandle,
        settings: &Settings,
        size: (u16, u16),
        generation: u64,
    ) -> Result<Self> {
        let timer: Arc<TimerState> = store.get_or_try_insert_with(|| {
            TimerState::with_clock(main.clone(), crate::clock::BootClock, settings.period)
        })?;

        let orientation = Orientation::for_size(size.0, size.1);
        let label = Label::new(settings.template.render(0));
        let binding =
            ValueObserverBinding::bind(&timer.elapsed_time(), settings.template.clone(), label);

        log::info!(
            "screen #{generation} started ({orientation}, {}x{})",
            size.0,
            size.1
        );

        Ok(Self {
            orientation,
            generation,
            period: timer.period(),
            binding,
        })
    }

    pub fn text(&self) -> String {
        self.binding.label().text()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Values this screen instance has received.
    pub fn updates(&self) -> u64 {
        self.binding.updates()
    }
}

impl Drop for TimerScreen {
    fn drop(&mut self) {
        log::info!("screen #{} torn down", self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_from_size() {
        assert_eq!(Orientation::for_size(120, 30), Orientation::Landscape);
        assert_eq!(Orientation::for_size(80, 40), Orientation::Landscape);
        assert_eq!(Orientation::for_size(60, 40), Orientation::Portrait);
        assert_eq!(Orientation::for_size(0, 0), Orientation::Landscape);
        assert_eq!(Orientation::Portrait.to_string(), "Portrait");
    }
}
