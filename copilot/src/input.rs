//! Discrete UI input commands.
//!
//! The perception layer decides *what* to press; the physical key binding
//! layer (an external collaborator) decides which keyboard events that maps
//! to. Everything here is therefore a small command vocabulary behind a
//! trait, which also makes the scripted scenario tests trivial.

/// Named UI commands the perception layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    /// Shift focus into the cockpit panel cluster (held while choosing a
    /// panel direction).
    FocusPanels,
    /// Cycle to the next tab of the open panel.
    CyclePanel,
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    /// Reset head-look before panel work so captures match calibration.
    HeadLookReset,
}

pub trait InputSink {
    /// Press and release once.
    fn tap(&mut self, cmd: UiCommand);

    fn tap_repeat(&mut self, cmd: UiCommand, count: u32) {
        for _ in 0..count {
            self.tap(cmd);
        }
    }

    /// Key-down without release; pair with [`InputSink::release`].
    fn press(&mut self, cmd: UiCommand);

    fn release(&mut self, cmd: UiCommand);

    /// Press, hold for `secs`, release.
    fn hold(&mut self, cmd: UiCommand, secs: f32) {
        self.press(cmd);
        std::thread::sleep(std::time::Duration::from_secs_f32(secs));
        self.release(cmd);
    }
}

/// One recorded input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Tap(UiCommand),
    Press(UiCommand),
    Release(UiCommand),
}

/// Sink that records instead of acting. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<InputEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn taps_of(&self, cmd: UiCommand) -> usize {
        self.events
            .iter()
            .filter(|e| **e == InputEvent::Tap(cmd))
            .count()
    }
}

impl InputSink for RecordingSink {
    fn tap(&mut self, cmd: UiCommand) {
        self.events.push(InputEvent::Tap(cmd));
    }

    fn press(&mut self, cmd: UiCommand) {
        self.events.push(InputEvent::Press(cmd));
    }

    fn release(&mut self, cmd: UiCommand) {
        self.events.push(InputEvent::Release(cmd));
    }

    fn hold(&mut self, cmd: UiCommand, _secs: f32) {
        // No real time passes in recordings.
        self.press(cmd);
        self.release(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_taps_expand() {
        let mut sink = RecordingSink::new();
        sink.tap_repeat(UiCommand::CyclePanel, 3);
        assert_eq!(sink.taps_of(UiCommand::CyclePanel), 3);
    }

    #[test]
    fn hold_records_press_and_release() {
        let mut sink = RecordingSink::new();
        sink.hold(UiCommand::Up, 2.0);
        assert_eq!(
            sink.events,
            vec![InputEvent::Press(UiCommand::Up), InputEvent::Release(UiCommand::Up)]
        );
    }
}
