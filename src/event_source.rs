use anyhow::Result;
pub use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;
use std::time::Duration;

/// Where the run loop gets its input from: the terminal, or a scripted queue
/// in tests.
pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    fn read(&mut self) -> Result<Event>;

    /// True once the source will never produce another event
    fn is_exhausted(&self) -> bool {
        false
    }
}

pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Scripted key presses, replayed in order.
///
/// Reading past the end yields Ctrl-c so a loop that ignores `poll` still
/// terminates.
pub struct SimulatedEventSource {
    queue: VecDeque<Event>,
}

impl SimulatedEventSource {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    pub fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    pub fn key(code: KeyCode) -> Event {
        Self::press(code, KeyModifiers::empty())
    }

    pub fn char(c: char) -> Event {
        Self::key(KeyCode::Char(c))
    }

    pub fn ctrl(c: char) -> Event {
        Self::press(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(!self.queue.is_empty())
    }

    fn read(&mut self) -> Result<Event> {
        Ok(self.queue.pop_front().unwrap_or_else(|| Self::ctrl('c')))
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(event: Event) -> Option<(KeyCode, KeyModifiers)> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some((key.code, key.modifiers)),
            _ => None,
        }
    }

    #[test]
    fn replays_in_order_then_reports_exhaustion() {
        let mut source = SimulatedEventSource::new([
            SimulatedEventSource::key(KeyCode::Tab),
            SimulatedEventSource::char('x'),
        ]);

        assert!(source.poll(Duration::ZERO).unwrap());
        assert_eq!(
            code_of(source.read().unwrap()),
            Some((KeyCode::Tab, KeyModifiers::empty()))
        );
        assert_eq!(
            code_of(source.read().unwrap()),
            Some((KeyCode::Char('x'), KeyModifiers::empty()))
        );

        assert!(source.is_exhausted());
        assert!(!source.poll(Duration::ZERO).unwrap());
    }

    #[test]
    fn reading_past_the_end_quits() {
        let mut source = SimulatedEventSource::new(Vec::new());
        assert_eq!(
            code_of(source.read().unwrap()),
            Some((KeyCode::Char('c'), KeyModifiers::CONTROL))
        );
    }
}
