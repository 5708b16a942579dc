use std::time::Duration;
use tracing::trace;

use crate::domain::{DirConfig, DirError, Message, SortKey};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DirConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to `event_poll_time` ms for a terminal event and maps it to a message.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DirError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('s'), _) => Some(Message::CycleSort),
            (KeyCode::Char('0'), _) => Some(Message::SetSort(SortKey::None)),
            (KeyCode::Char('1'), _) => Some(Message::SetSort(SortKey::Name)),
            (KeyCode::Char('2'), _) => Some(Message::SetSort(SortKey::Industry)),
            (KeyCode::Right | KeyCode::PageDown, _)
            | (KeyCode::Char('l') | KeyCode::Char('n'), _) => Some(Message::NextPage),
            (KeyCode::Left | KeyCode::PageUp, _)
            | (KeyCode::Char('h') | KeyCode::Char('p'), _) => Some(Message::PreviousPage),
            (KeyCode::Char('y'), _) => Some(Message::CopyPage),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
