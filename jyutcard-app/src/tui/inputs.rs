use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Reveal,
    Difficult,
    Same,
    Easy,
    Skip,
    Refresh,
    None,
}

impl Action {
    /// Proficiency delta for the recall actions.
    pub fn delta(self) -> Option<i32> {
        match self {
            Action::Difficult => Some(-1),
            Action::Same => Some(0),
            Action::Easy => Some(1),
            _ => None,
        }
    }
}

pub fn map_event(ev: Event) -> Action {
    if let Event::Key(KeyEvent {
        code,
        modifiers,
        kind,
        ..
    }) = ev
    {
        if kind == KeyEventKind::Release {
            return Action::None;
        }
        match (code, modifiers) {
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Action::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            (KeyCode::Char(' '), _) | (KeyCode::Enter, _) => Action::Reveal,
            (KeyCode::Char('1'), _) | (KeyCode::Char('d'), _) => Action::Difficult,
            (KeyCode::Char('2'), _) => Action::Same,
            (KeyCode::Char('3'), _) | (KeyCode::Char('e'), _) => Action::Easy,
            (KeyCode::Char('s'), KeyModifiers::NONE) => Action::Skip,
            (KeyCode::Char('r'), _) => Action::Refresh,
            _ => Action::None,
        }
    } else {
        Action::None
    }
}
