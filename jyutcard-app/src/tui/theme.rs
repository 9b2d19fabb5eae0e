use ratatui::style::Stylize;
use ratatui::style::{Color, Style};

pub fn title_style() -> Style { Style::default().fg(Color::Cyan).bold() }
pub fn hint_style() -> Style { Style::default().fg(Color::DarkGray) }
pub fn answer_style() -> Style { Style::default().fg(Color::Yellow).bold() }
pub fn error_style() -> Style { Style::default().fg(Color::Red).bold() }
pub fn footer_style() -> Style { Style::default().fg(Color::Gray) }
