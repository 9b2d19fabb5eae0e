use crate::tui::theme::*;
use chrono::{DateTime, Local, Utc};
use jyutcard_core::{ReviewState, StatsSummary};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn draw_ui(
    f: &mut Frame,
    area: Rect,
    summary: &StatsSummary,
    state: &ReviewState,
    reveal: bool,
    status: Option<&str>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(area);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);
    draw_summary(f, chunks[0], summary);
    draw_review(f, chunks[1], state, reveal, summary.next_due_at);

    let mut spans = vec![
        Span::raw(" space reveal  "),
        Span::raw(" 1 difficult  2 same  3 easy  "),
        Span::raw(" s skip  "),
        Span::raw(" r refresh  "),
        Span::raw(" q quit "),
    ];
    if let Some(msg) = status {
        spans.push(Span::raw(format!("  | {msg}")).style(hint_style()));
    }
    let foot = Paragraph::new(Line::from(spans))
        .style(footer_style())
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(foot, rows[1]);
}

fn draw_summary(f: &mut Frame, area: Rect, s: &StatsSummary) {
    let mut lines = vec![
        Line::from(vec![Span::raw("Cards ").style(title_style()), Span::raw(s.total.to_string())]),
        Line::from(vec![Span::raw("Due   ").style(title_style()), Span::raw(s.due.to_string())]),
        Line::from(""),
    ];
    for (i, n) in s.per_level.iter().enumerate() {
        lines.push(Line::from(format!("level {}  {:>4}  {}", i + 1, n, bar(*n, s.total))));
    }
    let p = Paragraph::new(lines).block(Block::default().title("Deck").borders(Borders::ALL));
    f.render_widget(p, area);
}

fn bar(n: u32, total: u32) -> String {
    if total == 0 {
        return String::new();
    }
    "#".repeat(((n as f32 / total as f32) * 12.0).round() as usize)
}

fn draw_review(
    f: &mut Frame,
    area: Rect,
    state: &ReviewState,
    reveal: bool,
    next_due: Option<DateTime<Utc>>,
) {
    let block = Block::default().title("Review").borders(Borders::ALL);
    let text: Vec<Line> = match state {
        ReviewState::Loading => vec![Line::from("Loading…").style(hint_style())],
        ReviewState::Empty => {
            let mut v = vec![Line::from("All caught up!").style(title_style())];
            if let Some(t) = next_due {
                v.push(Line::from(format!(
                    "Next card due at {}.",
                    t.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                )));
            }
            v
        }
        ReviewState::Error(reason) => vec![
            Line::from("Something went wrong").style(error_style()),
            Line::from(reason.as_str()),
            Line::from(""),
            Line::from("Press r to try again.").style(hint_style()),
        ],
        ReviewState::Ready { .. } => {
            let Some(card) = state.current() else {
                return;
            };
            let (pos, len) = state.position().unwrap_or((1, 1));
            let mut v = vec![
                Line::from(format!("{pos}/{len} due · level {}", card.proficiency_level))
                    .style(hint_style()),
                Line::from(""),
                Line::from(vec![Span::raw("EN: ").style(title_style()), Span::raw(&card.english)]),
                Line::from(""),
            ];
            if reveal {
                v.push(Line::from(vec![
                    Span::raw("粵: ").style(title_style()),
                    Span::raw(&card.cantonese).style(answer_style()),
                ]));
                v.push(Line::from(vec![
                    Span::raw("    ").style(hint_style()),
                    Span::raw(&card.jyutping),
                ]));
            } else {
                v.push(Line::from("(space to reveal)").style(hint_style()));
            }
            v
        }
    };
    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}
