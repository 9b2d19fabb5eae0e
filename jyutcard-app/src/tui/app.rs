use crate::tui::{
    inputs::{map_event, Action},
    views,
};
use chrono::Utc;
use crossterm::{
    event::{self},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use jyutcard_core::{
    summarize, CardRepository, ReviewSession, ReviewUpdate, Scheduler, SessionError, StatsSummary,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{stdout, Stdout};
use std::sync::Arc;
use tokio::runtime::Runtime;

pub struct TuiApp {
    pub repo: Arc<dyn CardRepository>,
    pub rt: Arc<Runtime>,
    session: ReviewSession,
    summary: StatsSummary,
    reveal: bool,
    status: Option<String>,
    // A review the repository refused; `r` writes it again before refreshing.
    unsaved: Option<ReviewUpdate>,
}

impl TuiApp {
    pub fn new(repo: Arc<dyn CardRepository>, scheduler: Scheduler, rt: Arc<Runtime>) -> Self {
        let session = ReviewSession::new(repo.clone(), scheduler);
        Self {
            repo,
            rt,
            session,
            summary: StatsSummary::default(),
            reveal: false,
            status: None,
            unsaved: None,
        }
    }

    fn refresh(&mut self) {
        let now = Utc::now();
        self.reveal = false;
        self.rt.block_on(self.session.refresh(now));
        if let Ok(cards) = self.rt.block_on(self.repo.fetch_all()) {
            self.summary = summarize(&cards, now);
        }
    }

    fn retry_unsaved(&mut self) {
        let Some(update) = self.unsaved.take() else {
            return;
        };
        match self.rt.block_on(self.session.retry(update)) {
            Ok(_) => self.status = Some("saved".into()),
            Err(SessionError::NotSaved { update, source }) => {
                self.status = Some(format!("still not saved: {source}"));
                self.unsaved = Some(update);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn review(&mut self, delta: i32) {
        match self.rt.block_on(self.session.review(delta, Utc::now())) {
            Ok(Some(u)) => {
                self.status = Some(format!("level {}", u.proficiency_level));
                self.refresh();
            }
            Ok(None) => {}
            Err(SessionError::NotSaved { update, .. }) => {
                self.status = Some("review not saved, press r to retry".into());
                self.unsaved = Some(update);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.refresh();

        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.mainloop(&mut terminal);

        disable_raw_mode().ok();
        let mut out: Stdout = std::io::stdout();
        execute!(out, LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();

        res
    }

    fn mainloop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
        loop {
            terminal.draw(|f| {
                views::draw_ui(
                    f,
                    f.size(),
                    &self.summary,
                    self.session.state(),
                    self.reveal,
                    self.status.as_deref(),
                );
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                let action = map_event(event::read()?);
                match action {
                    Action::Quit => break,
                    Action::Reveal => {
                        if self.session.state().current().is_some() {
                            self.reveal = !self.reveal;
                        }
                    }
                    Action::Skip => {
                        self.session.skip();
                        self.reveal = false;
                    }
                    Action::Refresh => {
                        self.retry_unsaved();
                        self.refresh();
                    }
                    Action::Difficult | Action::Same | Action::Easy => {
                        // Grading before the answer is shown is ignored.
                        if let (Some(delta), true) = (action.delta(), self.reveal) {
                            self.review(delta);
                        }
                    }
                    Action::None => {}
                }
            }
        }
        Ok(())
    }
}
