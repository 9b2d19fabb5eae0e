use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::cli::transfer::{reissue, CsvRow, ExportBundle, BUNDLE_VERSION};
use crate::settings::AppConfig;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use jyutcard_core::{
    filter_by_proficiency, filter_by_text, load_due_queue, memory::MemoryRepo, next_due_after, summarize, CardRepository,
    Proficiency, ReviewSession, ReviewState, Scheduler, SessionError, VocabCard,
};
use jyutcard_json::paths::data_root;
use jyutcard_json::JsonStore;
use jyutcard_sqlite::SqliteRepo;
use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub async fn run_cli(args: Cli, cfg: AppConfig) -> Result<()> {
    let repo = open_repo(&cfg).await?;
    let scheduler = cfg.scheduler();
    match args.cmd {
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api
                .addr
                .unwrap_or_else(|| cfg.api.addr.clone())
                .parse()
                .context("invalid bind address")?;
            api_server::run(repo, scheduler, addr).await
        }
        Command::Card(cmd) => card_cmd(repo, cmd).await,
        Command::Due(cmd) => due_cmd(repo, &scheduler, cmd).await,
        Command::Review(cmd) => {
            let mut input = BufReader::new(stdin());
            review_cmd(repo, scheduler, cmd, &mut input).await.map(|_| ())
        }
        Command::Stats => stats_cmd(repo).await,
        Command::Export(cmd) => export_cmd(repo, cmd).await,
        Command::Import(cmd) => import_cmd(repo, cmd).await,
        // main runs the TUI on its own runtime
        Command::Tui => bail!("the tui is started from main"),
    }
}

pub async fn open_repo(cfg: &AppConfig) -> Result<Arc<dyn CardRepository>> {
    match cfg.store {
        StoreKind::Json => {
            let (file, backups) = jyutcard_json::paths::default_store_file();
            let s = JsonStore::open_with(file, backups, cfg.json.max_backups).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = cfg
                .db_path
                .clone()
                .unwrap_or_else(|| data_root().join("jyutcard.sqlite3"));
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let s = SqliteRepo::open_file(&p).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Memory => {
            info!("using in-memory store; nothing will be saved");
            Ok(Arc::new(MemoryRepo::new()))
        }
    }
}

async fn card_cmd(repo: Arc<dyn CardRepository>, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let mut card = VocabCard::new(a.english, a.cantonese, a.jyutping);
            card.proficiency_level = Proficiency::clamped(a.proficiency);
            let c = repo.insert_card(&card).await?;
            println!("{}", c.id);
        }
        CardCmd::List { query, level } => {
            let mut cards = repo.fetch_all().await?;
            if let Some(q) = query {
                cards = filter_by_text(&cards, &q);
            }
            if let Some(l) = level {
                cards = filter_by_proficiency(&cards, Proficiency::clamped(l));
            }
            for c in cards {
                println!(
                    "{}\t{}\t{}\t{}\tlevel={}\tnext={}",
                    c.id,
                    c.english,
                    c.cantonese,
                    c.jyutping,
                    c.proficiency_level,
                    c.next_review_time.to_rfc3339()
                );
            }
        }
        CardCmd::Rm { card_id } => {
            let id = parse_uuid(&card_id)?;
            repo.delete_card(id).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn due_cmd(repo: Arc<dyn CardRepository>, scheduler: &Scheduler, cmd: DueCmd) -> Result<()> {
    let now = match cmd.at {
        Some(s) => parse_instant(&s)?,
        None => Utc::now(),
    };
    let queue = load_due_queue(&*repo, scheduler, now).await?;
    if queue.is_empty() {
        print_caught_up(&*repo, now).await;
        return Ok(());
    }
    for (i, c) in queue.iter().enumerate() {
        println!(
            "{}\t{}\t{}\t{}\tlevel={}\tdue={}",
            i + 1,
            c.id,
            c.english,
            c.cantonese,
            c.proficiency_level,
            c.next_review_time.to_rfc3339()
        );
    }
    Ok(())
}

/// Interactive review over `input`. Ends on `q`, at `max` reviews, when
/// nothing is due, or when `input` is closed. Returns the number of reviews.
async fn review_cmd<R: BufRead>(
    repo: Arc<dyn CardRepository>,
    scheduler: Scheduler,
    cmd: ReviewCmd,
    input: &mut R,
) -> Result<usize> {
    let mut session = ReviewSession::new(repo.clone(), scheduler);
    let mut count = 0usize;

    'refresh: while count < cmd.max {
        match session.refresh(Utc::now()).await {
            ReviewState::Empty => {
                print_caught_up(&*repo, Utc::now()).await;
                break;
            }
            ReviewState::Error(reason) => bail!("{reason}"),
            _ => {}
        }

        // Skips move within this queue; a review always goes back to the repository.
        loop {
            let Some(card) = session.state().current().cloned() else {
                continue 'refresh;
            };
            let (pos, len) = session.state().position().unwrap_or((1, 1));
            println!("\n[{pos}/{len} due] {}", card.english);
            if read_line(input, "[enter=show]")?.is_none() {
                return Ok(finish(count));
            }
            println!("{}  ({})", card.cantonese, card.jyutping);
            println!("[1=Difficult, 2=Same, 3=Easy, s=skip, q=quit]");
            let delta = loop {
                let Some(line) = read_line(input, "recall> ")? else {
                    return Ok(finish(count));
                };
                match line.trim().to_lowercase().as_str() {
                    "s" | "skip" => break None,
                    "q" | "quit" => return Ok(finish(count)),
                    other => match other.parse::<jyutcard_core::Recall>() {
                        Ok(r) => break Some(r.delta()),
                        Err(_) => println!("enter 1/2/3, s, or q"),
                    },
                }
            };

            let Some(delta) = delta else {
                session.skip();
                continue;
            };

            match session.review(delta, Utc::now()).await {
                Ok(Some(u)) => {
                    count += 1;
                    println!(
                        "→ level {}, next review {}",
                        u.proficiency_level,
                        u.next_review_time.with_timezone(&chrono::Local).format("%H:%M")
                    );
                }
                Ok(None) => {}
                Err(SessionError::NotSaved { update, source }) => {
                    println!("review not saved: {source}");
                    let again = read_line(input, "retry? [y/N] ")?.unwrap_or_default();
                    if !again.trim().eq_ignore_ascii_case("y") {
                        bail!("review not saved for card {}", update.id);
                    }
                    session.retry(update).await?;
                    count += 1;
                }
                Err(e) => return Err(e.into()),
            }
            continue 'refresh;
        }
    }

    Ok(finish(count))
}

fn finish(count: usize) -> usize {
    println!("\nreviewed {count}");
    count
}

async fn stats_cmd(repo: Arc<dyn CardRepository>) -> Result<()> {
    let cards = repo.fetch_all().await?;
    let s = summarize(&cards, Utc::now());
    println!("cards:  {}", s.total);
    println!("due:    {}", s.due);
    println!("mean:   {:.2}", s.mean_proficiency());
    for (i, n) in s.per_level.iter().enumerate() {
        println!("level {}: {}", i + 1, n);
    }
    if let Some(t) = s.next_due_at {
        println!("next:   {}", t.to_rfc3339());
    }
    Ok(())
}

async fn export_cmd(repo: Arc<dyn CardRepository>, cmd: ExportCmd) -> Result<()> {
    let cards = repo.fetch_all().await?;
    match cmd {
        ExportCmd::Json { path } => {
            let bundle = ExportBundle { version: BUNDLE_VERSION, cards };
            let s = serde_json::to_string_pretty(&bundle)?;
            std::fs::write(&path, s)?;
            println!("wrote {}", path.display());
        }
        ExportCmd::Csv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            for c in &cards {
                wtr.serialize(CsvRow::from(c))?;
            }
            wtr.flush()?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn import_cmd(repo: Arc<dyn CardRepository>, cmd: ImportCmd) -> Result<()> {
    let mut n = 0usize;
    match cmd {
        ImportCmd::Json { path } => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let bundle: ExportBundle = serde_json::from_str(&data)?;
            if bundle.version > BUNDLE_VERSION {
                bail!("unsupported bundle version {}", bundle.version);
            }
            for c in bundle.cards {
                repo.insert_card(&reissue(c)).await?;
                n += 1;
            }
        }
        ImportCmd::Csv { path } => {
            let mut rdr = csv::Reader::from_path(&path)?;
            for row in rdr.deserialize::<CsvRow>() {
                repo.insert_card(&row?.into_card()).await?;
                n += 1;
            }
        }
    }
    println!("imported {n}");
    Ok(())
}

// ===== Helpers =====
fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| anyhow!("invalid uuid"))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| anyhow!("invalid instant (expected RFC 3339): {s}"))
}

async fn print_caught_up<R: CardRepository + ?Sized>(repo: &R, now: DateTime<Utc>) {
    println!("all caught up");
    if let Ok(cards) = repo.fetch_all().await {
        if let Some(t) = next_due_after(&cards, now) {
            println!("next card due {}", t.to_rfc3339());
        }
    }
}

/// Print `prompt` and read one line. `None` once `input` is closed.
fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    if input.read_line(&mut s)? == 0 {
        return Ok(None);
    }
    Ok(Some(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ApiConfig, JsonConfig, SchedulerConfig};
    use chrono::Duration;

    fn one_due_card() -> (Arc<dyn CardRepository>, VocabCard) {
        let mut card = VocabCard::new("dog", "狗", "gau2");
        card.next_review_time = Utc::now() - Duration::minutes(5);
        (Arc::new(MemoryRepo::with_cards([card.clone()])), card)
    }

    #[tokio::test]
    async fn review_stops_when_input_is_closed() {
        let (repo, card) = one_due_card();
        let n = review_cmd(repo.clone(), Scheduler::default(), ReviewCmd { max: 50 }, &mut std::io::empty())
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(repo.get_card(card.id).await.unwrap(), card);
    }

    #[tokio::test]
    async fn review_stops_when_input_closes_at_recall_prompt() {
        let (repo, card) = one_due_card();
        let mut input: &[u8] = b"\nmaybe\n";
        let n = review_cmd(repo.clone(), Scheduler::default(), ReviewCmd { max: 50 }, &mut input)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(repo.get_card(card.id).await.unwrap(), card);
    }

    #[tokio::test]
    async fn review_applies_recall_then_finds_nothing_due() {
        let (repo, card) = one_due_card();
        let before = Utc::now();
        let mut input: &[u8] = b"\n3\n";
        let n = review_cmd(repo.clone(), Scheduler::default(), ReviewCmd { max: 50 }, &mut input)
            .await
            .unwrap();
        assert_eq!(n, 1);
        let got = repo.get_card(card.id).await.unwrap();
        assert_eq!(got.proficiency_level.get(), 2);
        assert!(got.next_review_time >= before + Duration::minutes(90));
    }

    #[tokio::test]
    async fn sqlite_dir_error_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let cfg = AppConfig {
            store: StoreKind::Sqlite,
            db_path: Some(blocker.join("cards.sqlite3")),
            json: JsonConfig { max_backups: 1 },
            scheduler: SchedulerConfig { review_interval_minutes: 90 },
            api: ApiConfig { addr: "127.0.0.1:0".into() },
        };
        let err = match open_repo(&cfg).await {
            Ok(_) => panic!("opened a store under a plain file"),
            Err(e) => e,
        };
        assert!(err.to_string().starts_with("creating"), "{err:#}");
    }
}
