use chrono::{DateTime, Utc};
use jyutcard_core::{repo::CardRepository, CardId, CoreError, Proficiency, ReviewUpdate, VocabCard};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        info!(path = %path.as_ref().display(), "sqlite store opened");
        Ok(repo)
    }

    /// Every pooled connection to `sqlite::memory:` is its own database, so
    /// the pool is pinned to one connection.
    pub async fn open_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS vocab_cards (
          id                 TEXT PRIMARY KEY,
          english            TEXT NOT NULL,
          cantonese          TEXT NOT NULL,
          jyutping           TEXT NOT NULL,
          proficiency_level  INTEGER NOT NULL DEFAULT 1,
          next_review_time   TEXT NOT NULL,
          created_at         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_vocab_cards_created ON vocab_cards (created_at);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("sqlite schema"))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CardRepository for SqliteRepo {
    async fn fetch_all(&self) -> Result<Vec<VocabCard>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,english,cantonese,jyutping,proficiency_level,next_review_time,created_at
               FROM vocab_cards ORDER BY created_at ASC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("list cards"))?;
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_card(row)?);
        }
        debug!(cards = v.len(), "sqlite snapshot read");
        Ok(v)
    }

    async fn persist(&self, update: &ReviewUpdate) -> Result<(), CoreError> {
        let res = sqlx::query(
            "UPDATE vocab_cards SET proficiency_level=?, next_review_time=? WHERE id=?",
        )
        .bind(i64::from(update.proficiency_level))
        .bind(dt_to_str(update.next_review_time))
        .bind(update.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }

    async fn insert_card(&self, card: &VocabCard) -> Result<VocabCard, CoreError> {
        let exists = sqlx::query("SELECT 1 FROM vocab_cards WHERE id=? LIMIT 1")
            .bind(card.id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?
            .is_some();
        if exists {
            return Err(CoreError::Conflict("card id already exists"));
        }

        sqlx::query(
            r#"
            INSERT INTO vocab_cards (
              id, english, cantonese, jyutping, proficiency_level, next_review_time, created_at
            )
            VALUES (?,?,?,?,?,?,?)
            "#,
        )
        .bind(card.id.to_string())
        .bind(&card.english)
        .bind(&card.cantonese)
        .bind(&card.jyutping)
        .bind(i64::from(card.proficiency_level))
        .bind(dt_to_str(card.next_review_time))
        .bind(dt_to_str(card.created_at))
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert card"))?;

        Ok(card.clone())
    }

    async fn get_card(&self, id: CardId) -> Result<VocabCard, CoreError> {
        let row = sqlx::query(
            r#"SELECT id,english,cantonese,jyutping,proficiency_level,next_review_time,created_at
               FROM vocab_cards WHERE id=?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("read card"))?;
        let row = row.ok_or(CoreError::NotFound("card"))?;
        row_into_card(row)
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        let res = sqlx::query("DELETE FROM vocab_cards WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("del card"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("card"));
        }
        Ok(())
    }
}

// ===== Helpers =====
fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Invalid("uuid"))
}

fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Invalid("datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_into_card(row: sqlx::sqlite::SqliteRow) -> Result<VocabCard, CoreError> {
    Ok(VocabCard {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        english: row.get::<String, _>("english"),
        cantonese: row.get::<String, _>("cantonese"),
        jyutping: row.get::<String, _>("jyutping"),
        proficiency_level: Proficiency::clamped(row.get::<i64, _>("proficiency_level")),
        next_review_time: dt_from_str(row.get::<String, _>("next_review_time"))?,
        created_at: dt_from_str(row.get::<String, _>("created_at"))?,
    })
}
