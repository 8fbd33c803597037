use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use crate::errors::StudyError;
use crate::log_db_operation;
use crate::models::*;

/// Persistence contract for study sessions, flashcards and study records.
///
/// Deleting a session removes its flashcards and study records; deleting a
/// flashcard removes its study records.
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Insert a session and all of its flashcards in one transaction
    async fn create_session_with_flashcards(
        &self,
        cards: &[GeneratedFlashcard],
    ) -> Result<(StudySession, Vec<Flashcard>), StudyError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<StudySession>, StudyError>;

    async fn delete_session(&self, id: Uuid) -> Result<bool, StudyError>;

    async fn list_flashcards(&self, session_id: Uuid) -> Result<Vec<Flashcard>, StudyError>;

    async fn get_flashcard(&self, id: Uuid) -> Result<Option<Flashcard>, StudyError>;

    async fn delete_flashcard(&self, id: Uuid) -> Result<bool, StudyError>;

    /// Never-studied cards first, then highest mean knowledge level, ties at random
    async fn next_flashcard(&self, session_id: Uuid) -> Result<Option<Flashcard>, StudyError>;

    async fn create_study(
        &self,
        flashcard: &Flashcard,
        knowledge_level: KnowledgeLevel,
    ) -> Result<FlashcardStudy, StudyError>;

    async fn list_studies(&self, flashcard_id: Uuid) -> Result<Vec<FlashcardStudy>, StudyError>;

    async fn session_progress(&self, session_id: Uuid) -> Result<Vec<FlashcardProgress>, StudyError>;
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, StudyError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database would otherwise see its own empty schema
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migration", "database schema ready");
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), StudyError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS study_sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                study_session_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flashcard_studies (
                id TEXT PRIMARY KEY,
                flashcard_id TEXT NOT NULL,
                study_session_id TEXT NOT NULL,
                knowledge_level INTEGER NOT NULL CHECK (knowledge_level BETWEEN 1 AND 3),
                studied_at TEXT NOT NULL,
                FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE,
                FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_flashcards_session ON flashcards(study_session_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_flashcard_studies_flashcard ON flashcard_studies(flashcard_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_session(row: &SqliteRow) -> Result<StudySession, StudyError> {
        Ok(StudySession {
            id: parse_uuid(row.try_get("id")?)?,
            created_at: parse_timestamp(row.try_get("created_at")?)?,
        })
    }

    fn row_to_flashcard(row: &SqliteRow) -> Result<Flashcard, StudyError> {
        Ok(Flashcard {
            id: parse_uuid(row.try_get("id")?)?,
            study_session_id: parse_uuid(row.try_get("study_session_id")?)?,
            position: row.try_get("position")?,
            question: row.try_get("question")?,
            answer: row.try_get("answer")?,
        })
    }

    fn row_to_study(row: &SqliteRow) -> Result<FlashcardStudy, StudyError> {
        Ok(FlashcardStudy {
            id: parse_uuid(row.try_get("id")?)?,
            flashcard_id: parse_uuid(row.try_get("flashcard_id")?)?,
            study_session_id: parse_uuid(row.try_get("study_session_id")?)?,
            knowledge_level: KnowledgeLevel::try_from(row.try_get::<i64, _>("knowledge_level")?)?,
            studied_at: parse_timestamp(row.try_get("studied_at")?)?,
        })
    }
}

fn parse_uuid(value: String) -> Result<Uuid, StudyError> {
    Uuid::parse_str(&value).map_err(StudyError::decode)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically
fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, StudyError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(StudyError::decode)
}

#[async_trait]
impl StudyStore for Database {
    async fn create_session_with_flashcards(
        &self,
        cards: &[GeneratedFlashcard],
    ) -> Result<(StudySession, Vec<Flashcard>), StudyError> {
        let started = Instant::now();
        let session = StudySession {
            id: Uuid::new_v4(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO study_sessions (id, created_at) VALUES (?1, ?2)")
            .bind(session.id.to_string())
            .bind(format_timestamp(&session.created_at))
            .execute(&mut *tx)
            .await?;

        let mut flashcards = Vec::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            let flashcard = Flashcard {
                id: Uuid::new_v4(),
                study_session_id: session.id,
                position: position as i64,
                question: card.question.clone(),
                answer: card.answer.clone(),
            };

            sqlx::query(
                r#"
                INSERT INTO flashcards (id, study_session_id, position, question, answer)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(flashcard.id.to_string())
            .bind(flashcard.study_session_id.to_string())
            .bind(flashcard.position)
            .bind(&flashcard.question)
            .bind(&flashcard.answer)
            .execute(&mut *tx)
            .await?;

            flashcards.push(flashcard);
        }

        tx.commit().await?;

        log_db_operation!(
            debug,
            "create_session_with_flashcards",
            session_id = session.id,
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok((session, flashcards))
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<StudySession>, StudyError> {
        let row = sqlx::query("SELECT id, created_at FROM study_sessions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, StudyError> {
        let result = sqlx::query("DELETE FROM study_sessions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_flashcards(&self, session_id: Uuid) -> Result<Vec<Flashcard>, StudyError> {
        let started = Instant::now();
        let rows = sqlx::query(
            r#"
            SELECT id, study_session_id, position, question, answer
            FROM flashcards
            WHERE study_session_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let flashcards = rows
            .iter()
            .map(Self::row_to_flashcard)
            .collect::<Result<Vec<_>, _>>()?;

        log_db_operation!(
            debug,
            "list_flashcards",
            count = flashcards.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(flashcards)
    }

    async fn get_flashcard(&self, id: Uuid) -> Result<Option<Flashcard>, StudyError> {
        let row = sqlx::query(
            "SELECT id, study_session_id, position, question, answer FROM flashcards WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_flashcard).transpose()
    }

    async fn delete_flashcard(&self, id: Uuid) -> Result<bool, StudyError> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn next_flashcard(&self, session_id: Uuid) -> Result<Option<Flashcard>, StudyError> {
        let started = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT f.id, f.study_session_id, f.position, f.question, f.answer
            FROM flashcards f
            LEFT JOIN flashcard_studies s ON s.flashcard_id = f.id
            WHERE f.study_session_id = ?1
            GROUP BY f.id
            ORDER BY (AVG(s.knowledge_level) IS NULL) DESC,
                     AVG(s.knowledge_level) DESC,
                     RANDOM()
            LIMIT 1
            "#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        log_db_operation!(
            debug,
            "next_flashcard",
            session_id = session_id,
            duration_ms = started.elapsed().as_millis() as u64
        );

        row.as_ref().map(Self::row_to_flashcard).transpose()
    }

    async fn create_study(
        &self,
        flashcard: &Flashcard,
        knowledge_level: KnowledgeLevel,
    ) -> Result<FlashcardStudy, StudyError> {
        let study = FlashcardStudy {
            id: Uuid::new_v4(),
            flashcard_id: flashcard.id,
            study_session_id: flashcard.study_session_id,
            knowledge_level,
            studied_at: Utc::now().trunc_subsecs(6),
        };

        sqlx::query(
            r#"
            INSERT INTO flashcard_studies (id, flashcard_id, study_session_id, knowledge_level, studied_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(study.id.to_string())
        .bind(study.flashcard_id.to_string())
        .bind(study.study_session_id.to_string())
        .bind(study.knowledge_level.as_i64())
        .bind(format_timestamp(&study.studied_at))
        .execute(&self.pool)
        .await?;

        Ok(study)
    }

    async fn list_studies(&self, flashcard_id: Uuid) -> Result<Vec<FlashcardStudy>, StudyError> {
        let rows = sqlx::query(
            r#"
            SELECT id, flashcard_id, study_session_id, knowledge_level, studied_at
            FROM flashcard_studies
            WHERE flashcard_id = ?1
            ORDER BY studied_at ASC, rowid ASC
            "#,
        )
        .bind(flashcard_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_study).collect()
    }

    async fn session_progress(&self, session_id: Uuid) -> Result<Vec<FlashcardProgress>, StudyError> {
        let rows = sqlx::query(
            r#"
            SELECT f.id AS flashcard_id,
                   f.question AS question,
                   COUNT(s.id) AS study_count,
                   AVG(s.knowledge_level) AS average_level,
                   MAX(s.studied_at) AS last_studied_at
            FROM flashcards f
            LEFT JOIN flashcard_studies s ON s.flashcard_id = f.id
            WHERE f.study_session_id = ?1
            GROUP BY f.id
            ORDER BY f.position ASC
            "#,
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<FlashcardProgress, StudyError> {
                Ok(FlashcardProgress {
                    flashcard_id: parse_uuid(row.try_get("flashcard_id")?)?,
                    question: row.try_get("question")?,
                    study_count: row.try_get("study_count")?,
                    average_knowledge_level: row.try_get("average_level")?,
                    last_studied_at: row
                        .try_get::<Option<String>, _>("last_studied_at")?
                        .map(parse_timestamp)
                        .transpose()?,
                })
            })
            .collect()
    }
}
