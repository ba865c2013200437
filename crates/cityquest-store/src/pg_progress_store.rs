//! `PostgreSQL` implementation of the quest catalog, progress repository and
//! like store ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use cityquest_core::error::DomainError;
use cityquest_core::repository::{
    LikeStore, LikeTransaction, ProgressFilter, ProgressRecord, ProgressRepository,
    ProgressVersion, QuestCatalog, QuestSummary,
};
use cityquest_core::status::QuestStatus;

use crate::db_error;
use crate::schema::ONE_ACTIVE_PER_USER_INDEX;

const SELECT_PROGRESS: &str = r"
SELECT id, user_id, quest_id, status, is_liked, completed_at, created_at, updated_at
FROM user_quest_progress
";

// Going below zero trips the `likes_count >= 0` check and aborts the
// transaction.
const DECREMENT_LIKES: &str = "UPDATE quests SET likes_count = likes_count - 1 WHERE id = $1";

#[derive(sqlx::FromRow)]
struct ProgressRow {
    id: Uuid,
    user_id: Uuid,
    quest_id: Uuid,
    status: String,
    is_liked: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = DomainError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<QuestStatus>().map_err(|_| {
            DomainError::Infrastructure(format!(
                "progress {} has unreadable status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            quest_id: row.quest_id,
            status,
            is_liked: row.is_liked,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    city: Option<String>,
    difficulty: Option<String>,
    duration_minutes: Option<i32>,
    distance_km: Option<f64>,
    image_url: Option<String>,
    likes_count: i64,
}

impl From<QuestRow> for QuestSummary {
    fn from(row: QuestRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            city: row.city,
            difficulty: row.difficulty,
            duration_minutes: row.duration_minutes,
            distance_km: row.distance_km,
            image_url: row.image_url,
            likes_count: row.likes_count,
        }
    }
}

fn is_active_index_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.constraint() == Some(ONE_ACTIVE_PER_USER_INDEX)
    )
}

/// PostgreSQL-backed catalog reader, snapshot store and like store.
#[derive(Debug, Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    /// Creates a new `PgProgressStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestCatalog for PgProgressStore {
    async fn find_by_id(&self, quest_id: Uuid) -> Result<Option<QuestSummary>, DomainError> {
        let row = sqlx::query_as::<_, QuestRow>(
            r"
            SELECT id, title, description, city, difficulty, duration_minutes,
                   distance_km, image_url, likes_count
            FROM quests
            WHERE id = $1
            ",
        )
        .bind(quest_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(QuestSummary::from))
    }
}

#[async_trait]
impl ProgressRepository for PgProgressStore {
    async fn find_by_user_and_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
    ) -> Result<Option<ProgressRecord>, DomainError> {
        let sql = format!("{SELECT_PROGRESS} WHERE user_id = $1 AND quest_id = $2");
        sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .bind(quest_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(ProgressRecord::try_from)
            .transpose()
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ProgressRecord>, DomainError> {
        let sql = format!("{SELECT_PROGRESS} WHERE user_id = $1 AND status = 'active'");
        sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(ProgressRecord::try_from)
            .transpose()
    }

    async fn find_by_user_with_filters(
        &self,
        user_id: Uuid,
        filter: ProgressFilter,
    ) -> Result<Vec<ProgressRecord>, DomainError> {
        let sql = format!(
            "{SELECT_PROGRESS}
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::BOOLEAN IS NULL OR is_liked = $3)
            ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .bind(filter.status.map(QuestStatus::as_str))
            .bind(filter.liked)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(ProgressRecord::try_from).collect()
    }

    async fn save(
        &self,
        record: &ProgressRecord,
        expected: Option<ProgressVersion>,
    ) -> Result<(), DomainError> {
        let query = match expected {
            None => sqlx::query(
                r"
                INSERT INTO user_quest_progress
                    (id, user_id, quest_id, status, is_liked, completed_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (user_id, quest_id) DO NOTHING
                ",
            )
            .bind(record.id)
            .bind(record.user_id)
            .bind(record.quest_id)
            .bind(record.status.as_str())
            .bind(record.is_liked)
            .bind(record.completed_at)
            .bind(record.created_at)
            .bind(record.updated_at),
            Some(version) => sqlx::query(
                r"
                UPDATE user_quest_progress
                SET status = $3, completed_at = $4, updated_at = $5
                WHERE user_id = $1 AND quest_id = $2
                  AND id = $6 AND status = $7 AND updated_at = $8
                ",
            )
            .bind(record.user_id)
            .bind(record.quest_id)
            .bind(record.status.as_str())
            .bind(record.completed_at)
            .bind(record.updated_at)
            .bind(version.id)
            .bind(version.status.as_str())
            .bind(version.updated_at),
        };

        match query.execute(&self.pool).await {
            Ok(result) if result.rows_affected() == 1 => Ok(()),
            Ok(_) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    quest_id = %record.quest_id,
                    "progress changed since it was read"
                );
                Err(DomainError::ConcurrencyConflict {
                    user_id: record.user_id,
                    quest_id: record.quest_id,
                })
            }
            Err(e) if is_active_index_violation(&e) => {
                let active_quest_id = self
                    .find_active_by_user(record.user_id)
                    .await?
                    .map_or(record.quest_id, |active| active.quest_id);
                tracing::warn!(
                    user_id = %record.user_id,
                    active_quest_id = %active_quest_id,
                    "concurrent start lost the single-active race"
                );
                Err(DomainError::ActiveQuestExists {
                    user_id: record.user_id,
                    active_quest_id,
                })
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn delete(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        expected: ProgressVersion,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let was_liked: Option<bool> = sqlx::query_scalar(
            r"
            DELETE FROM user_quest_progress
            WHERE user_id = $1 AND quest_id = $2
              AND id = $3 AND status = $4 AND updated_at = $5
            RETURNING is_liked
            ",
        )
        .bind(user_id)
        .bind(quest_id)
        .bind(expected.id)
        .bind(expected.status.as_str())
        .bind(expected.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some(was_liked) = was_liked else {
            tracing::warn!(%user_id, %quest_id, "progress changed since it was read");
            return Err(DomainError::ConcurrencyConflict { user_id, quest_id });
        };

        if was_liked {
            sqlx::query(DECREMENT_LIKES)
                .bind(quest_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)
    }
}

#[async_trait]
impl LikeStore for PgProgressStore {
    async fn begin(&self) -> Result<Box<dyn LikeTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgLikeTransaction { tx }))
    }
}

/// A database transaction over the like flag and counter. Rolled back on
/// drop unless committed.
struct PgLikeTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LikeTransaction for PgLikeTransaction {
    async fn flip_like(
        &mut self,
        user_id: Uuid,
        quest_id: Uuid,
    ) -> Result<Option<bool>, DomainError> {
        sqlx::query_scalar(
            r"
            UPDATE user_quest_progress
            SET is_liked = NOT is_liked
            WHERE user_id = $1 AND quest_id = $2
            RETURNING is_liked
            ",
        )
        .bind(user_id)
        .bind(quest_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn increment_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("UPDATE quests SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(quest_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn decrement_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError> {
        sqlx::query(DECREMENT_LIKES)
            .bind(quest_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self { tx } = *self;
        tx.commit().await.map_err(db_error)
    }
}
