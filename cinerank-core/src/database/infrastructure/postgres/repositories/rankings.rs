use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use cinerank_model::{RankedItem, RankedItemId, RatingCategory, UserRankingState};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use tracing::debug;
use uuid::Uuid;

use crate::database::ports::rankings::{NewRankedItem, RankingRepository};
use crate::error::{RankingError, Result};
use crate::ranking::rebalance::PositionUpdate;

const ITEM_COLUMNS: &str = r#"
    id, owner_id, external_ref, category, numeric_score, position,
    cached_title, cached_poster_path, cached_release_date, created_at, updated_at
"#;

/// `ranked_items` and `user_ranking_state` access over a shared pool.
#[derive(Clone, Debug)]
pub struct PostgresRankingRepository {
    pool: PgPool,
}

impl PostgresRankingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get(name)
            .map_err(|e| RankingError::Database(format!("Failed to read {name}: {e}")))
    }

    fn map_item(row: &PgRow) -> Result<RankedItem> {
        let category: String = Self::column(row, "category")?;
        let category: RatingCategory = category.parse().map_err(|e| {
            RankingError::Database(format!("Invalid stored category: {e}"))
        })?;
        let id: Uuid = Self::column(row, "id")?;

        Ok(RankedItem {
            id: RankedItemId(id),
            owner_id: Self::column(row, "owner_id")?,
            external_ref: Self::column(row, "external_ref")?,
            category,
            numeric_score: Self::column(row, "numeric_score")?,
            position: Self::column::<BigDecimal>(row, "position")?,
            cached_title: Self::column(row, "cached_title")?,
            cached_poster_path: Self::column(row, "cached_poster_path")?,
            cached_release_date: Self::column(row, "cached_release_date")?,
            created_at: Self::column::<DateTime<Utc>>(row, "created_at")?,
            updated_at: Self::column::<DateTime<Utc>>(row, "updated_at")?,
        })
    }

    fn map_state(owner_id: Uuid, row: &PgRow) -> Result<UserRankingState> {
        Ok(UserRankingState {
            owner_id,
            has_completed_initial_ranking: Self::column(
                row,
                "has_completed_initial_ranking",
            )?,
            completed_at: Self::column(row, "completed_at")?,
        })
    }

    async fn write_positions(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<()> {
        for update in updates {
            let result = sqlx::query(
                r#"
                UPDATE ranked_items
                SET position = $1,
                    numeric_score = $2,
                    updated_at = NOW()
                WHERE id = $3 AND owner_id = $4
                "#,
            )
            .bind(&update.position)
            .bind(update.numeric_score)
            .bind(update.id.to_uuid())
            .bind(owner_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                RankingError::Database(format!(
                    "Failed to update position for rating {}: {e}",
                    update.id
                ))
            })?;

            if result.rows_affected() != 1 {
                // Returning early drops the transaction, rolling back every
                // row written so far.
                return Err(RankingError::Database(format!(
                    "Failed to update position for rating {}: row not found",
                    update.id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RankingRepository for PostgresRankingRepository {
    async fn ranking_state(&self, owner_id: Uuid) -> Result<UserRankingState> {
        let row = sqlx::query(
            r#"
            SELECT has_completed_initial_ranking, completed_at
            FROM user_ranking_state
            WHERE user_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            RankingError::Database(format!("Failed to load ranking state: {e}"))
        })?;

        match row {
            Some(row) => Self::map_state(owner_id, &row),
            None => Ok(UserRankingState::new(owner_id)),
        }
    }

    async fn count_items(&self, owner_id: Uuid) -> Result<usize> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM ranked_items
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| RankingError::Database(format!("Failed to count ratings: {e}")))?;

        let total: i64 = Self::column(&row, "total")?;
        Ok(total.max(0) as usize)
    }

    async fn list_ordered(&self, owner_id: Uuid) -> Result<Vec<RankedItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM ranked_items
            WHERE owner_id = $1
            ORDER BY position ASC, created_at ASC, id ASC
            "#
        ))
        .bind(owner_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            RankingError::Database(format!("Failed to load ordered ratings: {e}"))
        })?;

        rows.iter().map(Self::map_item).collect()
    }

    async fn find_item(
        &self,
        owner_id: Uuid,
        id: RankedItemId,
    ) -> Result<Option<RankedItem>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM ranked_items
            WHERE id = $1 AND owner_id = $2
            "#
        ))
        .bind(id.to_uuid())
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| RankingError::Database(format!("Failed to load rating {id}: {e}")))?;

        row.as_ref().map(Self::map_item).transpose()
    }

    async fn find_by_external_ref(
        &self,
        owner_id: Uuid,
        external_ref: i64,
    ) -> Result<Option<RankedItem>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM ranked_items
            WHERE owner_id = $1 AND external_ref = $2
            "#
        ))
        .bind(owner_id)
        .bind(external_ref)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            RankingError::Database(format!(
                "Failed to load rating for movie {external_ref}: {e}"
            ))
        })?;

        row.as_ref().map(Self::map_item).transpose()
    }

    async fn upsert_item(&self, item: &NewRankedItem) -> Result<RankedItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ranked_items (
                id, owner_id, external_ref, category, numeric_score, position,
                cached_title, cached_poster_path, cached_release_date,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            ON CONFLICT (owner_id, external_ref) DO UPDATE SET
                category = EXCLUDED.category,
                numeric_score = EXCLUDED.numeric_score,
                position = EXCLUDED.position,
                cached_title = EXCLUDED.cached_title,
                cached_poster_path = EXCLUDED.cached_poster_path,
                cached_release_date = EXCLUDED.cached_release_date,
                updated_at = NOW()
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(item.owner_id)
        .bind(item.external_ref)
        .bind(item.category.as_str())
        .bind(item.numeric_score)
        .bind(&item.position)
        .bind(item.snapshot.title.as_deref())
        .bind(item.snapshot.poster_path.as_deref())
        .bind(item.snapshot.release_date.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(|e| RankingError::Database(format!("Failed to save rating: {e}")))?;

        Self::map_item(&row)
    }

    async fn apply_positions(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            RankingError::Database(format!("Failed to start transaction: {e}"))
        })?;

        Self::write_positions(&mut tx, owner_id, updates).await?;

        tx.commit().await.map_err(|e| {
            RankingError::Database(format!("Failed to commit transaction: {e}"))
        })?;

        debug!(owner_id = %owner_id, rows = updates.len(), "positions written");
        Ok(())
    }

    async fn complete_initial_ranking(
        &self,
        owner_id: Uuid,
        updates: &[PositionUpdate],
    ) -> Result<UserRankingState> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            RankingError::Database(format!("Failed to start transaction: {e}"))
        })?;

        Self::write_positions(&mut tx, owner_id, updates).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO user_ranking_state (
                user_id, has_completed_initial_ranking, completed_at, updated_at
            )
            VALUES ($1, TRUE, NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                has_completed_initial_ranking = TRUE,
                completed_at = COALESCE(user_ranking_state.completed_at, EXCLUDED.completed_at),
                updated_at = NOW()
            RETURNING has_completed_initial_ranking, completed_at
            "#,
        )
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RankingError::Database(format!("Failed to mark initial ranking complete: {e}"))
        })?;

        let state = Self::map_state(owner_id, &row)?;

        tx.commit().await.map_err(|e| {
            RankingError::Database(format!("Failed to commit transaction: {e}"))
        })?;

        Ok(state)
    }
}
