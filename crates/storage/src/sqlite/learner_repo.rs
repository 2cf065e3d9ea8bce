use progress_core::model::{Experience, Learner, UserId};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_learner_row};
use crate::repository::{LearnerRepository, StorageError};

/// Adds `amount` xp and rewrites the derived level on the given connection.
///
/// The xp increment runs first so the write lock is taken before any read.
pub(super) async fn award_on(
    conn: &mut SqliteConnection,
    user: UserId,
    amount: u64,
) -> Result<Experience, StorageError> {
    let user_id = id_to_i64("user_id", user.value())?;
    let amount = id_to_i64("xp", amount)?;

    let xp: Option<i64> = sqlx::query_scalar(
        r"
            UPDATE learners SET xp = xp + ?1
            WHERE id = ?2
            RETURNING xp
        ",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    let xp = xp.ok_or(StorageError::NotFound)?;
    let experience = Experience::from_xp(
        u64::try_from(xp).map_err(|_| StorageError::Serialization("xp sign overflow".into()))?,
    );

    sqlx::query("UPDATE learners SET level = ?1 WHERE id = ?2")
        .bind(i64::from(experience.level()))
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

    Ok(experience)
}

#[async_trait::async_trait]
impl LearnerRepository for SqliteRepository {
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        let experience = learner.experience();

        sqlx::query(
            r"
            INSERT INTO learners (id, username, name, surname, xp, level, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- xp and level belong to the ledger; only profile fields change here
                username = excluded.username,
                name = excluded.name,
                surname = excluded.surname
            ",
        )
        .bind(id_to_i64("user_id", learner.id().value())?)
        .bind(learner.username().to_owned())
        .bind(learner.name().to_owned())
        .bind(learner.surname().to_owned())
        .bind(id_to_i64("xp", experience.xp())?)
        .bind(i64::from(experience.level()))
        .bind(learner.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_learner(&self, id: UserId) -> Result<Option<Learner>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, name, surname, xp, level, created_at
            FROM learners WHERE id = ?1
            ",
        )
        .bind(id_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_learner_row).transpose()
    }

    async fn award_xp(&self, id: UserId, amount: u64) -> Result<Experience, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let experience = award_on(&mut *tx, id, amount).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(experience)
    }
}
