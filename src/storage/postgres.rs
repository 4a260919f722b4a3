//! PostgreSQL implementation of the storage layer.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{EventRow, ParticipantRow};
use super::{
    GroupAssignment, ParticipantKey, ParticipantQuery, StatusUpdate, Storage, StorageError,
    StorageTx,
};
use crate::config::DonutConfig;
use crate::domain::{Event, EventStatus, Participant, Serial};

/// PostgreSQL-backed storage using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a storage layer over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool using the database settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the pool cannot connect.
    pub async fn connect(config: &DonutConfig) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

async fn fetch_participants<'e, E>(
    executor: E,
    query: &ParticipantQuery,
) -> Result<Vec<Participant>, StorageError>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = match query {
        ParticipantQuery::Event(event) => sqlx::query_as::<_, ParticipantRow>(
            "SELECT event_serial, participant_ref, group_serial, status FROM participants \
             WHERE event_serial = $1 ORDER BY participant_ref",
        )
        .bind(*event.as_uuid())
        .fetch_all(executor)
        .await?,
        ParticipantQuery::EventWithStatus(event, statuses) => {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            sqlx::query_as::<_, ParticipantRow>(
                "SELECT event_serial, participant_ref, group_serial, status FROM participants \
                 WHERE event_serial = $1 AND status = ANY($2) ORDER BY participant_ref",
            )
            .bind(*event.as_uuid())
            .bind(statuses)
            .fetch_all(executor)
            .await?
        }
        ParticipantQuery::EventWithReferences(event, references) => {
            sqlx::query_as::<_, ParticipantRow>(
                "SELECT event_serial, participant_ref, group_serial, status FROM participants \
                 WHERE event_serial = $1 AND participant_ref = ANY($2) ORDER BY participant_ref",
            )
            .bind(*event.as_uuid())
            .bind(references.as_slice())
            .fetch_all(executor)
            .await?
        }
        ParticipantQuery::Group(group) => sqlx::query_as::<_, ParticipantRow>(
            "SELECT event_serial, participant_ref, group_serial, status FROM participants \
             WHERE group_serial = $1 ORDER BY participant_ref",
        )
        .bind(*group.as_uuid())
        .fetch_all(executor)
        .await?,
    };

    rows.into_iter().map(Participant::try_from).collect()
}

async fn write_event_status<'e, E>(
    executor: E,
    serial: Serial,
    status: EventStatus,
) -> Result<(), StorageError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("UPDATE events SET status = $2, updated_at = NOW() WHERE serial = $1")
        .bind(*serial.as_uuid())
        .bind(status.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

async fn insert_participants(
    conn: &mut PgConnection,
    batch: &[Participant],
) -> Result<u64, StorageError> {
    let mut inserted = 0u64;
    for participant in batch {
        let result = sqlx::query(
            "INSERT INTO participants (event_serial, participant_ref, group_serial, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (event_serial, participant_ref) DO NOTHING",
        )
        .bind(*participant.event_serial.as_uuid())
        .bind(participant.participant_ref.as_str())
        .bind(participant.group_serial.map(Uuid::from))
        .bind(participant.status.as_str())
        .execute(&mut *conn)
        .await?;
        inserted = inserted.saturating_add(result.rows_affected());
    }
    Ok(inserted)
}

async fn remove_participants(
    conn: &mut PgConnection,
    batch: &[ParticipantKey],
) -> Result<u64, StorageError> {
    let mut removed = 0u64;
    for key in batch {
        let (event, reference) = key_binds(key);
        let result =
            sqlx::query("DELETE FROM participants WHERE event_serial = $1 AND participant_ref = $2")
                .bind(event)
                .bind(reference)
                .execute(&mut *conn)
                .await?;
        removed = removed.saturating_add(result.rows_affected());
    }
    Ok(removed)
}

fn key_binds(key: &ParticipantKey) -> (Uuid, &str) {
    (*key.event_serial.as_uuid(), key.participant_ref.as_str())
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_event(&self, event: &Event) -> Result<(), StorageError> {
        let row = EventRow::from(event);
        sqlx::query(
            "INSERT INTO events (serial, name, description, status, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(row.serial)
        .bind(row.name)
        .bind(row.description)
        .bind(row.status)
        .bind(row.start_time)
        .bind(row.end_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, serial: Serial) -> Result<Option<Event>, StorageError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT serial, name, description, status, start_time, end_time FROM events \
             WHERE serial = $1",
        )
        .bind(*serial.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn update_event_status(
        &self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError> {
        write_event_status(&self.pool, serial, status).await
    }

    async fn create_participants(&self, batch: &[Participant]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_participants(&mut tx, batch).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn delete_participants(&self, batch: &[ParticipantKey]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;
        let removed = remove_participants(&mut tx, batch).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError> {
        fetch_participants(&self.pool, query).await
    }

    async fn begin(&self) -> Result<Box<dyn StorageTx>, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl StorageTx for PgTx {
    async fn lock_event(&mut self, serial: Serial) -> Result<Option<Event>, StorageError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT serial, name, description, status, start_time, end_time FROM events \
             WHERE serial = $1 FOR UPDATE",
        )
        .bind(*serial.as_uuid())
        .fetch_optional(self.conn())
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list_participants(
        &mut self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError> {
        fetch_participants(self.conn(), query).await
    }

    async fn create_participants(&mut self, batch: &[Participant]) -> Result<u64, StorageError> {
        insert_participants(self.conn(), batch).await
    }

    async fn delete_participants(
        &mut self,
        batch: &[ParticipantKey],
    ) -> Result<u64, StorageError> {
        remove_participants(self.conn(), batch).await
    }

    async fn update_participants_group_and_status(
        &mut self,
        batch: &[GroupAssignment],
    ) -> Result<(), StorageError> {
        for assignment in batch {
            let (event, reference) = key_binds(&assignment.key);
            let result = sqlx::query(
                "UPDATE participants SET group_serial = $3, status = $4, updated_at = NOW() \
                 WHERE event_serial = $1 AND participant_ref = $2",
            )
            .bind(event)
            .bind(reference)
            .bind(*assignment.group_serial.as_uuid())
            .bind(assignment.status.as_str())
            .execute(self.conn())
            .await?;
            if result.rows_affected() == 0 {
                return Err(StorageError::Unavailable(format!(
                    "participant {reference} not registered on event {event}"
                )));
            }
        }
        Ok(())
    }

    async fn update_participants_status(
        &mut self,
        batch: &[StatusUpdate],
    ) -> Result<(), StorageError> {
        for update in batch {
            let (event, reference) = key_binds(&update.key);
            let result = sqlx::query(
                "UPDATE participants SET status = $3, updated_at = NOW() \
                 WHERE event_serial = $1 AND participant_ref = $2",
            )
            .bind(event)
            .bind(reference)
            .bind(update.status.as_str())
            .execute(self.conn())
            .await?;
            if result.rows_affected() == 0 {
                return Err(StorageError::Unavailable(format!(
                    "participant {reference} not registered on event {event}"
                )));
            }
        }
        Ok(())
    }

    async fn update_event_status(
        &mut self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError> {
        write_event_status(self.conn(), serial, status).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}
