//! SQLite-backed [`EventStore`].
//!
//! Writes go through [`SqliteEventStore::add_event`], which checks every
//! reading's value against its declared type, assigns missing identifiers,
//! and inserts the event row plus its readings in a single transaction.
//!
//! Reads go through [`SqliteEventStore::event_by_id`], which returns the
//! readings in the order they were submitted.

use std::collections::BTreeMap;

use ingest_db::{DbConnection, DbPool};
use ingest_types::{ErrorKind, Event, Reading, RequestContext, ServiceError, ValueType};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::error::StoreInitError;
use crate::store::EventStore;

/// Event store over an `r2d2` SQLite pool.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: DbPool,
}

impl SqliteEventStore {
    /// Wraps an already-migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs pending migrations on `pool`, then wraps it.
    ///
    /// # Errors
    ///
    /// Returns `StoreInitError` if no connection can be checked out or a
    /// migration fails.
    pub fn open(pool: DbPool) -> Result<Self, StoreInitError> {
        {
            let conn = pool.get()?;
            let applied = ingest_db::run_migrations(&conn)?;
            if applied > 0 {
                tracing::info!(count = applied, "applied event store migrations");
            }
        }
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<DbConnection, ServiceError> {
        self.pool.get().map_err(|e| {
            ServiceError::new(ErrorKind::DatabaseError, "failed to acquire database connection")
                .with_detail(e)
        })
    }
}

fn db_error<E: std::fmt::Display>(message: &'static str) -> impl FnOnce(E) -> ServiceError {
    move |e| ServiceError::new(ErrorKind::DatabaseError, message).with_detail(e)
}

/// Maps an insert failure, treating constraint violations as duplicates.
fn insert_error(id: &str) -> impl FnOnce(rusqlite::Error) -> ServiceError + '_ {
    move |e| {
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            ServiceError::new(
                ErrorKind::DuplicateId,
                format!("event or reading id {id} already exists"),
            )
            .with_detail(e)
        } else {
            ServiceError::new(ErrorKind::DatabaseError, "failed to store event").with_detail(e)
        }
    }
}

/// Rejects readings whose content does not match their declared type.
fn check_readings(event: &Event) -> Result<(), ServiceError> {
    for reading in &event.readings {
        match reading.value_type {
            ValueType::Binary => {
                if reading.binary_value.as_ref().map_or(true, Vec::is_empty) {
                    return Err(ServiceError::new(
                        ErrorKind::UnprocessableEntity,
                        format!(
                            "reading {} is declared Binary but carries no binary value",
                            reading.resource_name
                        ),
                    ));
                }
            }
            value_type if !value_type.accepts(&reading.value) => {
                return Err(ServiceError::new(
                    ErrorKind::UnprocessableEntity,
                    format!(
                        "reading {} value {:?} is not a valid {}",
                        reading.resource_name, reading.value, value_type
                    ),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl EventStore for SqliteEventStore {
    fn add_event(&self, mut event: Event, ctx: &RequestContext) -> Result<String, ServiceError> {
        check_readings(&event)?;

        if event.id.is_empty() {
            event.id = new_id();
        }
        for reading in &mut event.readings {
            if reading.id.is_empty() {
                reading.id = new_id();
            }
        }

        let tags_json = serde_json::to_string(&event.tags).map_err(|e| {
            ServiceError::new(ErrorKind::ServerError, "failed to encode event tags").with_detail(e)
        })?;

        let mut conn = self.conn()?;
        // Write lock is taken at BEGIN; concurrent writers wait on busy_timeout.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error("failed to begin transaction"))?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)",
                [&event.id],
                |row| row.get(0),
            )
            .map_err(db_error("failed to check for existing event"))?;
        if exists {
            return Err(ServiceError::new(
                ErrorKind::DuplicateId,
                format!("event id {} already exists", event.id),
            ));
        }

        tx.execute(
            "INSERT INTO events (id, device_name, profile_name, source_name, origin, tags_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id,
                event.device_name,
                event.profile_name,
                event.source_name,
                event.origin,
                tags_json,
            ],
        )
        .map_err(insert_error(&event.id))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO readings
                        (id, event_id, position, origin, device_name, resource_name, profile_name,
                         value_type, value, binary_value, media_type, units)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                )
                .map_err(db_error("failed to prepare reading insert"))?;

            for (position, reading) in event.readings.iter().enumerate() {
                stmt.execute(params![
                    reading.id,
                    event.id,
                    position as i64,
                    reading.origin,
                    reading.device_name,
                    reading.resource_name,
                    reading.profile_name,
                    reading.value_type.as_str(),
                    reading.value,
                    reading.binary_value,
                    reading.media_type,
                    reading.units,
                ])
                .map_err(insert_error(&reading.id))?;
            }
        }

        tx.commit().map_err(db_error("failed to commit event"))?;

        tracing::trace!(
            correlation_id = %ctx.correlation_id,
            event_id = %event.id,
            readings = event.readings.len(),
            "event stored"
        );

        Ok(event.id)
    }

    fn event_by_id(&self, id: &str, ctx: &RequestContext) -> Result<Event, ServiceError> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT id, device_name, profile_name, source_name, origin, tags_json
                 FROM events WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(db_error("failed to query event"))?;

        let Some((id, device_name, profile_name, source_name, origin, tags_json)) = row else {
            return Err(ServiceError::new(
                ErrorKind::EntityDoesNotExist,
                format!("event with id {id} does not exist"),
            ));
        };

        let tags: BTreeMap<String, String> = serde_json::from_str(&tags_json)
            .map_err(db_error("stored event tags are corrupt"))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, origin, device_name, resource_name, profile_name, value_type,
                        value, binary_value, media_type, units
                 FROM readings WHERE event_id = ?1 ORDER BY position ASC",
            )
            .map_err(db_error("failed to prepare readings query"))?;
        let rows = stmt
            .query_map([&id], |row| {
                let value_type: String = row.get(5)?;
                let value_type = value_type.parse::<ValueType>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(Reading {
                    id: row.get(0)?,
                    origin: row.get(1)?,
                    device_name: row.get(2)?,
                    resource_name: row.get(3)?,
                    profile_name: row.get(4)?,
                    value_type,
                    value: row.get(6)?,
                    binary_value: row.get(7)?,
                    media_type: row.get(8)?,
                    units: row.get(9)?,
                })
            })
            .map_err(db_error("failed to query readings"))?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row.map_err(db_error("failed to read reading row"))?);
        }

        tracing::trace!(
            correlation_id = %ctx.correlation_id,
            event_id = %id,
            readings = readings.len(),
            "event loaded"
        );

        Ok(Event {
            id,
            device_name,
            profile_name,
            source_name,
            origin,
            readings,
            tags,
        })
    }
}
