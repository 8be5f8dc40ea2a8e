// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread create-or-get, lookup, archive, and delete.

use rusqlite::{OptionalExtension, Row, params};
use threadline_core::ThreadlineError;
use threadline_core::types::{
    ConversationThread, NewThread, ThreadKey, ThreadStatus, ThreadUpsert, now_timestamp,
};

use crate::database::{Database, map_tr_err};
use crate::queries::enum_column;

const THREAD_COLUMNS: &str = "id, tenant_id, workflow_id, workflow_type, agent, participant_id,
     status, is_internal, created_at, updated_at, created_by";

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationThread> {
    Ok(ConversationThread {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        workflow_id: row.get(2)?,
        workflow_type: row.get(3)?,
        agent: row.get(4)?,
        participant_id: row.get(5)?,
        status: enum_column(row, 6)?,
        is_internal: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        created_by: row.get(10)?,
    })
}

/// Atomically creates the thread for `new.key` or returns the existing row.
///
/// The insert relies on the unique natural key: a losing racer's insert is a
/// no-op and it reads back the winner's row. An archived thread is switched
/// back to active without touching `updated_at`.
pub async fn upsert_thread(db: &Database, new: &NewThread) -> Result<ThreadUpsert, ThreadlineError> {
    let new = new.clone();
    let candidate_id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| -> Result<ThreadUpsert, rusqlite::Error> {
            let tx = conn.transaction()?;
            let now = now_timestamp();
            let inserted = tx.execute(
                "INSERT INTO threads (id, tenant_id, workflow_id, workflow_type, agent,
                     participant_id, status, is_internal, created_at, updated_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10)
                 ON CONFLICT (tenant_id, workflow_id, participant_id) DO NOTHING",
                params![
                    candidate_id,
                    new.key.tenant_id,
                    new.key.workflow_id,
                    new.workflow_type,
                    new.agent,
                    new.key.participant_id,
                    ThreadStatus::Active.to_string(),
                    new.is_internal,
                    now,
                    new.created_by,
                ],
            )?;

            let (thread_id, status): (String, String) = tx.query_row(
                "SELECT id, status FROM threads
                 WHERE tenant_id = ?1 AND workflow_id = ?2 AND participant_id = ?3",
                params![new.key.tenant_id, new.key.workflow_id, new.key.participant_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let reactivated = status == ThreadStatus::Archived.to_string();
            if reactivated {
                tx.execute(
                    "UPDATE threads SET status = ?2 WHERE id = ?1",
                    params![thread_id, ThreadStatus::Active.to_string()],
                )?;
            }
            tx.commit()?;

            Ok(ThreadUpsert {
                thread_id,
                created: inserted == 1,
                reactivated,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Thread by id.
pub async fn get_thread(
    db: &Database,
    thread_id: &str,
) -> Result<Option<ConversationThread>, ThreadlineError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationThread>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
                params![thread_id],
                thread_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Thread by natural key.
pub async fn find_thread(
    db: &Database,
    key: &ThreadKey,
) -> Result<Option<ConversationThread>, ThreadlineError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationThread>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {THREAD_COLUMNS} FROM threads
                     WHERE tenant_id = ?1 AND workflow_id = ?2 AND participant_id = ?3"
                ),
                params![key.tenant_id, key.workflow_id, key.participant_id],
                thread_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Marks a thread archived. `updated_at` is left alone.
pub async fn archive_thread(db: &Database, thread_id: &str) -> Result<bool, ThreadlineError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE threads SET status = ?2 WHERE id = ?1",
                params![thread_id, ThreadStatus::Archived.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Removes the thread row; remaining messages go with it via cascade.
pub async fn delete_thread(db: &Database, thread_id: &str) -> Result<bool, ThreadlineError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute("DELETE FROM threads WHERE id = ?1", params![thread_id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}
