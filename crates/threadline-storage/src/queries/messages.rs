// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log: transactional append, paged history, topics, and deletes.

use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use threadline_core::ThreadlineError;
use threadline_core::types::{
    ConversationMessage, MessageDirection, MessageQuery, MessageType, ScopeFilter, SortOrder,
    TopicSummary,
};

use crate::database::{Database, map_tr_err};
use crate::queries::{enum_column, sql_int};

const MESSAGE_COLUMNS: &str = "id, thread_id, tenant_id, participant_id, direction, message_type,
     text, data, scope, request_id, hint, task_id, origin, workflow_id, workflow_type,
     created_at, updated_at, created_by, parent_workflow_id, child_workflow_id";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationMessage> {
    let data: Option<String> = row.get(7)?;
    let data = data
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(ConversationMessage {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        tenant_id: row.get(2)?,
        participant_id: row.get(3)?,
        direction: enum_column(row, 4)?,
        message_type: enum_column(row, 5)?,
        text: row.get(6)?,
        data,
        scope: row.get(8)?,
        request_id: row.get(9)?,
        hint: row.get(10)?,
        task_id: row.get(11)?,
        origin: row.get(12)?,
        workflow_id: row.get(13)?,
        workflow_type: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
        created_by: row.get(17)?,
        parent_workflow_id: row.get(18)?,
        child_workflow_id: row.get(19)?,
    })
}

/// Appends a message and bumps its thread's `updated_at` in one transaction.
///
/// Either both rows change or neither does; a missing thread fails the
/// foreign key and rolls the insert back. `updated_at` only moves forward,
/// since messages stamped concurrently may commit out of order.
pub async fn append_message(db: &Database, msg: &ConversationMessage) -> Result<(), ThreadlineError> {
    let data = msg
        .data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(ThreadlineError::storage)?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
                ),
                params![
                    msg.id,
                    msg.thread_id,
                    msg.tenant_id,
                    msg.participant_id,
                    msg.direction.to_string(),
                    msg.message_type.to_string(),
                    msg.text,
                    data,
                    msg.scope,
                    msg.request_id,
                    msg.hint,
                    msg.task_id,
                    msg.origin,
                    msg.workflow_id,
                    msg.workflow_type,
                    msg.created_at,
                    msg.updated_at,
                    msg.created_by,
                    msg.parent_workflow_id,
                    msg.child_workflow_id,
                ],
            )?;
            let bumped = tx.execute(
                "UPDATE threads SET updated_at = MAX(updated_at, ?2) WHERE id = ?1",
                params![msg.thread_id, msg.created_at],
            )?;
            if bumped == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// One page of a thread's messages.
///
/// Ordered by `created_at` then insertion sequence, both in the requested
/// direction, so consecutive pages neither overlap nor skip.
pub async fn query_messages(
    db: &Database,
    query: &MessageQuery,
) -> Result<Vec<ConversationMessage>, ThreadlineError> {
    let mut sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = ?");
    let mut args = vec![Value::Text(query.thread_id.clone())];

    match &query.scope {
        ScopeFilter::Any => {}
        ScopeFilter::Default => sql.push_str(" AND scope IS NULL"),
        ScopeFilter::Named(scope) => {
            sql.push_str(" AND scope = ?");
            args.push(Value::Text(scope.clone()));
        }
    }
    if query.chat_only {
        sql.push_str(" AND message_type = ?");
        args.push(Value::Text(MessageType::Chat.to_string()));
    }

    let dir = match query.sort {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    sql.push_str(&format!(" ORDER BY created_at {dir}, seq {dir} LIMIT ? OFFSET ?"));
    args.push(Value::Integer(i64::from(query.page_size)));
    args.push(Value::Integer(sql_int(query.offset())));

    db.connection()
        .call(move |conn| -> Result<Vec<ConversationMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args), message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Newest message travelling in `direction`.
pub async fn latest_message(
    db: &Database,
    thread_id: &str,
    direction: MessageDirection,
) -> Result<Option<ConversationMessage>, ThreadlineError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationMessage>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE thread_id = ?1 AND direction = ?2
                     ORDER BY created_at DESC, seq DESC LIMIT 1"
                ),
                params![thread_id, direction.to_string()],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Per-topic message counts.
///
/// The default topic is always listed first, even with zero messages; named
/// topics follow in lexical order.
pub async fn topics(
    db: &Database,
    thread_id: &str,
    page: u32,
    page_size: u32,
) -> Result<Vec<TopicSummary>, ThreadlineError> {
    let thread_id = thread_id.to_string();
    let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    db.connection()
        .call(move |conn| -> Result<Vec<TopicSummary>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT NULL AS scope,
                        (SELECT COUNT(*) FROM messages WHERE thread_id = ?1 AND scope IS NULL)
                            AS message_count
                 UNION ALL
                 SELECT scope, COUNT(*) FROM messages
                 WHERE thread_id = ?1 AND scope IS NOT NULL
                 GROUP BY scope
                 ORDER BY scope ASC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(
                params![thread_id, i64::from(page_size), sql_int(offset)],
                |row| {
                    let count: i64 = row.get(1)?;
                    Ok(TopicSummary {
                        scope: row.get(0)?,
                        message_count: u64::try_from(count).unwrap_or_default(),
                    })
                },
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes all of a thread's messages.
pub async fn delete_messages_by_thread(
    db: &Database,
    thread_id: &str,
) -> Result<u64, ThreadlineError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM messages WHERE thread_id = ?1", params![thread_id])
        })
        .await
        .map(|n| n as u64)
        .map_err(map_tr_err)
}

/// Deletes one topic's messages; [`ScopeFilter::Any`] is rejected.
pub async fn delete_messages_by_scope(
    db: &Database,
    thread_id: &str,
    scope: &ScopeFilter,
) -> Result<u64, ThreadlineError> {
    let thread_id = thread_id.to_string();
    let scope = match scope {
        ScopeFilter::Any => {
            return Err(ThreadlineError::validation(
                "scope",
                "topic deletion needs a single topic",
            ));
        }
        ScopeFilter::Default => None,
        ScopeFilter::Named(s) => Some(s.clone()),
    };
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            match scope {
                None => conn.execute(
                    "DELETE FROM messages WHERE thread_id = ?1 AND scope IS NULL",
                    params![thread_id],
                ),
                Some(scope) => conn.execute(
                    "DELETE FROM messages WHERE thread_id = ?1 AND scope = ?2",
                    params![thread_id, scope],
                ),
            }
        })
        .await
        .map(|n| n as u64)
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::threads::{get_thread, upsert_thread};
    use tempfile::tempdir;
    use threadline_core::types::{NewThread, TIMESTAMP_FORMAT, ThreadKey};

    async fn setup_db_with_thread() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let upsert = upsert_thread(
            &db,
            &NewThread {
                key: ThreadKey {
                    tenant_id: "acme".into(),
                    workflow_id: "acme:support-agent:triage".into(),
                    participant_id: "user-42".into(),
                },
                workflow_type: "support-agent:triage".into(),
                agent: "support-agent".into(),
                is_internal: false,
                created_by: None,
            },
        )
        .await
        .unwrap();
        (db, upsert.thread_id, dir)
    }

    fn message(thread_id: &str, n: usize, created_at: &str) -> ConversationMessage {
        ConversationMessage {
            id: format!("m{n}"),
            thread_id: thread_id.into(),
            tenant_id: "acme".into(),
            participant_id: "user-42".into(),
            direction: MessageDirection::Incoming,
            message_type: MessageType::Chat,
            text: Some(format!("message {n}")),
            data: None,
            scope: None,
            request_id: "req".into(),
            hint: None,
            task_id: None,
            origin: None,
            workflow_id: "acme:support-agent:triage".into(),
            workflow_type: "support-agent:triage".into(),
            created_at: created_at.into(),
            updated_at: created_at.into(),
            created_by: None,
            parent_workflow_id: None,
            child_workflow_id: None,
        }
    }

    fn query(thread_id: &str, page: u32, page_size: u32) -> MessageQuery {
        MessageQuery {
            thread_id: thread_id.into(),
            page,
            page_size,
            scope: ScopeFilter::Any,
            chat_only: false,
            sort: SortOrder::Desc,
        }
    }

    fn minutes_from_now(minutes: i64) -> String {
        (chrono::Utc::now() + chrono::Duration::minutes(minutes))
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    #[tokio::test]
    async fn append_bumps_thread_updated_at() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        let mut msg = message(&thread_id, 1, &minutes_from_now(1));
        msg.data = Some(serde_json::json!({"channel": "slack"}));
        append_message(&db, &msg).await.unwrap();

        let thread = get_thread(&db, &thread_id).await.unwrap().unwrap();
        assert_eq!(thread.updated_at, msg.created_at);

        let stored = query_messages(&db, &query(&thread_id, 1, 10)).await.unwrap();
        assert_eq!(stored, vec![msg]);
    }

    #[tokio::test]
    async fn late_commit_of_older_message_keeps_updated_at() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        let earlier = message(&thread_id, 1, &minutes_from_now(1));
        let later = message(&thread_id, 2, &minutes_from_now(2));

        // Stamped in one order, committed in the other.
        append_message(&db, &later).await.unwrap();
        append_message(&db, &earlier).await.unwrap();

        let thread = get_thread(&db, &thread_id).await.unwrap().unwrap();
        assert_eq!(thread.updated_at, later.created_at);

        let mut q = query(&thread_id, 1, 10);
        q.sort = SortOrder::Asc;
        let stored = query_messages(&db, &q).await.unwrap();
        let ids: Vec<_> = stored.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }

    #[tokio::test]
    async fn append_to_missing_thread_writes_nothing() {
        let (db, _thread_id, _dir) = setup_db_with_thread().await;
        let msg = message("no-such-thread", 1, "2026-03-01T10:00:00.000000Z");
        assert!(append_message(&db, &msg).await.is_err());

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn pages_do_not_overlap_with_equal_timestamps() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        for n in 0..7 {
            let ts = if n < 4 {
                "2026-03-01T10:00:00.000000Z"
            } else {
                "2026-03-01T10:00:01.000000Z"
            };
            append_message(&db, &message(&thread_id, n, ts)).await.unwrap();
        }

        for sort in [SortOrder::Asc, SortOrder::Desc] {
            let mut seen = Vec::new();
            for page in 1..=4 {
                let mut q = query(&thread_id, page, 2);
                q.sort = sort;
                let batch = query_messages(&db, &q).await.unwrap();
                seen.extend(batch.into_iter().map(|m| m.id));
            }
            let mut unique = seen.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(seen.len(), 7);
            assert_eq!(unique.len(), 7);
            if sort == SortOrder::Asc {
                assert_eq!(seen.first().map(String::as_str), Some("m0"));
            } else {
                assert_eq!(seen.first().map(String::as_str), Some("m6"));
            }
        }
    }

    #[tokio::test]
    async fn scope_and_chat_filters() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        let mut billing = message(&thread_id, 1, "2026-03-01T10:00:00.000000Z");
        billing.scope = Some("billing".into());
        let mut data = message(&thread_id, 2, "2026-03-01T10:00:01.000000Z");
        data.message_type = MessageType::Data;
        let plain = message(&thread_id, 3, "2026-03-01T10:00:02.000000Z");
        for m in [&billing, &data, &plain] {
            append_message(&db, m).await.unwrap();
        }

        let mut q = query(&thread_id, 1, 10);
        q.scope = ScopeFilter::Named("billing".into());
        let ids: Vec<_> = query_messages(&db, &q).await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m1"]);

        q.scope = ScopeFilter::Default;
        assert_eq!(query_messages(&db, &q).await.unwrap().len(), 2);

        q.chat_only = true;
        let ids: Vec<_> = query_messages(&db, &q).await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m3"]);
    }

    #[tokio::test]
    async fn topics_list_default_first_and_delete_by_scope_is_isolated() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        let scopes = [Some("billing"), Some("billing"), Some("shipping"), None];
        for (n, scope) in scopes.iter().enumerate() {
            let mut m = message(&thread_id, n, "2026-03-01T10:00:00.000000Z");
            m.scope = scope.map(str::to_string);
            append_message(&db, &m).await.unwrap();
        }

        let listed = topics(&db, &thread_id, 1, 10).await.unwrap();
        assert_eq!(
            listed,
            vec![
                TopicSummary { scope: None, message_count: 1 },
                TopicSummary { scope: Some("billing".into()), message_count: 2 },
                TopicSummary { scope: Some("shipping".into()), message_count: 1 },
            ]
        );
        let second_page = topics(&db, &thread_id, 2, 2).await.unwrap();
        assert_eq!(second_page.len(), 1);

        let removed = delete_messages_by_scope(&db, &thread_id, &ScopeFilter::Named("billing".into()))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let listed = topics(&db, &thread_id, 1, 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1], TopicSummary { scope: Some("shipping".into()), message_count: 1 });

        let removed = delete_messages_by_scope(&db, &thread_id, &ScopeFilter::Default).await.unwrap();
        assert_eq!(removed, 1);
        assert!(delete_messages_by_scope(&db, &thread_id, &ScopeFilter::Any).await.is_err());
    }

    #[tokio::test]
    async fn latest_message_by_direction() {
        let (db, thread_id, _dir) = setup_db_with_thread().await;
        let mut first = message(&thread_id, 1, "2026-03-01T10:00:00.000000Z");
        first.origin = Some("slack".into());
        let mut second = message(&thread_id, 2, "2026-03-01T10:00:01.000000Z");
        second.origin = Some("teams".into());
        let mut reply = message(&thread_id, 3, "2026-03-01T10:00:02.000000Z");
        reply.direction = MessageDirection::Outgoing;
        for m in [&first, &second, &reply] {
            append_message(&db, m).await.unwrap();
        }

        let latest = latest_message(&db, &thread_id, MessageDirection::Incoming)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.origin.as_deref(), Some("teams"));
        assert!(
            latest_message(&db, &thread_id, MessageDirection::Handoff)
                .await
                .unwrap()
                .is_none()
        );

        assert_eq!(delete_messages_by_thread(&db, &thread_id).await.unwrap(), 3);
    }
}
