// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversation tests over temp SQLite and the mock engine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use threadline_conversation::{HistoryParams, MessageCommand, ThreadLocator};
use threadline_core::types::{MessageDirection, MessageType, SortOrder, ThreadKey, ThreadStatus};
use threadline_core::{ErrorKind, RequestContext, ThreadlineError};
use threadline_test_utils::{EngineCall, TestHarness};
use tokio_util::sync::CancellationToken;

fn asc() -> HistoryParams {
    HistoryParams {
        sort_order: SortOrder::Asc,
        ..HistoryParams::default()
    }
}

#[tokio::test]
async fn first_message_creates_thread_and_starts_process() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    let thread_id = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat("user-42", "support-agent:triage", "hello"))
        .await
        .unwrap();

    let thread = h.service.get_thread(&ctx, &thread_id).await.unwrap();
    assert_eq!(
        thread.key(),
        ThreadKey {
            tenant_id: "acme".into(),
            workflow_id: "acme:support-agent:triage".into(),
            participant_id: "user-42".into(),
        }
    );
    assert_eq!(thread.agent, "support-agent");
    assert_eq!(thread.status, ThreadStatus::Active);

    let locator = ThreadLocator::new("acme:support-agent:triage", "user-42");
    let messages = h.service.history(&ctx, &locator, &asc()).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].direction, MessageDirection::Incoming);
    assert_eq!(messages[0].text.as_deref(), Some("hello"));

    let calls = h.engine.calls().await;
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        EngineCall::SignalWithStart {
            process_id,
            process_type,
            payload,
            ..
        } => {
            assert_eq!(process_id, "acme:support-agent:triage");
            assert_eq!(process_type, "support-agent:triage");
            assert_eq!(payload["thread_id"], thread_id.as_str());
            assert_eq!(payload["message_id"], messages[0].id.as_str());
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn participant_ids_are_case_insensitive() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    let a = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat("User-42", "echo", "one"))
        .await
        .unwrap();
    let b = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat(" user-42 ", "echo", "two"))
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn concurrent_first_messages_share_one_thread() {
    let h = Arc::new(TestHarness::new().await.unwrap());
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..12 {
        let h = Arc::clone(&h);
        tasks.spawn(async move {
            let ctx = h.ctx("acme", "user-42");
            let command = MessageCommand::chat("user-42", "support-agent:triage", format!("m{i}"));
            h.service.process_incoming(&ctx, &command).await
        });
    }

    let mut ids = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        ids.insert(result.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 1);

    let ctx = h.ctx("acme", "user-42");
    let params = HistoryParams {
        page_size: Some(50),
        ..HistoryParams::default()
    };
    let locator = ThreadLocator::new("acme:support-agent:triage", "user-42");
    let messages = h.service.history(&ctx, &locator, &params).await.unwrap();
    assert_eq!(messages.len(), 12);
}

#[tokio::test]
async fn append_moves_thread_activity_to_message_time() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    for text in ["one", "two", "three"] {
        let thread_id = h
            .service
            .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", text))
            .await
            .unwrap();

        let thread = h.service.get_thread(&ctx, &thread_id).await.unwrap();
        let newest = h
            .service
            .thread_history(&ctx, &thread_id, &HistoryParams::default())
            .await
            .unwrap();
        assert_eq!(newest[0].text.as_deref(), Some(text));
        assert_eq!(thread.updated_at, newest[0].created_at);
    }
}

#[tokio::test]
async fn pages_neither_repeat_nor_skip() {
    let h = TestHarness::builder()
        .with_page_limits(3, 10)
        .build()
        .await
        .unwrap();
    let ctx = h.ctx("acme", "user-42");
    for i in 0..7 {
        h.service
            .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", format!("m{i}")))
            .await
            .unwrap();
    }

    let locator = ThreadLocator::new("acme:echo", "user-42");
    for sort_order in [SortOrder::Asc, SortOrder::Desc] {
        let mut seen = Vec::new();
        for page in 1..=4 {
            let params = HistoryParams {
                page: Some(page),
                sort_order,
                ..HistoryParams::default()
            };
            let batch = h.service.history(&ctx, &locator, &params).await.unwrap();
            if page == 4 {
                assert!(batch.is_empty());
            }
            seen.extend(batch.into_iter().map(|m| m.text.unwrap_or_default()));
        }
        let mut expected: Vec<String> = (0..7).map(|i| format!("m{i}")).collect();
        if sort_order == SortOrder::Desc {
            expected.reverse();
        }
        assert_eq!(seen, expected);
    }
}

#[tokio::test]
async fn bad_paging_is_rejected_before_lookup() {
    let h = TestHarness::builder()
        .with_page_limits(3, 10)
        .build()
        .await
        .unwrap();
    let ctx = h.ctx("acme", "user-42");
    let locator = ThreadLocator::new("acme:echo", "nobody");

    for (page, page_size) in [(Some(0), None), (None, Some(0)), (Some(-2), None), (None, Some(11))] {
        let params = HistoryParams {
            page,
            page_size,
            ..HistoryParams::default()
        };
        let err = h.service.history(&ctx, &locator, &params).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{page:?}/{page_size:?}");
    }

    let err = h
        .service
        .history(&ctx, &locator, &HistoryParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn topics_are_isolated() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");
    let send = |text: &str, scope: Option<&str>| {
        let mut command = MessageCommand::chat("user-42", "support-agent:triage", text);
        command.scope = scope.map(str::to_string);
        command
    };

    for command in [
        send("hi", None),
        send("invoice?", Some("billing")),
        send("refund?", Some("billing")),
        send("where is it", Some("shipping")),
        send("blank topic", Some("")),
    ] {
        h.service.process_incoming(&ctx, &command).await.unwrap();
    }

    let locator = ThreadLocator::new("acme:support-agent:triage", "user-42");
    let topics = h.service.topics(&ctx, &locator, None, None).await.unwrap();
    let counts: Vec<(Option<&str>, u64)> = topics
        .iter()
        .map(|t| (t.scope.as_deref(), t.message_count))
        .collect();
    assert_eq!(
        counts,
        vec![(None, 2), (Some("billing"), 2), (Some("shipping"), 1)]
    );

    let only_billing = HistoryParams {
        scope: Some("billing".into()),
        ..asc()
    };
    let billing = h.service.history(&ctx, &locator, &only_billing).await.unwrap();
    assert_eq!(billing.len(), 2);
    assert!(billing.iter().all(|m| m.scope.as_deref() == Some("billing")));

    let removed = h
        .service
        .delete_by_topic(&ctx, &locator, Some("billing"))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let topics = h.service.topics(&ctx, &locator, None, None).await.unwrap();
    let counts: Vec<(Option<&str>, u64)> = topics
        .iter()
        .map(|t| (t.scope.as_deref(), t.message_count))
        .collect();
    assert_eq!(counts, vec![(None, 2), (Some("shipping"), 1)]);

    let removed = h.service.delete_by_topic(&ctx, &locator, None).await.unwrap();
    assert_eq!(removed, 2);
    let rest = h.service.history(&ctx, &locator, &asc()).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].scope.as_deref(), Some("shipping"));
}

#[tokio::test]
async fn topics_of_missing_thread_are_empty() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");
    let locator = ThreadLocator::new("acme:echo", "user-42");
    assert!(h.service.topics(&ctx, &locator, None, None).await.unwrap().is_empty());

    let err = h
        .service
        .delete_by_topic(&ctx, &locator, Some("billing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn foreign_workflow_id_is_rejected_without_writes() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    let command = MessageCommand {
        participant_id: "user-42".into(),
        workflow_id: Some("globex:support-agent:triage".into()),
        text: Some("hello".into()),
        ..MessageCommand::default()
    };
    let err = h.service.process_incoming(&ctx, &command).await.unwrap_err();
    assert!(matches!(err, ThreadlineError::Validation { ref field, .. } if field == "workflow_id"));

    for tenant in ["acme", "globex"] {
        let key = ThreadKey {
            tenant_id: tenant.into(),
            workflow_id: "globex:support-agent:triage".into(),
            participant_id: "user-42".into(),
        };
        assert!(h.storage.find_thread(&key).await.unwrap().is_none());
    }
    assert!(h.engine.calls().await.is_empty());
}

#[tokio::test]
async fn outgoing_reply_inherits_origin_and_data() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    let incoming = MessageCommand {
        origin: Some("web-widget".into()),
        data: Some(serde_json::json!({ "channel": "web", "session": "s-1" })),
        ..MessageCommand::chat("user-42", "support-agent:triage", "hello")
    };
    let thread_id = h.service.process_incoming(&ctx, &incoming).await.unwrap();

    let reply = MessageCommand::chat("user-42", "support-agent:triage", "hi, how can I help?");
    let reply_thread = h.service.process_outgoing(&ctx, &reply).await.unwrap();
    assert_eq!(reply_thread, thread_id);

    let newest = h
        .service
        .thread_history(&ctx, &thread_id, &HistoryParams::default())
        .await
        .unwrap();
    assert_eq!(newest[0].direction, MessageDirection::Outgoing);
    assert_eq!(newest[0].origin.as_deref(), Some("web-widget"));
    assert_eq!(newest[0].data, incoming.data);

    // replies are recorded only
    assert_eq!(h.engine.calls().await.len(), 1);
}

#[tokio::test]
async fn explicit_reply_fields_are_kept() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");

    let incoming = MessageCommand {
        origin: Some("web-widget".into()),
        ..MessageCommand::chat("user-42", "echo", "hello")
    };
    let thread_id = h.service.process_incoming(&ctx, &incoming).await.unwrap();

    let reply = MessageCommand {
        origin: Some("sms".into()),
        message_type: MessageType::Data,
        text: None,
        data: Some(serde_json::json!({ "card": 1 })),
        ..MessageCommand::chat("user-42", "echo", "")
    };
    h.service.process_outgoing(&ctx, &reply).await.unwrap();

    let newest = h
        .service
        .thread_history(&ctx, &thread_id, &HistoryParams::default())
        .await
        .unwrap();
    assert_eq!(newest[0].origin.as_deref(), Some("sms"));
    assert_eq!(newest[0].message_type, MessageType::Data);
    assert_eq!(newest[0].data, Some(serde_json::json!({ "card": 1 })));
}

#[tokio::test]
async fn archived_thread_is_reactivated_by_next_message() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");
    let command = MessageCommand::chat("user-42", "echo", "hello");

    let thread_id = h.service.process_incoming(&ctx, &command).await.unwrap();
    h.service.archive_thread(&ctx, &thread_id).await.unwrap();
    let archived = h.service.get_thread(&ctx, &thread_id).await.unwrap();
    assert_eq!(archived.status, ThreadStatus::Archived);

    let again = h.service.process_incoming(&ctx, &command).await.unwrap();
    assert_eq!(again, thread_id);
    let thread = h.service.get_thread(&ctx, &thread_id).await.unwrap();
    assert_eq!(thread.status, ThreadStatus::Active);
}

#[tokio::test]
async fn other_tenants_cannot_see_a_thread() {
    let h = TestHarness::new().await.unwrap();
    let acme = h.ctx("acme", "user-42");
    let globex = h.ctx("globex", "intruder");

    let thread_id = h
        .service
        .process_incoming(&acme, &MessageCommand::chat("user-42", "echo", "secret"))
        .await
        .unwrap();

    let err = h.service.get_thread(&globex, &thread_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h
        .service
        .thread_history(&globex, &thread_id, &HistoryParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.service.archive_thread(&globex, &thread_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // same workflow type inside globex is a separate thread
    let other = h
        .service
        .process_incoming(&globex, &MessageCommand::chat("user-42", "echo", "hi"))
        .await
        .unwrap();
    assert_ne!(other, thread_id);
}

#[tokio::test]
async fn delete_thread_removes_messages_and_row() {
    let h = TestHarness::new().await.unwrap();
    let ctx = h.ctx("acme", "user-42");
    for text in ["a", "b", "c"] {
        h.service
            .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", text))
            .await
            .unwrap();
    }

    let locator = ThreadLocator::new("acme:echo", "user-42");
    assert_eq!(h.service.delete_thread(&ctx, &locator).await.unwrap(), 3);
    assert!(h.service.find_thread(&ctx, &locator).await.unwrap().is_none());

    let err = h.service.delete_thread(&ctx, &locator).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cancelled_request_writes_nothing() {
    let h = TestHarness::new().await.unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RequestContext::new("acme")
        .with_actor("user-42")
        .with_cancellation(token);

    let err = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ThreadlineError::Cancelled));

    let live = h.ctx("acme", "user-42");
    let locator = ThreadLocator::new("acme:echo", "user-42");
    assert!(h.service.find_thread(&live, &locator).await.unwrap().is_none());
    assert!(h.engine.calls().await.is_empty());
}

#[tokio::test]
async fn expired_deadline_reports_timeout() {
    let h = TestHarness::new().await.unwrap();
    let ctx = RequestContext::new("acme").with_timeout(Duration::ZERO);

    let err = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ThreadlineError::Timeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn engine_outage_keeps_the_message() {
    let h = TestHarness::new().await.unwrap();
    h.engine.set_unavailable(true).await;
    let ctx = h.ctx("acme", "user-42");

    let err = h
        .service
        .process_incoming(&ctx, &MessageCommand::chat("user-42", "echo", "hello"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(err.public_message(), "orchestration engine unavailable");

    let locator = ThreadLocator::new("acme:echo", "user-42");
    let messages = h.service.history(&ctx, &locator, &asc()).await.unwrap();
    assert_eq!(messages.len(), 1);
}
