//! Feedback thread: append-only entries pushed to the other party.

mod common;

use common::{Harness, complaint_input, connect, next_event};
use sumbong_auth::Principal;
use sumbong_core::error::SumbongError;
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::complaint::AuthorType;
use sumbong_core::models::notification::{EntityRef, NotificationKind};
use sumbong_core::repository::{ComplaintRepository, Pagination};
use sumbong_workflow::feedback::MAX_MESSAGE_CHARS;

#[tokio::test]
async fn resident_entry_reaches_connected_admin_with_notification() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let complaint = h
        .complaint_service()
        .create(&reporter, complaint_input())
        .await
        .unwrap();

    // Earlier thread content that must not be re-sent.
    h.feedback()
        .post_entry(&reporter, complaint.id, "First message")
        .await
        .unwrap();

    let mut admin_stream = connect(&h.registry, admin.id()).await;
    let updated = h
        .feedback()
        .post_entry(&reporter, complaint.id, "  Any update on this?  ")
        .await
        .unwrap();
    assert_eq!(updated.feedback_entries.len(), 2);

    match next_event(&mut admin_stream).await {
        Some(RealtimeEvent::FeedbackThreadUpdate {
            complaint_id,
            entry,
        }) => {
            assert_eq!(complaint_id, complaint.id);
            assert_eq!(entry.message, "Any update on this?");
            assert_eq!(entry.author_type, AuthorType::User);
            assert_eq!(&entry, updated.feedback_entries.last().unwrap());
        }
        other => panic!("expected feedback_thread_update, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut admin_stream).await,
        Some(RealtimeEvent::AdminNotification { .. })
    ));

    let page = h
        .notices()
        .list(&admin, false, Pagination::default())
        .await
        .unwrap();
    let feedback: Vec<_> = page
        .items
        .iter()
        .filter(|n| n.kind == NotificationKind::UserFeedback)
        .collect();
    assert_eq!(feedback.len(), 2);
    assert!(
        feedback
            .iter()
            .all(|n| n.entity == EntityRef::Complaint(complaint.id))
    );
}

#[tokio::test]
async fn admin_reply_goes_to_reporter_only() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter_id = h.resident("ana@example.com").await;
    let reporter = Principal::Resident(reporter_id);
    let complaint = h
        .complaint_service()
        .create(&reporter, complaint_input())
        .await
        .unwrap();
    let unread_before = h.notices().unread_count(&admin).await.unwrap();

    let mut reporter_stream = connect(&h.registry, reporter_id).await;
    let mut admin_stream = connect(&h.registry, admin.id()).await;

    h.feedback()
        .post_entry(
            &Principal::Admin(admin.clone()),
            complaint.id,
            "A team was dispatched this morning.",
        )
        .await
        .unwrap();

    match next_event(&mut reporter_stream).await {
        Some(RealtimeEvent::FeedbackThreadUpdate { entry, .. }) => {
            assert_eq!(entry.author_type, AuthorType::Admin);
        }
        other => panic!("expected feedback_thread_update, got {other:?}"),
    }
    assert_eq!(next_event(&mut admin_stream).await, None);
    assert_eq!(
        h.notices().unread_count(&admin).await.unwrap(),
        unread_before
    );
}

#[tokio::test]
async fn thread_grows_in_order_without_rewrites() {
    let h = Harness::new().await;
    h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let complaint = h
        .complaint_service()
        .create(&reporter, complaint_input())
        .await
        .unwrap();

    let messages: Vec<String> = (1..=5).map(|n| format!("message {n}")).collect();
    let mut previous = Vec::new();
    for message in &messages {
        let updated = h
            .feedback()
            .post_entry(&reporter, complaint.id, message)
            .await
            .unwrap();
        assert_eq!(&updated.feedback_entries[..previous.len()], previous.as_slice());
        previous = updated.feedback_entries;
    }

    let stored = h.complaints.get_by_id(complaint.id).await.unwrap();
    let stored_messages: Vec<&str> = stored
        .feedback_entries
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(stored_messages, messages);
}

#[tokio::test]
async fn posting_with_nobody_connected_succeeds() {
    let h = Harness::new().await;
    h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let complaint = h
        .complaint_service()
        .create(&reporter, complaint_input())
        .await
        .unwrap();

    assert_eq!(h.registry.connection_count(), 0);
    h.feedback()
        .post_entry(&reporter, complaint.id, "Hello?")
        .await
        .unwrap();
}

#[tokio::test]
async fn entry_rules() {
    let h = Harness::new().await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let stranger = Principal::Resident(h.resident("ben@example.com").await);
    let complaint = h
        .complaint_service()
        .create(&reporter, complaint_input())
        .await
        .unwrap();
    let feedback = h.feedback();

    let err = feedback
        .post_entry(&reporter, complaint.id, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));

    let too_long = "x".repeat(MAX_MESSAGE_CHARS + 1);
    let err = feedback
        .post_entry(&reporter, complaint.id, &too_long)
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));

    let err = feedback
        .post_entry(&stranger, complaint.id, "Me too")
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::AuthorizationDenied { .. }));

    h.complaint_service()
        .delete(&reporter, complaint.id)
        .await
        .unwrap();
    let err = feedback
        .post_entry(&reporter, complaint.id, "Still there?")
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));

    let stored = h.complaints.get_by_id(complaint.id).await.unwrap();
    assert!(stored.feedback_entries.is_empty());
}
