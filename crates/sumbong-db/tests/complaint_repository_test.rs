//! Integration tests for Complaint and Notification repositories using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use sumbong_core::error::SumbongError;
use sumbong_core::models::complaint::{
    AuthorType, ComplaintFilter, ComplaintStatus, CreateComplaint, EvidenceFile, FeedbackEntry,
    UpdateComplaint,
};
use sumbong_core::models::notification::{CreateNotification, EntityRef, NotificationKind};
use sumbong_core::repository::{ComplaintRepository, NotificationRepository, Pagination};
use sumbong_db::repository::{SurrealComplaintRepository, SurrealNotificationRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sumbong_db::run_migrations(&db).await.unwrap();
    db
}

fn complaint(reporter_id: Uuid) -> CreateComplaint {
    CreateComplaint {
        reporter_id,
        anonymous: false,
        confidential: false,
        incident_date: "2025-03-14".into(),
        incident_time: "22:30".into(),
        location: "Purok 4, near the chapel".into(),
        latitude: Some(14.5995),
        longitude: Some(120.9842),
        people_involved: "Neighbor at house 12".into(),
        description: "Loud karaoke past curfew".into(),
        requested_resolution: "Enforce the noise ordinance".into(),
        complaint_type: "noise".into(),
        evidence: vec![EvidenceFile {
            url: "https://files.example.com/clip.mp4".into(),
            storage_id: "evidence/clip".into(),
            content_type: Some("video/mp4".into()),
        }],
    }
}

fn entry(message: &str, author_type: AuthorType, offset_secs: i64) -> FeedbackEntry {
    FeedbackEntry {
        message: message.into(),
        author_type,
        created_at: Utc::now() + Duration::seconds(offset_secs),
    }
}

#[tokio::test]
async fn create_and_get_complaint() {
    let repo = SurrealComplaintRepository::new(setup().await);
    let reporter = Uuid::new_v4();

    let created = repo.create(complaint(reporter)).await.unwrap();
    assert_eq!(created.reporter_id, reporter);
    assert_eq!(created.status, ComplaintStatus::Pending);
    assert!(created.feedback_entries.is_empty());
    assert_eq!(created.evidence.len(), 1);
    assert_eq!(created.latitude, Some(14.5995));

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.description, "Loud karaoke past curfew");
}

#[tokio::test]
async fn feedback_thread_is_append_only_in_order() {
    let repo = SurrealComplaintRepository::new(setup().await);
    let created = repo.create(complaint(Uuid::new_v4())).await.unwrap();

    let posted = [
        entry("Any update?", AuthorType::User, 0),
        entry("A tanod was dispatched.", AuthorType::Admin, 1),
        entry("Thank you!", AuthorType::User, 2),
    ];

    let mut snapshots = Vec::new();
    for e in &posted {
        let after = repo.append_feedback(created.id, e.clone()).await.unwrap();
        snapshots.push(after.feedback_entries);
    }

    let thread = repo.get_by_id(created.id).await.unwrap().feedback_entries;
    assert_eq!(thread.len(), posted.len());
    assert_eq!(thread.as_slice(), posted.as_slice());

    // Every earlier snapshot is a prefix of the final thread.
    for (n, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.len(), n + 1);
        assert_eq!(snapshot.as_slice(), &thread[..n + 1]);
    }
}

#[tokio::test]
async fn append_to_missing_complaint_fails() {
    let repo = SurrealComplaintRepository::new(setup().await);

    let err = repo
        .append_feedback(Uuid::new_v4(), entry("hello", AuthorType::User, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
}

#[tokio::test]
async fn update_and_status_change() {
    let repo = SurrealComplaintRepository::new(setup().await);
    let created = repo.create(complaint(Uuid::new_v4())).await.unwrap();

    let updated = repo
        .update(
            created.id,
            UpdateComplaint {
                location: Some("Purok 4, beside the sari-sari store".into()),
                latitude: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.location, "Purok 4, beside the sari-sari store");
    assert!(updated.latitude.is_none());
    assert_eq!(updated.longitude, Some(120.9842));

    let progressed = repo
        .set_status(created.id, ComplaintStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(progressed.status, ComplaintStatus::InProgress);
}

#[tokio::test]
async fn list_filters_by_reporter_status_and_deletion() {
    let repo = SurrealComplaintRepository::new(setup().await);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let a1 = repo.create(complaint(alice)).await.unwrap();
    let a2 = repo.create(complaint(alice)).await.unwrap();
    repo.create(complaint(bob)).await.unwrap();

    repo.set_status(a1.id, ComplaintStatus::Solved).await.unwrap();
    repo.soft_delete(a2.id).await.unwrap();

    let alices = repo
        .list(
            ComplaintFilter {
                reporter_id: Some(alice),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(alices.total, 1);
    assert_eq!(alices.items[0].id, a1.id);

    let solved = repo
        .list(
            ComplaintFilter {
                status: Some(ComplaintStatus::Solved),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(solved.total, 1);

    let history = repo
        .list(
            ComplaintFilter {
                reporter_id: Some(alice),
                deleted: true,
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.items[0].id, a2.id);
    assert!(history.items[0].is_deleted());
}

#[tokio::test]
async fn hard_delete_removes_complaint() {
    let repo = SurrealComplaintRepository::new(setup().await);
    let created = repo.create(complaint(Uuid::new_v4())).await.unwrap();

    repo.delete(created.id).await.unwrap();

    let err = repo.get_by_id(created.id).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Notifications
// -----------------------------------------------------------------------

fn notification(recipient_id: Uuid, complaint_id: Uuid) -> CreateNotification {
    CreateNotification {
        recipient_id,
        kind: NotificationKind::UserFeedback,
        entity: EntityRef::Complaint(complaint_id),
        message: "New message from a resident".into(),
        meta: Some(serde_json::json!({ "preview": "Any update?" })),
    }
}

#[tokio::test]
async fn notifications_are_scoped_to_recipient() {
    let repo = SurrealNotificationRepository::new(setup().await);
    let admin_a = Uuid::new_v4();
    let admin_b = Uuid::new_v4();
    let complaint_id = Uuid::new_v4();

    let created = repo
        .create(notification(admin_a, complaint_id))
        .await
        .unwrap();
    repo.create(notification(admin_b, complaint_id))
        .await
        .unwrap();

    assert_eq!(created.entity, EntityRef::Complaint(complaint_id));
    assert_eq!(created.meta["preview"], "Any update?");
    assert!(!created.read);

    let page = repo
        .list_for_recipient(admin_a, false, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    // Another admin cannot mark or delete it.
    let err = repo.mark_read(admin_b, created.id).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
    let err = repo.delete(admin_b, created.id).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
}

#[tokio::test]
async fn mark_read_and_unread_counts() {
    let repo = SurrealNotificationRepository::new(setup().await);
    let admin = Uuid::new_v4();

    let first = repo
        .create(notification(admin, Uuid::new_v4()))
        .await
        .unwrap();
    repo.create(notification(admin, Uuid::new_v4()))
        .await
        .unwrap();
    repo.create(notification(admin, Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(repo.count_unread(admin).await.unwrap(), 3);

    let read = repo.mark_read(admin, first.id).await.unwrap();
    assert!(read.read);
    assert_eq!(read.message, first.message);
    assert_eq!(repo.count_unread(admin).await.unwrap(), 2);

    let unread = repo
        .list_for_recipient(admin, true, Pagination::default())
        .await
        .unwrap();
    assert_eq!(unread.total, 2);

    assert_eq!(repo.mark_all_read(admin).await.unwrap(), 2);
    assert_eq!(repo.count_unread(admin).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_notification() {
    let repo = SurrealNotificationRepository::new(setup().await);
    let admin = Uuid::new_v4();
    let created = repo
        .create(notification(admin, Uuid::new_v4()))
        .await
        .unwrap();

    repo.delete(admin, created.id).await.unwrap();

    let page = repo
        .list_for_recipient(admin, false, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}
