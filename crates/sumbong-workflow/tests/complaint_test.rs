//! Complaint lifecycle, admin notifications and user management.

mod common;

use common::{Harness, complaint_input, connect, next_event};
use sumbong_auth::Principal;
use sumbong_core::error::SumbongError;
use sumbong_core::events::RealtimeEvent;
use sumbong_core::models::complaint::{ComplaintStatus, UpdateComplaint};
use sumbong_core::models::notification::NotificationKind;
use sumbong_core::models::user::UpdateUser;
use sumbong_core::repository::{ComplaintRepository, Pagination};

#[tokio::test]
async fn filing_notifies_every_admin() {
    let h = Harness::new().await;
    let first = h.admin("first@example.com").await;
    let second = h.admin("second@example.com").await;
    let reporter_id = h.resident("ana@example.com").await;

    let complaint = h
        .complaint_service()
        .create(&Principal::Resident(reporter_id), complaint_input())
        .await
        .unwrap();
    assert_eq!(complaint.reporter_id, reporter_id);
    assert_eq!(complaint.status, ComplaintStatus::Pending);

    for admin in [&first, &second] {
        let page = h
            .notices()
            .list(admin, true, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].kind, NotificationKind::NewComplaint);
        assert_eq!(page.items[0].meta["complaint_type"], "sanitation");
    }
}

#[tokio::test]
async fn admins_cannot_file_and_blank_fields_are_rejected() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let service = h.complaint_service();

    let err = service
        .create(&Principal::Admin(admin), complaint_input())
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::AuthorizationDenied { .. }));

    let mut input = complaint_input();
    input.description = " ".into();
    let err = service.create(&reporter, input).await.unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));

    let mut input = complaint_input();
    input.latitude = Some(123.0);
    let err = service.create(&reporter, input).await.unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));
}

#[tokio::test]
async fn status_change_is_pushed_to_reporter() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter_id = h.resident("ana@example.com").await;
    let service = h.complaint_service();
    let complaint = service
        .create(&Principal::Resident(reporter_id), complaint_input())
        .await
        .unwrap();

    let mut stream = connect(&h.registry, reporter_id).await;
    let updated = service
        .update_status(&admin, complaint.id, ComplaintStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, ComplaintStatus::InProgress);

    assert_eq!(
        next_event(&mut stream).await,
        Some(RealtimeEvent::StatusUpdate {
            complaint_id: complaint.id,
            status: ComplaintStatus::InProgress,
        })
    );
}

#[tokio::test]
async fn reporter_edits_until_solved() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let service = h.complaint_service();
    let complaint = service.create(&reporter, complaint_input()).await.unwrap();

    let updated = service
        .update_details(
            &reporter,
            complaint.id,
            UpdateComplaint {
                description: Some("Garbage now blocking the road".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Garbage now blocking the road");

    let err = service
        .update_details(
            &Principal::Admin(admin.clone()),
            complaint.id,
            UpdateComplaint::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::AuthorizationDenied { .. }));

    service
        .update_status(&admin, complaint.id, ComplaintStatus::Solved)
        .await
        .unwrap();
    let err = service
        .update_details(
            &reporter,
            complaint.id,
            UpdateComplaint {
                location: Some("Elsewhere".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));
}

#[tokio::test]
async fn residents_only_see_their_own_complaints() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let ana = Principal::Resident(h.resident("ana@example.com").await);
    let ben = Principal::Resident(h.resident("ben@example.com").await);
    let service = h.complaint_service();

    let complaint = service.create(&ana, complaint_input()).await.unwrap();
    service.create(&ben, complaint_input()).await.unwrap();

    let err = service.get(&ben, complaint.id).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
    assert!(service.get(&Principal::Admin(admin.clone()), complaint.id).await.is_ok());

    let mine = service.list_mine(&ana, Pagination::default()).await.unwrap();
    assert_eq!(mine.total, 1);

    let all = service
        .list_all(&admin, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
}

#[tokio::test]
async fn resident_delete_is_soft_admin_delete_is_hard() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    let service = h.complaint_service();

    let soft = service.create(&reporter, complaint_input()).await.unwrap();
    let hard = service.create(&reporter, complaint_input()).await.unwrap();

    service.delete(&reporter, soft.id).await.unwrap();
    let history = service.history(&reporter, Pagination::default()).await.unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.items[0].id, soft.id);
    let mine = service.list_mine(&reporter, Pagination::default()).await.unwrap();
    assert_eq!(mine.total, 1);

    service
        .delete(&Principal::Admin(admin), hard.id)
        .await
        .unwrap();
    let err = h.complaints.get_by_id(hard.id).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
}

#[tokio::test]
async fn notification_inbox_operations() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let reporter = Principal::Resident(h.resident("ana@example.com").await);
    for _ in 0..3 {
        h.complaint_service()
            .create(&reporter, complaint_input())
            .await
            .unwrap();
    }
    let notices = h.notices();

    assert_eq!(notices.unread_count(&admin).await.unwrap(), 3);
    let page = notices
        .list(&admin, false, Pagination::default())
        .await
        .unwrap();
    // Newest first.
    assert!(page.items[0].created_at >= page.items[2].created_at);

    notices.mark_read(&admin, page.items[0].id).await.unwrap();
    assert_eq!(notices.unread_count(&admin).await.unwrap(), 2);
    assert_eq!(notices.mark_all_read(&admin).await.unwrap(), 2);

    notices.delete(&admin, page.items[1].id).await.unwrap();
    let page = notices
        .list(&admin, false, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn user_management_hides_admins() {
    let h = Harness::new().await;
    let admin = h.admin("admin@example.com").await;
    let other_admin = h.admin("other@example.com").await;
    let resident = h.resident("ana@example.com").await;
    let users = h.user_service();

    let page = users
        .list_residents(&admin, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, resident);

    let err = users.get(&admin, other_admin.id()).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));
    let err = users.delete(&admin, other_admin.id()).await.unwrap_err();
    assert!(matches!(err, SumbongError::NotFound { .. }));

    let err = users
        .update_me(
            resident,
            UpdateUser {
                phone: Some("12345".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SumbongError::Validation { .. }));

    let updated = users
        .update_me(
            resident,
            UpdateUser {
                address: Some("Purok 7".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.address, "Purok 7");

    users.delete(&admin, resident).await.unwrap();
    assert!(users.me(resident).await.is_err());
}
