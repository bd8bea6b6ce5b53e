//! Behavioral suite for notification persistence and fan-out.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

mod common;

use common::harness;
use marketplace_core::notify::RECENT_LIMIT;
use marketplace_core::{
    NewNotification, Notification, NotificationKind, UserEvent, UserId,
};
use marketplace_testing::user;

fn note(recipient: UserId, title: &str) -> NewNotification {
    NewNotification::new(
        recipient,
        NotificationKind::System,
        title,
        format!("{title} body"),
    )
}

#[tokio::test]
async fn create_publishes_the_row_then_the_count() {
    let h = harness();
    let ada = user("Ada");
    let mut rx = h.registry.subscribe(ada.id).await;

    let persisted = h.notifications.create(note(ada.id, "Welcome")).await.unwrap();

    match rx.recv().await.unwrap() {
        UserEvent::Notification(payload) => {
            assert_eq!(payload.id, persisted.id);
            assert_eq!(payload.title, "Welcome");
            assert!(!payload.is_read);
        }
        other => panic!("expected the notification first, got {other:?}"),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        UserEvent::NotificationCount { unread_count: 1 }
    );

    let sent = h.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ada.id);
}

#[tokio::test]
async fn delivery_without_subscribers_still_persists() {
    let h = harness();
    let ada = user("Ada");

    h.notifications.create(note(ada.id, "Missed")).await.unwrap();

    // A client that connects later reconciles through the snapshot.
    let recent = h.notifications.recent(ada.id).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].title, "Missed");
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 1);
}

#[tokio::test]
async fn recent_is_capped_and_newest_first() {
    let h = harness();
    let ada = user("Ada");

    for i in 0..12 {
        h.notifications
            .create(note(ada.id, &format!("Number {i}")))
            .await
            .unwrap();
    }

    let recent = h.notifications.recent(ada.id).await.unwrap();
    assert_eq!(recent.len(), RECENT_LIMIT);
    assert_eq!(recent[0].title, "Number 11");
    assert_eq!(recent[RECENT_LIMIT - 1].title, "Number 2");
    // The overflow is still counted, just not listed.
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 12);
}

#[tokio::test]
async fn mark_read_decrements_the_count_and_pushes_it() {
    let h = harness();
    let ada = user("Ada");
    let ids: Vec<_> = {
        let mut ids = Vec::new();
        for i in 0..3 {
            let n = h
                .notifications
                .create(note(ada.id, &format!("Number {i}")))
                .await
                .unwrap();
            ids.push(n.id);
        }
        ids
    };
    let mut rx = h.registry.subscribe(ada.id).await;

    let changed = h.notifications.mark_read(ada.id, ids[0]).await.unwrap();
    assert!(changed);
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 2);
    assert_eq!(
        rx.recv().await.unwrap(),
        UserEvent::NotificationCount { unread_count: 2 }
    );

    // Re-marking the same row changes nothing but still reports the count.
    let changed = h.notifications.mark_read(ada.id, ids[0]).await.unwrap();
    assert!(!changed);
    assert_eq!(
        rx.recv().await.unwrap(),
        UserEvent::NotificationCount { unread_count: 2 }
    );
}

#[tokio::test]
async fn foreign_ids_are_silent_no_ops() {
    let h = harness();
    let ada = user("Ada");
    let eve = user("Eve");
    let theirs = h.notifications.create(note(ada.id, "Private")).await.unwrap();

    // Eve cannot read or archive Ada's notification, and cannot tell the id
    // exists at all.
    assert!(!h.notifications.mark_read(eve.id, theirs.id).await.unwrap());
    assert!(!h.notifications.archive(eve.id, theirs.id).await.unwrap());
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 1);
    let recent = h.notifications.recent(ada.id).await.unwrap();
    assert!(!recent[0].is_read && !recent[0].is_archived);
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
    let h = harness();
    let ada = user("Ada");
    for i in 0..3 {
        h.notifications
            .create(note(ada.id, &format!("Number {i}")))
            .await
            .unwrap();
    }

    assert_eq!(h.notifications.mark_all_read(ada.id).await.unwrap(), 3);
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 0);

    assert_eq!(h.notifications.mark_all_read(ada.id).await.unwrap(), 0);
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 0);
}

#[tokio::test]
async fn archive_removes_from_snapshot_and_count() {
    let h = harness();
    let ada = user("Ada");
    let keep = h.notifications.create(note(ada.id, "Keep")).await.unwrap();
    let gone = h.notifications.create(note(ada.id, "Archive me")).await.unwrap();
    let mut rx = h.registry.subscribe(ada.id).await;

    assert!(h.notifications.archive(ada.id, gone.id).await.unwrap());

    // Archiving re-pushes the snapshot, then the count.
    match rx.recv().await.unwrap() {
        UserEvent::NotificationList { notifications } => {
            let titles: Vec<_> = notifications.iter().map(|n| n.title.as_str()).collect();
            assert_eq!(titles, vec!["Keep"]);
        }
        other => panic!("expected the snapshot first, got {other:?}"),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        UserEvent::NotificationCount { unread_count: 1 }
    );

    let recent = h.notifications.recent(ada.id).await.unwrap();
    assert_eq!(recent.iter().map(|n| n.id).collect::<Vec<_>>(), vec![keep.id]);

    // Archived rows never come back unread.
    assert!(!h.notifications.archive(ada.id, gone.id).await.unwrap());
    assert!(!h.notifications.mark_read(ada.id, gone.id).await.unwrap());
    assert_eq!(h.notifications.unread_count(ada.id).await.unwrap(), 1);
}

#[tokio::test]
async fn events_reach_every_connection_of_the_recipient_only() {
    let h = harness();
    let ada = user("Ada");
    let eve = user("Eve");
    let mut phone = h.registry.subscribe(ada.id).await;
    let mut laptop = h.registry.subscribe(ada.id).await;
    let mut other = h.registry.subscribe(eve.id).await;

    h.notifications.create(note(ada.id, "Ping")).await.unwrap();

    for rx in [&mut phone, &mut laptop] {
        assert!(matches!(
            rx.recv().await.unwrap(),
            UserEvent::Notification(_)
        ));
    }
    assert!(other.try_recv().is_err());
}

#[tokio::test]
async fn snapshot_reflects_read_state() {
    let h = harness();
    let ada = user("Ada");
    let first = h.notifications.create(note(ada.id, "First")).await.unwrap();
    h.notifications.create(note(ada.id, "Second")).await.unwrap();

    h.notifications.mark_read(ada.id, first.id).await.unwrap();

    let recent = h.notifications.recent(ada.id).await.unwrap();
    let by_title = |title: &str| -> &Notification {
        recent.iter().find(|n| n.title == title).unwrap()
    };
    assert!(by_title("First").is_read);
    assert!(!by_title("Second").is_read);
}
