//! Fan-out behaviour: who hears what, and in what order.

use super::helpers::{harness, request};
use crate::notifications::api::{Event, EventFilter};
use crate::queue::types::{QueuePriority, QueueStatus};
use uuid::Uuid;

#[tokio::test]
async fn hospital_subscriber_sees_queue_and_statistics_in_commit_order() {
    let h = harness();
    let hospital = Uuid::new_v4();

    let mut receiver = h
        .notifications
        .lock()
        .await
        .subscribe(
            "dashboard".to_string(),
            EventFilter::Hospital(hospital),
            "test:dashboard".to_string(),
        )
        .unwrap();

    h.manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap();

    // Per mutation: the ordered queue first, then the statistics snapshot
    let first = receiver.recv().await.unwrap();
    assert_eq!(first.kind(), "queue.changed");
    match first {
        Event::QueueChanged(ev) => {
            assert_eq!(ev.hospital_id, hospital);
            assert_eq!(ev.entries.len(), 1);
            assert_eq!(ev.entries[0].position, Some(1));
        }
        other => panic!("unexpected event {:?}", other.kind()),
    }

    let second = receiver.recv().await.unwrap();
    assert_eq!(second.kind(), "queue.statistics.changed");
    match second {
        Event::StatisticsChanged(ev) => {
            assert_eq!(ev.statistics.total_waiting, 1);
        }
        other => panic!("unexpected event {:?}", other.kind()),
    }

    // The targeted entry.updated is not a hospital-scope event
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn patient_subscriber_sees_only_their_entry_updates() {
    let h = harness();
    let hospital = Uuid::new_v4();

    let req = request(hospital, QueuePriority::Normal, "general");
    let patient = req.patient_id;

    let mut receiver = h
        .notifications
        .lock()
        .await
        .subscribe(
            "patient-app".to_string(),
            EventFilter::Patient(patient),
            "test:patient".to_string(),
        )
        .unwrap();

    let entry = h.manager.check_in(req).await.unwrap();
    // Another patient's traffic is invisible
    h.manager
        .check_in(request(hospital, QueuePriority::Emergency, "general"))
        .await
        .unwrap();
    h.manager
        .cancel(hospital, entry.id, Some("left".to_string()))
        .await
        .unwrap();

    let checked_in = receiver.recv().await.unwrap();
    match checked_in {
        Event::EntryUpdated(ev) => {
            assert_eq!(ev.patient_id, patient);
            assert_eq!(ev.entry.status, QueueStatus::Waiting);
        }
        other => panic!("unexpected event {:?}", other.kind()),
    }

    let cancelled = receiver.recv().await.unwrap();
    match cancelled {
        Event::EntryUpdated(ev) => {
            assert_eq!(ev.entry.status, QueueStatus::Cancelled);
        }
        other => panic!("unexpected event {:?}", other.kind()),
    }

    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn every_mutation_publishes_exactly_one_queue_changed() {
    let h = harness();
    let hospital = Uuid::new_v4();
    let doctor = Uuid::new_v4();

    let mut receiver = h
        .notifications
        .lock()
        .await
        .subscribe(
            "audit".to_string(),
            EventFilter::All,
            "test:audit".to_string(),
        )
        .unwrap();

    let entry = h
        .manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap();
    h.manager.call_next(hospital, doctor, None).await.unwrap();
    h.manager.complete(hospital, entry.id, None).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        kinds.push(event.kind());
    }

    // Three mutations, three [queue.changed, entry.updated, statistics] triples
    assert_eq!(
        kinds,
        vec![
            "queue.changed",
            "queue.entry.updated",
            "queue.statistics.changed",
            "queue.changed",
            "queue.entry.updated",
            "queue.statistics.changed",
            "queue.changed",
            "queue.entry.updated",
            "queue.statistics.changed",
        ]
    );
}

#[tokio::test]
async fn subscribers_in_other_hospitals_hear_nothing() {
    let h = harness();
    let ours = Uuid::new_v4();
    let theirs = Uuid::new_v4();

    let mut receiver = h
        .notifications
        .lock()
        .await
        .subscribe(
            "other-dashboard".to_string(),
            EventFilter::Hospital(theirs),
            "test:other".to_string(),
        )
        .unwrap();

    h.manager
        .check_in(request(ours, QueuePriority::Normal, "general"))
        .await
        .unwrap();

    assert!(receiver.try_recv().is_err());
}
