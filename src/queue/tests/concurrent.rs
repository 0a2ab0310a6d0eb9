//! Serialization-domain behaviour under concurrent load.

use super::helpers::{harness, request, StallingRebuildRepository, StallingRepository};
use crate::core::config::QueueConfig;
use crate::notifications::manager::AsyncNotificationManager;
use crate::queue::error::QueueError;
use crate::queue::manager::QueueManager;
use crate::queue::types::QueuePriority;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[tokio::test]
async fn concurrent_check_ins_serialize_into_distinct_positions() {
    let h = harness();
    let hospital = Uuid::new_v4();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let manager = h.manager.clone();
            tokio::spawn(async move {
                manager
                    .check_in(request(hospital, QueuePriority::Normal, "general"))
                    .await
            })
        })
        .collect();

    let results = join_all(tasks).await;
    let mut sequences = HashSet::new();
    for result in results {
        let entry = result.unwrap().unwrap();
        assert!(sequences.insert(entry.sequence), "sequence issued twice");
    }

    // The committed queue holds all ten with contiguous positions
    let waiting = h.manager.waiting_entries(hospital).await.unwrap();
    assert_eq!(waiting.len(), 10);
    let positions: Vec<u32> = waiting.iter().map(|e| e.position.unwrap()).collect();
    assert_eq!(positions, (1..=10).collect::<Vec<u32>>());
}

#[tokio::test]
async fn hospitals_do_not_block_each_other() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    // Hospital A's writes stall inside its domain; B's pass through
    let repository = Arc::new(StallingRepository::new(a, 0));
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        QueueConfig::default(),
        Arc::new(Mutex::new(AsyncNotificationManager::new())),
    ));

    let stalled = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .check_in(request(a, QueuePriority::Normal, "general"))
                .await
        })
    };
    // Give the stalled command time to take A's lock
    tokio::task::yield_now().await;

    // Hospital B proceeds immediately despite A being mid-command
    let in_b = manager
        .check_in(request(b, QueuePriority::Normal, "general"))
        .await
        .unwrap();
    assert_eq!(in_b.position, Some(1));

    repository.release(1);
    stalled.await.unwrap().unwrap();
    assert_eq!(manager.waiting_entries(a).await.unwrap().len(), 1);
}

#[tokio::test]
async fn busy_domain_times_out_instead_of_queueing_forever() {
    let hospital = Uuid::new_v4();
    let repository = Arc::new(StallingRepository::new(hospital, 0));
    let config = QueueConfig {
        command_timeout_ms: 50,
        ..QueueConfig::default()
    };
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        config,
        Arc::new(Mutex::new(AsyncNotificationManager::new())),
    ));

    let stalled = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .check_in(request(hospital, QueuePriority::Normal, "general"))
                .await
        })
    };
    tokio::task::yield_now().await;

    let err = manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap_err();
    match err {
        QueueError::ActorBusyTimeout {
            hospital_id,
            waited_ms,
        } => {
            assert_eq!(hospital_id, hospital);
            assert!(waited_ms >= 50);
        }
        other => panic!("expected ActorBusyTimeout, got {other}"),
    }

    // The stalled command itself still completes once the write unblocks
    repository.release(1);
    stalled.await.unwrap().unwrap();
}

#[tokio::test]
async fn slow_rebuild_does_not_block_other_hospitals() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    // Hospital A's first-use rebuild hangs on its startup load
    let repository = Arc::new(StallingRebuildRepository::new(a));
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        QueueConfig::default(),
        Arc::new(Mutex::new(AsyncNotificationManager::new())),
    ));

    let stalled = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .check_in(request(a, QueuePriority::Normal, "general"))
                .await
        })
    };
    tokio::task::yield_now().await;

    // Hospital B must not queue behind A's rebuild
    let in_b = tokio::time::timeout(
        std::time::Duration::from_millis(500),
        manager.check_in(request(b, QueuePriority::Normal, "general")),
    )
    .await
    .expect("hospital B should not wait on hospital A's rebuild")
    .unwrap();
    assert_eq!(in_b.position, Some(1));

    repository.release(1);
    stalled.await.unwrap().unwrap();
    assert_eq!(manager.waiting_entries(a).await.unwrap().len(), 1);
}

#[tokio::test]
async fn hung_rebuild_times_out_like_any_busy_domain() {
    let hospital = Uuid::new_v4();
    let repository = Arc::new(StallingRebuildRepository::new(hospital));
    let config = QueueConfig {
        command_timeout_ms: 50,
        ..QueueConfig::default()
    };
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        config,
        Arc::new(Mutex::new(AsyncNotificationManager::new())),
    ));

    // First-use rebuild hangs, so the command's own timeout fires
    let err = manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::ActorBusyTimeout { .. }));

    // Once the store recovers the rebuild is retried and succeeds
    repository.release(1);
    let entry = manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap();
    assert_eq!(entry.position, Some(1));
}

#[tokio::test]
async fn snapshot_reads_do_not_enter_the_domain() {
    let hospital = Uuid::new_v4();
    let repository = Arc::new(StallingRepository::new(hospital, 1));
    let manager = Arc::new(QueueManager::with_notifications(
        repository.clone(),
        QueueConfig::default(),
        Arc::new(Mutex::new(AsyncNotificationManager::new())),
    ));

    // First check-in commits; the second stalls holding the actor lock
    manager
        .check_in(request(hospital, QueuePriority::Normal, "general"))
        .await
        .unwrap();
    let stalled = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .check_in(request(hospital, QueuePriority::Normal, "general"))
                .await
        })
    };
    tokio::task::yield_now().await;

    // Readers still see the last committed state
    let waiting = manager.waiting_entries(hospital).await.unwrap();
    assert_eq!(waiting.len(), 1);
    let stats = manager.statistics(hospital).await.unwrap();
    assert_eq!(stats.total_waiting, 1);

    repository.release(1);
    stalled.await.unwrap().unwrap();
    assert_eq!(manager.waiting_entries(hospital).await.unwrap().len(), 2);
}
