//! Integration tests for lobby flow scenarios
//!
//! These tests drive the LobbyManager the way the WebSocket dispatcher does
//! and verify broadcasts, state transitions and lobby lifecycle.

use quickmath::lobby::{
    BroadcastKind, IgnoreReason, LobbyBroadcast, LobbyConfig, LobbyManager, LobbyResponse,
    LobbyStatus,
};
use std::time::Duration;
use tokio::sync::mpsc;

const CODE: &str = "ABC123";

fn manager_with(config: LobbyConfig) -> LobbyManager {
    LobbyManager::new(config).unwrap()
}

fn manager() -> LobbyManager {
    manager_with(LobbyConfig::default())
}

async fn join(
    manager: &LobbyManager,
    code: &str,
    id: &str,
    name: &str,
) -> mpsc::Receiver<LobbyBroadcast> {
    let (tx, rx) = mpsc::channel(64);
    manager.join(code, id, name, tx).await.unwrap();
    rx
}

/// Drain everything already queued for a subscriber
fn drain(rx: &mut mpsc::Receiver<LobbyBroadcast>) -> Vec<LobbyBroadcast> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

async fn start_round(manager: &LobbyManager) -> (mpsc::Receiver<LobbyBroadcast>, mpsc::Receiver<LobbyBroadcast>) {
    let alice = join(manager, CODE, "p1", "Alice").await;
    let bob = join(manager, CODE, "p2", "Bob").await;
    manager.set_ready(CODE, "p1").await.unwrap();
    assert_eq!(
        manager.set_ready(CODE, "p2").await.unwrap(),
        LobbyResponse::Started
    );
    (alice, bob)
}

#[tokio::test]
async fn test_two_players_ready_up_and_start() {
    let manager = manager();
    let mut alice = join(&manager, CODE, "p1", "Alice").await;
    let mut bob = join(&manager, CODE, "p2", "Bob").await;
    drain(&mut alice);
    drain(&mut bob);

    let response = manager.set_ready(CODE, "p1").await.unwrap();
    assert_eq!(response, LobbyResponse::Ready);

    let updates = drain(&mut bob);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].event, BroadcastKind::LobbyUpdate);
    assert_eq!(updates[0].data.status, LobbyStatus::Waiting);
    assert!(updates[0].data.players["p1"].is_ready);
    assert!(!updates[0].data.players["p2"].is_ready);

    let response = manager.set_ready(CODE, "p2").await.unwrap();
    assert_eq!(response, LobbyResponse::Started);

    let updates = drain(&mut alice);
    let kinds: Vec<_> = updates.iter().map(|b| b.event).collect();
    assert_eq!(
        kinds,
        vec![
            BroadcastKind::LobbyUpdate,
            BroadcastKind::GameStart,
            BroadcastKind::LobbyUpdate
        ]
    );

    let start = &updates[1].data;
    assert_eq!(start.status, LobbyStatus::Playing);
    let (start_time, end_time) = (start.start_time.unwrap(), start.end_time.unwrap());
    assert_eq!(end_time - start_time, 60 * 1000);
}

#[tokio::test]
async fn test_lone_ready_player_never_starts() {
    let manager = manager();
    let mut alice = join(&manager, CODE, "p1", "Alice").await;

    assert_eq!(
        manager.set_ready(CODE, "p1").await.unwrap(),
        LobbyResponse::Ready
    );
    let last = drain(&mut alice).pop().unwrap();
    assert_eq!(last.data.status, LobbyStatus::Waiting);
}

#[tokio::test]
async fn test_scoring_during_round() {
    let manager = manager();
    let (mut alice, _bob) = start_round(&manager).await;
    drain(&mut alice);

    let response = manager.submit_answer(CODE, "p1", true).await.unwrap();
    assert_eq!(
        response,
        LobbyResponse::AnswerRecorded {
            correct: true,
            score: 1
        }
    );

    let update = drain(&mut alice).pop().unwrap();
    assert_eq!(update.event, BroadcastKind::ScoreUpdate);
    assert_eq!(update.data.players["p1"].score, 1);
    assert_eq!(update.data.players["p2"].score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_answer_keeps_score() {
    let manager = manager();
    let (_alice, _bob) = start_round(&manager).await;

    manager.submit_answer(CODE, "p1", true).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    let response = manager.submit_answer(CODE, "p1", false).await.unwrap();

    assert_eq!(
        response,
        LobbyResponse::AnswerRecorded {
            correct: false,
            score: 1
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_rapid_duplicate_answers_count_once() {
    let manager = manager();
    let (mut alice, _bob) = start_round(&manager).await;
    drain(&mut alice);

    manager.submit_answer(CODE, "p1", true).await.unwrap();
    let duplicate = manager.submit_answer(CODE, "p1", true).await.unwrap();
    assert_eq!(duplicate, LobbyResponse::Ignored(IgnoreReason::Debounced));

    // Only the accepted answer produced a broadcast
    let updates = drain(&mut alice);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].data.players["p1"].score, 1);

    tokio::time::advance(Duration::from_millis(300)).await;
    let response = manager.submit_answer(CODE, "p1", true).await.unwrap();
    assert_eq!(
        response,
        LobbyResponse::AnswerRecorded {
            correct: true,
            score: 2
        }
    );
}

#[tokio::test]
async fn test_answers_ignored_before_round() {
    let manager = manager();
    let mut alice = join(&manager, CODE, "p1", "Alice").await;
    drain(&mut alice);

    let response = manager.submit_answer(CODE, "p1", true).await.unwrap();
    assert_eq!(
        response,
        LobbyResponse::Ignored(IgnoreReason::WrongStatus(LobbyStatus::Waiting))
    );
    assert!(drain(&mut alice).is_empty());
}

#[tokio::test]
async fn test_answer_from_stranger_ignored() {
    let manager = manager();
    let (mut alice, _bob) = start_round(&manager).await;
    drain(&mut alice);

    let response = manager.submit_answer(CODE, "intruder", true).await.unwrap();
    assert_eq!(response, LobbyResponse::Ignored(IgnoreReason::UnknownPlayer));
    assert!(drain(&mut alice).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_round_ends_on_timer() {
    let manager = manager_with(LobbyConfig {
        duration_secs: 30,
        ..Default::default()
    });
    let (mut alice, _bob) = start_round(&manager).await;
    drain(&mut alice);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(
        manager.snapshot(CODE).await.unwrap().status,
        LobbyStatus::Playing
    );

    let end = alice.recv().await.unwrap();
    assert_eq!(end.event, BroadcastKind::GameEnd);
    assert_eq!(end.data.status, LobbyStatus::Finished);

    // Terminal: no more scoring
    let response = manager.submit_answer(CODE, "p1", true).await.unwrap();
    assert!(!response.is_applied());
}

#[tokio::test(start_paused = true)]
async fn test_leaving_finished_lobby_keeps_status() {
    let manager = manager_with(LobbyConfig {
        duration_secs: 5,
        ..Default::default()
    });
    let (mut alice, _bob) = start_round(&manager).await;

    let end = loop {
        let broadcast = alice.recv().await.unwrap();
        if broadcast.event == BroadcastKind::GameEnd {
            break broadcast;
        }
    };
    assert_eq!(end.data.status, LobbyStatus::Finished);

    assert_eq!(
        manager.leave(CODE, "p2").await.unwrap(),
        LobbyResponse::Left { remaining: 1 }
    );
    let update = alice.recv().await.unwrap();
    assert_eq!(update.event, BroadcastKind::LobbyUpdate);
    assert_eq!(update.data.status, LobbyStatus::Finished);
    assert_eq!(update.data.players.len(), 1);

    manager.disconnect("p1").await;
    assert_eq!(manager.lobby_count().await, 0);

    let mut carol = join(&manager, CODE, "p3", "Carol").await;
    let update = carol.recv().await.unwrap();
    assert_eq!(update.data.status, LobbyStatus::Waiting);
    assert_eq!(update.data.players.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_round_continues_when_roster_shrinks() {
    let manager = manager_with(LobbyConfig {
        duration_secs: 10,
        ..Default::default()
    });
    let (mut alice, _bob) = start_round(&manager).await;

    manager.leave(CODE, "p2").await.unwrap();
    let snapshot = manager.snapshot(CODE).await.unwrap();
    assert_eq!(snapshot.status, LobbyStatus::Playing);
    assert_eq!(snapshot.players.len(), 1);

    let end = loop {
        let broadcast = alice.recv().await.unwrap();
        if broadcast.event == BroadcastKind::GameEnd {
            break broadcast;
        }
    };
    assert_eq!(end.data.players.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_after_lobby_destroyed_is_noop() {
    let manager = manager_with(LobbyConfig {
        duration_secs: 5,
        ..Default::default()
    });
    let (_alice, _bob) = start_round(&manager).await;

    manager.leave(CODE, "p1").await.unwrap();
    manager.leave(CODE, "p2").await.unwrap();
    assert_eq!(manager.lobby_count().await, 0);

    // New lobby under the same code must not be finished by the old timer
    let mut carol = join(&manager, CODE, "p3", "Carol").await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = manager.snapshot(CODE).await.unwrap();
    assert_eq!(snapshot.status, LobbyStatus::Waiting);
    assert!(
        drain(&mut carol)
            .iter()
            .all(|b| b.event == BroadcastKind::LobbyUpdate)
    );
}

#[tokio::test]
async fn test_leave_notifies_remaining_players() {
    let manager = manager();
    let mut alice = join(&manager, CODE, "p1", "Alice").await;
    let mut bob = join(&manager, CODE, "p2", "Bob").await;
    drain(&mut alice);

    let response = manager.leave(CODE, "p2").await.unwrap();
    assert_eq!(response, LobbyResponse::Left { remaining: 1 });

    let update = drain(&mut alice).pop().unwrap();
    assert_eq!(update.event, BroadcastKind::LobbyUpdate);
    assert!(!update.data.players.contains_key("p2"));

    // The leaver is out of the broadcast group
    drain(&mut bob);
    manager.set_ready(CODE, "p1").await.unwrap();
    assert!(drain(&mut bob).is_empty());
}

#[tokio::test]
async fn test_empty_lobby_is_recreated_fresh() {
    let manager = manager();
    let (_alice, _bob) = start_round(&manager).await;
    manager.submit_answer(CODE, "p1", true).await.unwrap();

    manager.disconnect("p1").await;
    manager.disconnect("p2").await;
    assert_eq!(manager.lobby_count().await, 0);

    let mut alice = join(&manager, CODE, "p1", "Alice").await;
    let update = alice.recv().await.unwrap();
    assert_eq!(update.data.status, LobbyStatus::Waiting);
    assert_eq!(update.data.players.len(), 1);
    assert_eq!(update.data.players["p1"].score, 0);
    assert!(update.data.start_time.is_none());
}

#[tokio::test]
async fn test_rejoin_restores_membership() {
    let manager = manager();
    let (_alice, mut bob) = start_round(&manager).await;
    manager.submit_answer(CODE, "p1", true).await.unwrap();
    drain(&mut bob);

    let (tx, mut alice_again) = mpsc::channel(16);
    let response = manager.join(CODE, "p1", "Alice", tx).await.unwrap();
    assert_eq!(response, LobbyResponse::Joined { rejoined: true });

    let update = alice_again.recv().await.unwrap();
    assert_eq!(update.data.players["p1"].score, 0);
    assert_eq!(update.data.status, LobbyStatus::Playing);
    assert_eq!(drain(&mut bob).len(), 1);
}

#[tokio::test]
async fn test_concurrent_joins_share_one_lobby() {
    let manager = manager();
    let mut tasks = Vec::new();

    for i in 0..20 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let (tx, rx) = mpsc::channel(64);
            manager
                .join(CODE, &format!("p{i}"), &format!("Player {i}"), tx)
                .await
                .unwrap();
            rx
        }));
    }

    let mut receivers = Vec::new();
    for task in tasks {
        receivers.push(task.await.unwrap());
    }

    assert_eq!(manager.lobby_count().await, 1);
    assert_eq!(manager.snapshot(CODE).await.unwrap().players.len(), 20);
}

#[tokio::test]
async fn test_join_leave_churn_never_leaves_empty_lobby() {
    let manager = manager();
    let mut tasks = Vec::new();

    for i in 0..10 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("p{i}");
            for _ in 0..10 {
                let (tx, _rx) = mpsc::channel(64);
                manager.join(CODE, &id, "churn", tx).await.unwrap();
                let _ = manager.leave(CODE, &id).await;
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(manager.lobby_count().await, 0);
}
