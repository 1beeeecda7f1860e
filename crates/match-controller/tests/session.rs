//! Session actor behavior tests.
//!
//! Relocated from `src/actors/session.rs`'s `#[cfg(test)] mod tests` so the
//! session tests exercise `match_controller` as an external crate — the same
//! compilation `mc-test-utils` links against — avoiding the dev-dependency
//! cycle that produces two incompatible instances of the crate's types under
//! the unit-test build. Assertions are unchanged.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use match_controller::actors::{GameSessionActor, GameSessionHandle, PlayerInfo};
use match_controller::channel::EventSink;
use match_controller::events::{ConnectionId, GameParams, ServerEvent};

use mc_test_utils::recording::RecordingSink;

    fn participants() -> (PlayerInfo, PlayerInfo) {
        (
            PlayerInfo {
                id: ConnectionId::new(),
                name: "alice".to_string(),
            },
            PlayerInfo {
                id: ConnectionId::new(),
                name: "bob".to_string(),
            },
        )
    }

    fn test_params() -> GameParams {
        GameParams {
            break_time: 10,
            match_time: 60,
        }
    }

    fn spawn_session(
        sink: &Arc<RecordingSink>,
    ) -> (PlayerInfo, PlayerInfo, GameSessionHandle, JoinHandle<()>) {
        let (inviter, invitee) = participants();
        let (handle, task) = GameSessionActor::spawn(
            inviter.clone(),
            invitee.clone(),
            test_params(),
            CancellationToken::new(),
            Arc::clone(sink) as Arc<dyn EventSink>,
        );
        (inviter, invitee, handle, task)
    }

    /// Drive the readiness handshake to match start.
    async fn start_match(
        sink: &Arc<RecordingSink>,
        inviter: &PlayerInfo,
        invitee: &PlayerInfo,
        handle: &GameSessionHandle,
    ) {
        handle.ready(inviter.id).await.unwrap();
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentReady))
            .await;
        handle.ready(invitee.id).await.unwrap();
        sink.wait_matching(inviter.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_handshake_starts_match_inviter_first() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);

        handle.ready(inviter.id).await.unwrap();
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentReady))
            .await;
        // The first readiness alone must not start the match.
        assert!(!sink
            .events_for(inviter.id)
            .iter()
            .any(|e| matches!(e, ServerEvent::StartGame { .. })));

        handle.ready(invitee.id).await.unwrap();
        let started = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
        assert_eq!(started, ServerEvent::StartGame { first_move: true });
        let started = sink
            .wait_matching(invitee.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
        assert_eq!(started, ServerEvent::StartGame { first_move: false });

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ready_does_not_start_match() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);

        handle.ready(inviter.id).await.unwrap();
        handle.ready(inviter.id).await.unwrap();
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentReady))
            .await;

        // Force the actor to settle by sending one more no-op message.
        handle.play(invitee.id, 0).await.unwrap();
        handle.ready(invitee.id).await.unwrap();
        sink.wait_matching(inviter.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;

        // Exactly one opponentReady reached the invitee, and the match
        // only started on the second distinct participant.
        let ready_count = sink
            .events_for(invitee.id)
            .iter()
            .filter(|e| matches!(e, ServerEvent::OpponentReady))
            .count();
        assert_eq!(ready_count, 1);

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_winning_line_ends_match() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        // alice: 0, 1, 2 (top row); bob: 3, 4.
        for (who, position) in [
            (inviter.id, 0),
            (invitee.id, 3),
            (inviter.id, 1),
            (invitee.id, 4),
            (inviter.id, 2),
        ] {
            handle.play(who, position).await.unwrap();
        }

        let over = sink
            .wait_matching(invitee.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;
        assert_eq!(
            over,
            ServerEvent::GameOver {
                winner: "alice".to_string(),
                message: None,
            }
        );
        let over = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;
        assert_eq!(
            over,
            ServerEvent::GameOver {
                winner: "alice".to_string(),
                message: Some("You win!".to_string()),
            }
        );

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_are_relayed_and_turns_alternate() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        handle.play(inviter.id, 4).await.unwrap();
        let relayed = sink
            .wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentMove { .. }))
            .await;
        assert_eq!(relayed, ServerEvent::OpponentMove { position: 4 });

        // It is now the invitee's turn; a second inviter move is stale.
        handle.play(inviter.id, 5).await.unwrap();
        handle.play(invitee.id, 0).await.unwrap();
        let relayed = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::OpponentMove { .. }))
            .await;
        assert_eq!(relayed, ServerEvent::OpponentMove { position: 0 });

        // The stale move was never relayed.
        let moves_seen_by_invitee = sink
            .events_for(invitee.id)
            .iter()
            .filter(|e| matches!(e, ServerEvent::OpponentMove { .. }))
            .count();
        assert_eq!(moves_seen_by_invitee, 1);

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_occupied_cell_forfeits_to_opponent() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        handle.play(inviter.id, 4).await.unwrap();
        // Invitee plays the same cell: forfeit.
        handle.play(invitee.id, 4).await.unwrap();

        let over = sink
            .wait_matching(invitee.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;
        match over {
            ServerEvent::GameOver { winner, message } => {
                assert_eq!(winner, "alice");
                assert!(message.unwrap().contains("illegal move"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        // Both sides are told.
        sink.wait_matching(inviter.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_move_is_dropped() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        handle.play(inviter.id, 9).await.unwrap();
        // Still the inviter's turn; a legal move works and no forfeit
        // happened.
        handle.play(inviter.id, 0).await.unwrap();
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentMove { .. }))
            .await;
        assert!(!sink
            .events_for(invitee.id)
            .iter()
            .any(|e| matches!(e, ServerEvent::GameOver { .. })));

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_notifies_friendship() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        // a b a / a b b / b a a by alternating turns, no winning line:
        // alice: 0 2 3 7 8, bob: 1 4 5 6.
        for (who, position) in [
            (inviter.id, 0),
            (invitee.id, 1),
            (inviter.id, 2),
            (invitee.id, 4),
            (inviter.id, 3),
            (invitee.id, 5),
            (inviter.id, 7),
            (invitee.id, 6),
            (inviter.id, 8),
        ] {
            handle.play(who, position).await.unwrap();
        }

        for id in [inviter.id, invitee.id] {
            let over = sink
                .wait_matching(id, |e| matches!(e, ServerEvent::GameOver { .. }))
                .await;
            assert_eq!(
                over,
                ServerEvent::GameOver {
                    winner: "Friendship".to_string(),
                    message: Some("Draw!".to_string()),
                }
            );
        }

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_starters_alternate_between_matches() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        // Quick win for alice ends match one.
        for (who, position) in [
            (inviter.id, 0),
            (invitee.id, 3),
            (inviter.id, 1),
            (invitee.id, 4),
            (inviter.id, 2),
        ] {
            handle.play(who, position).await.unwrap();
        }
        sink.wait_matching(inviter.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;
        sink.clear();

        // Next handshake: the invitee moves first this time.
        handle.ready(inviter.id).await.unwrap();
        handle.ready(invitee.id).await.unwrap();
        let started = sink
            .wait_matching(invitee.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
        assert_eq!(started, ServerEvent::StartGame { first_move: true });
        let started = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::StartGame { .. }))
            .await;
        assert_eq!(started, ServerEvent::StartGame { first_move: false });

        handle.cancel();
    }

    /// A break with nobody ready dismisses the session at break_time + 1s.
    #[tokio::test(start_paused = true)]
    async fn test_break_timeout_dismisses_session() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, task) = spawn_session(&sink);

        for id in [inviter.id, invitee.id] {
            let dismissed = sink
                .wait_matching(id, |e| matches!(e, ServerEvent::DismissGame { .. }))
                .await;
            assert_eq!(
                dismissed,
                ServerEvent::DismissGame {
                    reason: "Ran out of break time".to_string(),
                    was_timeout: true,
                }
            );
        }

        // The actor exits on break timeout.
        task.await.unwrap();
        assert!(!handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_timeout_declares_opponent_winner() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        // Nobody moves; the starter's (inviter's) clock runs out at 61s.
        tokio::time::advance(Duration::from_secs(61)).await;

        for id in [inviter.id, invitee.id] {
            let over = sink
                .wait_matching(id, |e| matches!(e, ServerEvent::GameOver { .. }))
                .await;
            assert_eq!(
                over,
                ServerEvent::GameOver {
                    winner: "bob".to_string(),
                    message: Some("Time's up! bob wins!".to_string()),
                }
            );
        }

        handle.cancel();
    }

    /// After the starter moves, only the opponent's clock burns time.
    #[tokio::test(start_paused = true)]
    async fn test_clock_alternation_only_mover_on_turn_burns_time() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, _task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        handle.play(inviter.id, 4).await.unwrap();
        sink.wait_matching(invitee.id, |e| matches!(e, ServerEvent::OpponentMove { .. }))
            .await;

        // 61s pass: the invitee (on turn) times out; the inviter's paused
        // clock must not fire.
        tokio::time::advance(Duration::from_secs(61)).await;

        let over = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::GameOver { .. }))
            .await;
        assert_eq!(
            over,
            ServerEvent::GameOver {
                winner: "alice".to_string(),
                message: Some("Time's up! alice wins!".to_string()),
            }
        );

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_grants_grace_then_dismisses() {
        let sink = RecordingSink::new();
        let (inviter, invitee, handle, task) = spawn_session(&sink);
        start_match(&sink, &inviter, &invitee, &handle).await;

        handle.leave(invitee.id).await.unwrap();
        let dismissed = sink
            .wait_matching(inviter.id, |e| matches!(e, ServerEvent::DismissGame { .. }))
            .await;
        assert_eq!(
            dismissed,
            ServerEvent::DismissGame {
                reason: "Opponent has left the game".to_string(),
                was_timeout: false,
            }
        );

        // Grace clock: break_time + 1s later the remaining participant is
        // dismissed too and the actor exits.
        let dismissed = sink
            .wait_matching(inviter.id, |e| {
                matches!(e, ServerEvent::DismissGame { was_timeout: true, .. })
            })
            .await;
        assert_eq!(
            dismissed,
            ServerEvent::DismissGame {
                reason: "Ran out of break time".to_string(),
                was_timeout: true,
            }
        );
        task.await.unwrap();

        // The leaver heard nothing.
        assert!(sink.events_for(invitee.id).iter().all(|e| !matches!(
            e,
            ServerEvent::DismissGame { .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_actor() {
        let sink = RecordingSink::new();
        let (_inviter, _invitee, handle, task) = spawn_session(&sink);

        handle.cancel();
        task.await.unwrap();
        assert!(handle.is_cancelled());
    }
