//! Integration tests for the playback state machine, driven through fake
//! bridges.

mod common;

use bridge_traits::{
    BufferStatus, Connection, EngineError, EngineErrorKind, EngineSignal, MediaEngine,
    SeekTolerance, TimeRange,
};
use common::{
    graded_item, items, player, player_with, quiet_config, settle, CountingHost, FakeEngine,
    FakeNetworkMonitor, FixedClock,
};
use core_playback::{
    AudioPlayer, AudioQuality, BufferingStrategy, PlaybackError, PlaybackState, PlayerConfig,
    PlayerMode, PlayerNotification, RepeatMode,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

async fn networked_player(
    engine: &Arc<FakeEngine>,
    monitor: &Arc<FakeNetworkMonitor>,
    clock: &Arc<FixedClock>,
    host: &Arc<CountingHost>,
    config: PlayerConfig,
) -> AudioPlayer {
    let core = CoreConfig::builder()
        .media_engine(engine.clone())
        .network_monitor(monitor.clone())
        .clock(clock.clone())
        .background_task_host(host.clone())
        .enable_network_awareness(true)
        .build()
        .expect("valid core config");
    AudioPlayer::new(core, config).await.expect("player created")
}

fn drain(notifications: &mut Receiver<PlayerNotification>) -> Vec<PlayerNotification> {
    let mut seen = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        seen.push(notification);
    }
    seen
}

fn ids(loaded: Vec<String>) -> Vec<String> {
    loaded
        .iter()
        .map(|url| {
            url.rsplit('/')
                .next()
                .unwrap_or_default()
                .trim_end_matches(".mp3")
                .to_string()
        })
        .collect()
}

/// Report the current item as playable, as an engine does once buffered.
async fn become_playable(engine: &FakeEngine) {
    engine.set_ready(true);
    engine.emit(EngineSignal::ReadyToPlay);
    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::LikelyToKeepUp));
    settle().await;
}

#[tokio::test]
async fn test_play_empty_queue_is_rejected() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    let result = player.play(Vec::new(), 0).await;

    assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));
    assert_eq!(player.state().await, PlaybackState::Stopped);
    assert!(player.items().await.is_empty());
    assert!(player.current_item().await.is_none());
}

#[tokio::test]
async fn test_play_out_of_range_start_index_is_rejected() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    let result = player.play(items(2), 2).await;

    assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));
    assert_eq!(player.state().await, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_play_walks_the_queue_then_stops() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let queue = items(3);

    player.play(queue.clone(), 1).await.expect("queue accepted");
    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(player.state().await, PlaybackState::Buffering);
    assert_eq!(player.current_item_index_in_queue().await, Some(1));
    assert_eq!(engine.loaded_urls(), vec![queue[1].url_for(Default::default()).1]);

    let next = player.next().await;
    assert_eq!(next.as_deref(), Some(queue[2].as_ref()));
    assert!(!player.has_next().await);

    let next = player.next().await;
    assert!(next.is_none());
    assert_eq!(player.state().await, PlaybackState::Stopped);
    assert!(player.items().await.is_empty());
    assert_eq!(engine.unloads.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_previous_at_start_is_noop() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let queue = items(2);

    player.play(queue.clone(), 0).await.expect("queue accepted");
    assert!(player.previous().await.is_none());
    assert_eq!(player.current_item().await.as_deref(), Some(queue[0].as_ref()));

    player.next().await;
    let previous = player.previous().await;
    assert_eq!(previous.as_deref(), Some(queue[0].as_ref()));
}

#[tokio::test]
async fn test_likely_to_keep_up_plays_and_preloads_upcoming() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let queue = items(3);
    let mut notifications = player.subscribe();

    player.play(queue.clone(), 0).await.expect("queue accepted");
    assert_eq!(player.state().await, PlaybackState::Buffering);
    let plays_before = engine.plays.lock().len();

    become_playable(&engine).await;

    assert_eq!(player.state().await, PlaybackState::Playing);
    let plays = engine.plays.lock().clone();
    assert!(plays.len() > plays_before);
    assert_eq!(plays.last(), Some(&1.0));

    let upcoming = queue[1].url_for(Default::default()).1.to_string();
    assert!(engine.prepared_urls().contains(&upcoming));

    let mut saw_playing = false;
    while let Ok(notification) = notifications.try_recv() {
        if let PlayerNotification::StateChanged { to, .. } = notification {
            saw_playing |= to == PlaybackState::Playing;
        }
    }
    assert!(saw_playing);
}

#[tokio::test]
async fn test_pause_is_kept_across_buffering() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    player.pause().await;
    assert_eq!(player.state().await, PlaybackState::Paused);

    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::Empty));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Buffering);

    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::LikelyToKeepUp));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_queued_seek_is_replaced_and_runs_exactly_on_ready() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    player.play(items(1), 0).await.expect("queue accepted");

    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    player
        .seek(
            Duration::from_secs(10),
            SeekTolerance::any(),
            Some(Box::new(move |finished: bool| {
                first_tx.send(finished).ok();
            })),
        )
        .await;
    player
        .seek(
            Duration::from_secs(20),
            SeekTolerance::any(),
            Some(Box::new(move |finished: bool| {
                second_tx.send(finished).ok();
            })),
        )
        .await;

    assert_eq!(first_rx.await, Ok(false));
    assert!(engine.seeks.lock().is_empty());

    engine.set_ready(true);
    engine.emit(EngineSignal::ReadyToPlay);
    assert_eq!(second_rx.await, Ok(true));

    let seeks = engine.seeks.lock().clone();
    assert_eq!(seeks, vec![(Duration::from_secs(20), SeekTolerance::zero())]);
}

#[tokio::test]
async fn test_seek_without_item_reports_not_finished() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    let (tx, rx) = oneshot::channel();
    player
        .seek(
            Duration::from_secs(5),
            SeekTolerance::any(),
            Some(Box::new(move |finished: bool| {
                tx.send(finished).ok();
            })),
        )
        .await;

    assert_eq!(rx.await, Ok(false));
}

#[tokio::test]
async fn test_seek_is_clamped_into_seekable_range() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    engine.set_seekable_range(Some(TimeRange::new(
        Duration::from_secs(0),
        Duration::from_secs(100),
    )));

    let (tx, rx) = oneshot::channel();
    player
        .seek(
            Duration::from_secs(500),
            SeekTolerance::any(),
            Some(Box::new(move |finished: bool| {
                tx.send(finished).ok();
            })),
        )
        .await;

    assert_eq!(rx.await, Ok(true));
    assert_eq!(engine.seeks.lock().last().map(|s| s.0), Some(Duration::from_secs(100)));
}

#[tokio::test]
async fn test_item_end_advances_to_next_item() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let queue = items(2);
    let mut notifications = player.subscribe();

    player.play(queue.clone(), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    engine.emit(EngineSignal::EndedPlaying(None));
    settle().await;

    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    let mut finished = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        if let PlayerNotification::FinishedPlaying { item_id } = notification {
            finished.push(item_id);
        }
    }
    assert_eq!(finished, vec![queue[0].id().to_string()]);
}

#[tokio::test]
async fn test_engine_failure_then_resume_reloads() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    engine.set_current_time(Some(Duration::from_secs(42)));

    engine.emit(EngineSignal::EndedPlaying(Some(EngineError::new(
        EngineErrorKind::Other,
        "decoder crashed",
    ))));
    settle().await;

    assert_eq!(player.state().await, PlaybackState::Failed);
    assert!(matches!(
        player.failed_error().await,
        Some(PlaybackError::UnrecoverableEngine(_))
    ));

    player.resume().await.expect("item loaded");
    assert_eq!(player.state().await, PlaybackState::Buffering);
    assert!(player.failed_error().await.is_none());
    assert_eq!(engine.loaded_urls().len(), 2);

    // The position is restored once the reloaded item is ready.
    engine.set_ready(true);
    engine.emit(EngineSignal::ReadyToPlay);
    settle().await;
    assert_eq!(
        engine.seeks.lock().last().map(|s| s.0),
        Some(Duration::from_secs(42))
    );
}

#[tokio::test]
async fn test_resume_without_item_fails() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    assert!(matches!(
        player.resume().await,
        Err(PlaybackError::NoItemLoaded)
    ));
}

#[tokio::test]
async fn test_set_rate_rejects_non_positive_rates() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    assert!(player.set_rate(0.0).await.is_err());
    assert!(player.set_rate(f32::NAN).await.is_err());
    player.set_rate(1.5).await.expect("valid rate");
    assert_eq!(player.rate().await, 1.5);
}

#[tokio::test]
async fn test_connection_loss_and_recovery_resumes_playing() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::WiFi);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;

    player.play(items(2), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    assert_eq!(player.state().await, PlaybackState::Playing);

    monitor.set(Connection::None);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
    assert!(host.outstanding() > 0);

    let plays_before = engine.plays.lock().len();
    clock.advance(Duration::from_secs(5));
    monitor.set(Connection::WiFi);
    settle().await;

    assert_eq!(player.state().await, PlaybackState::Playing);
    assert!(engine.plays.lock().len() > plays_before);
    assert_eq!(host.outstanding(), 0);
}

#[tokio::test]
async fn test_connection_recovery_after_window_does_not_resume() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::WiFi);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    monitor.set(Connection::None);
    settle().await;
    clock.advance(Duration::from_secs(120));
    monitor.set(Connection::WiFi);
    settle().await;

    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
}

#[tokio::test]
async fn test_paused_intent_survives_connection_loss() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::Cellular);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    player.pause().await;

    monitor.set(Connection::None);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);

    monitor.set(Connection::Cellular);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_offline_load_waits_for_connection() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::None);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;

    player.play(items(1), 0).await.expect("queue accepted");

    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
    assert!(engine.loaded_urls().is_empty());

    monitor.set(Connection::WiFi);
    settle().await;

    assert_eq!(player.state().await, PlaybackState::Buffering);
    assert_eq!(engine.loaded_urls().len(), 1);
}

#[tokio::test]
async fn test_interruption_pauses_and_resumes() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    engine.emit(EngineSignal::InterruptionBegan);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);

    engine.emit(EngineSignal::InterruptionEnded {
        should_resume: true,
    });
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_interruption_end_without_interruption_is_ignored() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    player.pause().await;

    engine.emit(EngineSignal::InterruptionEnded {
        should_resume: true,
    });
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_buffer_not_empty_strategy_starts_immediately() {
    let engine = FakeEngine::new();
    let core = CoreConfig::builder()
        .media_engine(engine.clone())
        .build()
        .expect("valid core config");
    let config = PlayerConfig {
        buffering_strategy: BufferingStrategy::PlayWhenBufferNotEmpty,
        ..quiet_config()
    };
    let player = AudioPlayer::new(core, config).await.expect("player created");

    player.play(items(1), 0).await.expect("queue accepted");

    let options = engine.loaded.lock()[0].1;
    assert!(!options.automatically_waits_to_minimize_stalling);
    assert!(!engine.plays.lock().is_empty());
}

#[tokio::test]
async fn test_stop_clears_everything() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(3), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    player.stop().await;

    assert_eq!(player.state().await, PlaybackState::Stopped);
    assert!(player.current_item().await.is_none());
    assert!(player.items().await.is_empty());
    assert!(!engine
        .session_active
        .load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_dropping_player_stops_dispatching() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let weak = player.downgrade();

    player.play(items(1), 0).await.expect("queue accepted");
    drop(player);
    settle().await;

    assert!(weak.upgrade().is_none());
    engine.emit(EngineSignal::ReadyToPlay);
}

#[tokio::test]
async fn test_repeat_one_plays_the_requested_start_item() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    player.set_mode(PlayerMode::new(RepeatMode::One, false)).await;
    let queue = items(3);

    player.play(queue.clone(), 1).await.expect("queue accepted");
    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));

    become_playable(&engine).await;
    engine.emit(EngineSignal::EndedPlaying(None));
    settle().await;

    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(ids(engine.loaded_urls()), vec!["track-1", "track-1"]);
}

#[tokio::test]
async fn test_duplicate_item_reports_its_own_queue_index() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let shared = items(1).remove(0);

    player
        .play(vec![shared.clone(), shared], 1)
        .await
        .expect("queue accepted");

    assert_eq!(player.current_item_index_in_queue().await, Some(1));
    assert!(!player.has_next().await);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_item_is_retried_then_skipped() {
    let engine = FakeEngine::new();
    let config = PlayerConfig {
        retry_timeout: Duration::from_secs(1),
        maximum_retry_count: 3,
        ..quiet_config()
    };
    let player = player_with(&engine, config).await;
    let mut notifications = player.subscribe();
    let queue = items(2);

    player.play(queue.clone(), 0).await.expect("queue accepted");
    player.resume().await.expect("item loaded");
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(
        ids(engine.loaded_urls()),
        vec!["track-0", "track-0", "track-0", "track-1"]
    );
    let gave_up = drain(&mut notifications).into_iter().any(|notification| {
        matches!(
            notification,
            PlayerNotification::Failed { item_id: Some(ref id), recoverable: true, .. }
                if id == "track-0"
        )
    });
    assert!(gave_up);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_on_last_item_stop() {
    let engine = FakeEngine::new();
    let config = PlayerConfig {
        retry_timeout: Duration::from_secs(1),
        maximum_retry_count: 2,
        ..quiet_config()
    };
    let player = player_with(&engine, config).await;

    player.play(items(1), 0).await.expect("queue accepted");
    player.resume().await.expect("item loaded");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(player.state().await, PlaybackState::Stopped);
    assert!(player.current_item().await.is_none());
}

#[tokio::test]
async fn test_item_skipped_to_while_offline_loads_on_recovery() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::WiFi);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;
    let queue = items(2);

    player.play(queue.clone(), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    engine.set_current_time(Some(Duration::from_secs(30)));

    monitor.set(Connection::None);
    settle().await;
    player.next().await;
    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
    assert_eq!(ids(engine.loaded_urls()), vec!["track-0"]);

    monitor.set(Connection::WiFi);
    settle().await;

    assert_eq!(player.state().await, PlaybackState::Buffering);
    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(ids(engine.loaded_urls()), vec!["track-0", "track-1"]);
    // The position of the previous item is not carried over
    become_playable(&engine).await;
    assert!(engine.seeks.lock().is_empty());
    assert_eq!(player.state().await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_end_signal_of_replaced_item_is_ignored() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let queue = items(3);

    player.play(queue.clone(), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    // The end of track-0 is still in flight when the listener skips ahead.
    engine.emit(EngineSignal::EndedPlaying(None));
    let skipped_to = player.next().await;
    settle().await;

    assert_eq!(skipped_to.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(player.current_item().await.as_deref(), Some(queue[1].as_ref()));
    assert_eq!(ids(engine.loaded_urls()), vec!["track-0", "track-1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_seek_observer_does_not_hold_the_player() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    player.play(items(1), 0).await.expect("queue accepted");

    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let (done_tx, done_rx) = oneshot::channel();
    player
        .seek(
            Duration::from_secs(10),
            SeekTolerance::any(),
            Some(Box::new(move |finished: bool| {
                release_rx.recv().ok();
                done_tx.send(finished).ok();
            })),
        )
        .await;

    let replaced = tokio::time::timeout(
        Duration::from_secs(1),
        player.seek(Duration::from_secs(20), SeekTolerance::any(), None),
    )
    .await;
    assert!(replaced.is_ok());
    let state = tokio::time::timeout(Duration::from_secs(1), player.state()).await;
    assert_eq!(state.ok(), Some(PlaybackState::Buffering));

    release_tx.send(()).ok();
    assert_eq!(done_rx.await, Ok(false));
}

#[tokio::test]
async fn test_session_invalidation_restarts_the_item() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let mut notifications = player.subscribe();

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    engine
        .session_active
        .store(false, std::sync::atomic::Ordering::SeqCst);

    engine.emit(EngineSignal::SessionInvalidated);
    settle().await;

    assert!(engine
        .session_active
        .load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(engine.loaded_urls().len(), 2);
    assert_eq!(player.state().await, PlaybackState::Buffering);
    let stopped = drain(&mut notifications).into_iter().any(|notification| {
        matches!(
            notification,
            PlayerNotification::StateChanged { from: PlaybackState::Playing, to: PlaybackState::Stopped }
        )
    });
    assert!(stopped);
}

#[tokio::test]
async fn test_route_change_that_paused_the_engine_pauses_the_player() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;

    player.play(items(1), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    engine.emit(EngineSignal::RouteChanged);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Playing);

    // Headphones unplugged: the engine stops on its own.
    engine.pause().await.expect("fake pause");
    engine.emit(EngineSignal::RouteChanged);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_full_preferred_buffer_starts_playback() {
    let engine = FakeEngine::new();
    let config = PlayerConfig {
        buffering_strategy: BufferingStrategy::PlayWhenPreferredBufferDurationFull,
        preferred_buffer_duration_before_playback: Duration::from_secs(20),
        ..quiet_config()
    };
    let player = player_with(&engine, config).await;

    player.play(items(1), 0).await.expect("queue accepted");
    settle().await;
    let plays_before = engine.plays.lock().len();
    engine.set_current_time(Some(Duration::ZERO));

    let short = TimeRange::new(Duration::ZERO, Duration::from_secs(10));
    engine.set_loaded_range(Some(short));
    engine.emit(EngineSignal::LoadedRangeExtended(short));
    settle().await;
    assert_eq!(engine.plays.lock().len(), plays_before);

    let enough = TimeRange::new(Duration::ZERO, Duration::from_secs(25));
    engine.set_loaded_range(Some(enough));
    engine.emit(EngineSignal::LoadedRangeExtended(enough));
    settle().await;
    assert_eq!(engine.plays.lock().len(), plays_before + 1);
}

#[tokio::test]
async fn test_progress_settles_missing_buffer_signal() {
    let engine = FakeEngine::new();
    let player = player(&engine).await;
    let mut notifications = player.subscribe();

    player.play(items(1), 0).await.expect("queue accepted");
    engine.emit(EngineSignal::Progressed(Duration::from_secs(1)));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Buffering);

    engine.set_ready(true);
    engine.set_duration(Some(Duration::from_secs(200)));
    engine.emit(EngineSignal::Progressed(Duration::from_secs(50)));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Playing);

    let percentages: Vec<f64> = drain(&mut notifications)
        .into_iter()
        .filter_map(|notification| match notification {
            PlayerNotification::Progressed { percentage, .. } => Some(percentage),
            _ => None,
        })
        .collect();
    assert_eq!(percentages, vec![25.0]);

    player.pause().await;
    engine.emit(EngineSignal::Progressed(Duration::from_secs(51)));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_connection_error_at_end_waits_then_resumes_playing() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::WiFi);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;
    let queue = items(2);

    player.play(queue.clone(), 0).await.expect("queue accepted");
    become_playable(&engine).await;

    engine.emit(EngineSignal::EndedPlaying(Some(EngineError::new(
        EngineErrorKind::NetworkConnectionLost,
        "connection reset",
    ))));
    settle().await;
    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
    assert_eq!(player.current_item().await.as_deref(), Some(queue[0].as_ref()));

    monitor.set(Connection::None);
    settle().await;
    monitor.set(Connection::WiFi);
    settle().await;
    assert_eq!(player.state().await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_item_ended_early_while_offline_is_not_finished() {
    let engine = FakeEngine::new();
    let monitor = FakeNetworkMonitor::new(Connection::WiFi);
    let clock = FixedClock::new();
    let host = Arc::new(CountingHost::default());
    let player = networked_player(&engine, &monitor, &clock, &host, quiet_config()).await;
    let queue = items(2);
    let mut notifications = player.subscribe();

    player.play(queue.clone(), 0).await.expect("queue accepted");
    become_playable(&engine).await;
    monitor.set(Connection::None);
    settle().await;

    engine.emit(EngineSignal::EndedPlaying(Some(EngineError::new(
        EngineErrorKind::ItemEndedEarly,
        "ran out of data",
    ))));
    settle().await;

    assert_eq!(player.state().await, PlaybackState::WaitingForConnection);
    assert_eq!(player.current_item().await.as_deref(), Some(queue[0].as_ref()));
    assert!(!drain(&mut notifications)
        .iter()
        .any(|notification| matches!(notification, PlayerNotification::FinishedPlaying { .. })));
}

#[tokio::test]
async fn test_repeated_buffering_lowers_quality_and_keeps_position() {
    let engine = FakeEngine::new();
    let config = PlayerConfig {
        adjust_quality_automatically: true,
        adjust_quality_after_interruption_count: 2,
        adjust_quality_time_interval: Duration::from_secs(600),
        ..quiet_config()
    };
    let player = player_with(&engine, config).await;
    let mut notifications = player.subscribe();
    let item = graded_item("graded");

    player.play_item(item).await.expect("queue accepted");
    become_playable(&engine).await;
    engine.set_current_time(Some(Duration::from_secs(30)));

    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::Empty));
    settle().await;
    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::LikelyToKeepUp));
    settle().await;
    engine.emit(EngineSignal::BufferStatusChanged(BufferStatus::Empty));
    settle().await;

    assert_eq!(player.current_quality().await, AudioQuality::Low);
    assert_eq!(ids(engine.loaded_urls()), vec!["graded-medium", "graded-low"]);

    become_playable(&engine).await;
    assert_eq!(
        engine.seeks.lock().last().copied(),
        Some((Duration::from_secs(30), SeekTolerance::zero()))
    );
    let changed = drain(&mut notifications).into_iter().any(|notification| {
        matches!(notification, PlayerNotification::QualityChanged { ref quality, .. } if quality == "low")
    });
    assert!(changed);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_interval_raises_quality() {
    let engine = FakeEngine::new();
    let config = PlayerConfig {
        adjust_quality_automatically: true,
        adjust_quality_time_interval: Duration::from_secs(30),
        ..quiet_config()
    };
    let player = player_with(&engine, config).await;

    player
        .play_item(graded_item("graded"))
        .await
        .expect("queue accepted");
    become_playable(&engine).await;
    engine.set_current_time(Some(Duration::from_secs(12)));

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(player.current_quality().await, AudioQuality::High);
    assert_eq!(ids(engine.loaded_urls()), vec!["graded-medium", "graded-high"]);
    become_playable(&engine).await;
    assert_eq!(
        engine.seeks.lock().last().map(|seek| seek.0),
        Some(Duration::from_secs(12))
    );
}
