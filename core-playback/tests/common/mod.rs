//! Hand-written bridge fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AssetKey, AssetKeyStatus, BackgroundTaskHost, BackgroundTaskId, Clock, Connection,
    EngineSignal, EngineSignalStream, LoadOptions, MediaAsset, MediaEngine, NetworkChangeStream,
    NetworkMonitor, NowPlayingInfo, RemoteCommand, RemoteCommandCenter, RemoteCommandEvent,
    RemoteCommandStream, SeekTolerance, TimeRange,
};
use chrono::{DateTime, TimeZone, Utc};
use core_playback::{AudioPlayer, AudioQuality, PlayableItem, PlayerConfig};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Let the producers and the dispatcher drain their queues.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn items(count: usize) -> Vec<Arc<PlayableItem>> {
    (0..count)
        .map(|i| {
            Arc::new(PlayableItem::with_url(
                format!("track-{}", i),
                format!("https://cdn.example.com/track-{}.mp3", i),
            ))
        })
        .collect()
}

/// Player config with the timers pushed out of the way.
pub fn quiet_config() -> PlayerConfig {
    PlayerConfig {
        adjust_quality_automatically: false,
        retry_timeout: Duration::from_secs(600),
        ..PlayerConfig::default()
    }
}

pub async fn player(engine: &Arc<FakeEngine>) -> AudioPlayer {
    player_with(engine, quiet_config()).await
}

pub async fn player_with(engine: &Arc<FakeEngine>, config: PlayerConfig) -> AudioPlayer {
    let core = CoreConfig::builder()
        .media_engine(engine.clone())
        .build()
        .expect("valid core config");
    AudioPlayer::new(core, config).await.expect("player created")
}

/// Item with a low, medium and high source.
pub fn graded_item(id: &str) -> Arc<PlayableItem> {
    let source = |quality: AudioQuality, name: &str| {
        (quality, format!("https://cdn.example.com/{}-{}.mp3", id, name))
    };
    Arc::new(
        PlayableItem::new(
            id,
            [
                source(AudioQuality::Low, "low"),
                source(AudioQuality::Medium, "medium"),
                source(AudioQuality::High, "high"),
            ],
        )
        .expect("item has sources"),
    )
}

// ============================================================================
// Engine
// ============================================================================

pub struct FakeAsset {
    url: String,
    status: Mutex<AssetKeyStatus>,
}

impl FakeAsset {
    pub fn fail(&self) {
        *self.status.lock() = AssetKeyStatus::Failed;
    }
}

#[async_trait]
impl MediaAsset for FakeAsset {
    fn url(&self) -> &str {
        &self.url
    }

    fn status_of(&self, _key: AssetKey) -> AssetKeyStatus {
        *self.status.lock()
    }

    async fn load_values(&self, _keys: &[AssetKey]) {}
}

struct ChannelSignals(UnboundedReceiver<EngineSignal>);

#[async_trait]
impl EngineSignalStream for ChannelSignals {
    async fn next(&mut self) -> Option<EngineSignal> {
        self.0.recv().await
    }
}

/// Engine double that records every command and lets the test push signals.
#[derive(Default)]
pub struct FakeEngine {
    pub assets: Mutex<HashMap<String, Arc<FakeAsset>>>,
    pub prepared: Mutex<Vec<String>>,
    pub loaded: Mutex<Vec<(String, LoadOptions)>>,
    pub plays: Mutex<Vec<f32>>,
    pub pauses: AtomicUsize,
    pub unloads: AtomicUsize,
    pub seeks: Mutex<Vec<(Duration, SeekTolerance)>>,
    pub session_active: AtomicBool,
    ready: AtomicBool,
    rate: Mutex<f32>,
    current_time: Mutex<Option<Duration>>,
    duration: Mutex<Option<Duration>>,
    loaded_range: Mutex<Option<TimeRange>>,
    seekable_range: Mutex<Option<TimeRange>>,
    signals: Mutex<Option<UnboundedSender<EngineSignal>>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push a signal to the current subscriber.
    pub fn emit(&self, signal: EngineSignal) {
        if let Some(sender) = self.signals.lock().as_ref() {
            sender.send(signal).ok();
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_current_time(&self, time: Option<Duration>) {
        *self.current_time.lock() = time;
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        *self.duration.lock() = duration;
    }

    pub fn set_loaded_range(&self, range: Option<TimeRange>) {
        *self.loaded_range.lock() = range;
    }

    pub fn set_seekable_range(&self, range: Option<TimeRange>) {
        *self.seekable_range.lock() = range;
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.loaded.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn prepared_urls(&self) -> Vec<String> {
        self.prepared.lock().clone()
    }

    pub fn asset(&self, url: &str) -> Option<Arc<FakeAsset>> {
        self.assets.lock().get(url).cloned()
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    fn prepare(&self, url: &str) -> Arc<dyn MediaAsset> {
        self.prepared.lock().push(url.to_string());
        let asset = Arc::new(FakeAsset {
            url: url.to_string(),
            status: Mutex::new(AssetKeyStatus::Loaded),
        });
        self.assets.lock().insert(url.to_string(), asset.clone());
        asset
    }

    async fn load(&self, asset: Arc<dyn MediaAsset>, options: LoadOptions) -> BridgeResult<()> {
        self.ready.store(false, Ordering::SeqCst);
        self.loaded.lock().push((asset.url().to_string(), options));
        Ok(())
    }

    async fn unload(&self) -> BridgeResult<()> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        *self.current_time.lock() = None;
        Ok(())
    }

    async fn play(&self, rate: f32) -> BridgeResult<()> {
        self.plays.lock().push(rate);
        *self.rate.lock() = rate;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        *self.rate.lock() = 0.0;
        Ok(())
    }

    fn rate(&self) -> f32 {
        *self.rate.lock()
    }

    async fn seek(&self, position: Duration, tolerance: SeekTolerance) -> BridgeResult<bool> {
        self.seeks.lock().push((position, tolerance));
        *self.current_time.lock() = Some(position);
        Ok(true)
    }

    fn current_time(&self) -> Option<Duration> {
        *self.current_time.lock()
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.lock()
    }

    fn is_ready_to_play(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn loaded_range(&self) -> Option<TimeRange> {
        *self.loaded_range.lock()
    }

    fn seekable_range(&self) -> Option<TimeRange> {
        *self.seekable_range.lock()
    }

    async fn set_session_active(&self, active: bool) -> BridgeResult<()> {
        self.session_active.store(active, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe_signals(&self) -> BridgeResult<Box<dyn EngineSignalStream>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.signals.lock() = Some(sender);
        Ok(Box::new(ChannelSignals(receiver)))
    }
}

// ============================================================================
// Network
// ============================================================================

struct ChannelChanges(UnboundedReceiver<Connection>);

#[async_trait]
impl NetworkChangeStream for ChannelChanges {
    async fn next(&mut self) -> Option<Connection> {
        self.0.recv().await
    }
}

pub struct FakeNetworkMonitor {
    connection: Mutex<Connection>,
    changes: Mutex<Option<UnboundedSender<Connection>>>,
}

impl FakeNetworkMonitor {
    pub fn new(connection: Connection) -> Arc<Self> {
        Arc::new(Self {
            connection: Mutex::new(connection),
            changes: Mutex::new(None),
        })
    }

    pub fn set(&self, connection: Connection) {
        *self.connection.lock() = connection;
        if let Some(sender) = self.changes.lock().as_ref() {
            sender.send(connection).ok();
        }
    }
}

#[async_trait]
impl NetworkMonitor for FakeNetworkMonitor {
    async fn current_connection(&self) -> Connection {
        *self.connection.lock()
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.changes.lock() = Some(sender);
        Ok(Box::new(ChannelChanges(receiver)))
    }
}

// ============================================================================
// Clock / background
// ============================================================================

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid date");
        Arc::new(Self(Mutex::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += chrono::Duration::from_std(by).expect("duration in range");
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[derive(Default)]
pub struct CountingHost {
    pub begun: AtomicUsize,
    pub ended: AtomicUsize,
}

impl CountingHost {
    pub fn outstanding(&self) -> usize {
        self.begun.load(Ordering::SeqCst) - self.ended.load(Ordering::SeqCst)
    }
}

impl BackgroundTaskHost for CountingHost {
    fn begin_background_task(&self) -> Option<BackgroundTaskId> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Some(BackgroundTaskId::new())
    }

    fn end_background_task(&self, _id: BackgroundTaskId) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Remote commands
// ============================================================================

struct ChannelCommands(UnboundedReceiver<RemoteCommandEvent>);

#[async_trait]
impl RemoteCommandStream for ChannelCommands {
    async fn next(&mut self) -> Option<RemoteCommandEvent> {
        self.0.recv().await
    }
}

pub struct FakeCommandCenter {
    supported: Vec<RemoteCommand>,
    pub enabled: Mutex<HashMap<RemoteCommand, bool>>,
    pub now_playing: Mutex<Vec<Option<NowPlayingInfo>>>,
    commands: Mutex<Option<UnboundedSender<RemoteCommandEvent>>>,
}

impl FakeCommandCenter {
    pub fn new(supported: Vec<RemoteCommand>) -> Arc<Self> {
        Arc::new(Self {
            supported,
            enabled: Mutex::new(HashMap::new()),
            now_playing: Mutex::new(Vec::new()),
            commands: Mutex::new(None),
        })
    }

    pub fn send(&self, command: RemoteCommandEvent) {
        if let Some(sender) = self.commands.lock().as_ref() {
            sender.send(command).ok();
        }
    }

    pub fn last_now_playing(&self) -> Option<NowPlayingInfo> {
        self.now_playing.lock().last().cloned().flatten()
    }
}

#[async_trait]
impl RemoteCommandCenter for FakeCommandCenter {
    fn supported_commands(&self) -> Vec<RemoteCommand> {
        self.supported.clone()
    }

    fn set_command_enabled(&self, command: RemoteCommand, enabled: bool) {
        self.enabled.lock().insert(command, enabled);
    }

    async fn subscribe_commands(&self) -> BridgeResult<Box<dyn RemoteCommandStream>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.commands.lock() = Some(sender);
        Ok(Box::new(ChannelCommands(receiver)))
    }

    fn update_now_playing(&self, info: Option<NowPlayingInfo>) {
        self.now_playing.lock().push(info);
    }
}
