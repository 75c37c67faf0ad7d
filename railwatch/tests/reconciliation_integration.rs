//! Integration tests for train location reconciliation.
//!
//! These tests drive the lifecycle manager end to end with mock clients:
//! - Sticky merge across source fallbacks
//! - WebSocket → Polling → Simulation fallback chain
//! - Teardown and stale-result discarding on train switch
//! - Simulation route cycling and manual retry
//! - Live status running alongside the active topology
//!
//! Run with: `cargo test --test reconciliation_integration`

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use railwatch::location::live_status::{LiveStatus, LiveStatusClient, Station};
use railwatch::location::polling::LocationClient;
use railwatch::location::websocket::{FeedConnector, LocationFeed};
use railwatch::location::{
    Coordinates, LifecycleConfig, LocationError, LocationPayload, LocationSources,
    LocationUpdate, ReconciliationController, Route, SourceError, SourceTopology,
    SubscriptionLifecycleManager, TrainId, TrainStatus, UpdateSource, WatchState, WatchStatus,
    Waypoint,
};

// ============================================================================
// Test Helpers
// ============================================================================

const NEW_DELHI: (f64, f64) = (28.6139, 77.2090);
const KANPUR: (f64, f64) = (26.4499, 80.3319);
const HOWRAH: (f64, f64) = (22.5726, 88.3639);
const CHENNAI: (f64, f64) = (13.0827, 80.2707);
const MUMBAI: (f64, f64) = (19.0760, 72.8777);

type Frames = mpsc::UnboundedSender<Result<String, SourceError>>;

/// Push feed that replays scripted frames, or stays silent when unscripted.
struct MockFeed {
    frames: Option<mpsc::UnboundedReceiver<Result<String, SourceError>>>,
    closes: Arc<AtomicUsize>,
}

impl LocationFeed for MockFeed {
    async fn next_text(&mut self) -> Option<Result<String, SourceError>> {
        match self.frames.as_mut() {
            Some(frames) => frames.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector with per-train behavior: refuse, replay frames, or stay silent.
#[derive(Default)]
struct MockConnector {
    refused: Mutex<HashSet<String>>,
    feeds: Mutex<HashMap<String, mpsc::UnboundedReceiver<Result<String, SourceError>>>>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

impl MockConnector {
    fn refuse(&self, train: &str) {
        self.refused.lock().insert(train.to_string());
    }

    fn accept(&self, train: &str) {
        self.refused.lock().remove(train);
    }

    fn script(&self, train: &str) -> Frames {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().insert(train.to_string(), rx);
        tx
    }
}

impl FeedConnector for MockConnector {
    type Feed = MockFeed;

    async fn connect(&self, url: &str) -> Result<MockFeed, SourceError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let train = url.rsplit('/').next().unwrap_or_default().to_string();
        if self.refused.lock().contains(&train) {
            return Err(SourceError::Connect("connection refused".to_string()));
        }
        let frames = self.feeds.lock().remove(&train);
        Ok(MockFeed {
            frames,
            closes: Arc::clone(&self.closes),
        })
    }
}

#[derive(Clone)]
enum Reply {
    Location { lat: f64, lng: f64, delay: Duration },
    Status(u16),
    Crash,
}

/// REST client answering per train; unknown trains get HTTP 500.
#[derive(Default)]
struct MockClient {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockClient {
    fn reply(&self, train: &str, reply: Reply) {
        self.replies.lock().insert(train.to_string(), reply);
    }

    fn calls(&self, train: &str) -> usize {
        self.calls.lock().get(train).copied().unwrap_or(0)
    }
}

impl LocationClient for MockClient {
    async fn fetch_location(&self, train_id: &TrainId) -> Result<LocationPayload, SourceError> {
        *self.calls.lock().entry(train_id.to_string()).or_default() += 1;
        let reply = self
            .replies
            .lock()
            .get(train_id.as_str())
            .cloned()
            .unwrap_or(Reply::Status(500));

        match reply {
            Reply::Location { lat, lng, delay } => {
                tokio::time::sleep(delay).await;
                Ok(LocationPayload {
                    lat: Some(lat),
                    lng: Some(lng),
                    ..Default::default()
                })
            }
            Reply::Status(code) => Err(SourceError::Status(code)),
            Reply::Crash => panic!("location client crashed"),
        }
    }
}

/// Live status feed reporting a delayed train at Kanpur.
struct MockLiveStatus {
    calls: AtomicUsize,
}

impl LiveStatusClient for MockLiveStatus {
    async fn fetch_status(&self, _train_id: &TrainId) -> Result<LiveStatus, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LiveStatus {
            current_station: Station {
                code: "CNB".to_string(),
                name: "Kanpur Central".to_string(),
                coordinates: Some(Coordinates::new(KANPUR.0, KANPUR.1)),
            },
            next_station: None,
            delay_minutes: 7,
            speed_kmph: None,
            status: Some(TrainStatus::Delayed),
            eta: None,
            last_updated: None,
        })
    }
}

type Manager = SubscriptionLifecycleManager<MockConnector, MockClient>;

struct Harness {
    manager: Manager,
    controller: Arc<ReconciliationController>,
    connector: Arc<MockConnector>,
    client: Arc<MockClient>,
}

fn create_harness() -> Harness {
    let controller = Arc::new(ReconciliationController::new());
    let connector = Arc::new(MockConnector::default());
    let client = Arc::new(MockClient::default());
    let sources: LocationSources<MockConnector, MockClient> = LocationSources {
        connector: Arc::clone(&connector),
        client: Arc::clone(&client),
        live_status: None,
    };
    let manager = SubscriptionLifecycleManager::new(
        Arc::clone(&controller),
        sources,
        LifecycleConfig::default(),
    );
    Harness {
        manager,
        controller,
        connector,
        client,
    }
}

/// Rajdhani route: New Delhi → Kanpur Central → Howrah.
fn rajdhani_route() -> Route {
    Route::new(vec![
        Waypoint::station("New Delhi", NEW_DELHI.0, NEW_DELHI.1),
        Waypoint::station("Kanpur Central", KANPUR.0, KANPUR.1),
        Waypoint::station("Howrah", HOWRAH.0, HOWRAH.1),
    ])
}

fn chennai_route() -> Route {
    Route::new(vec![
        Waypoint::station("Chennai Central", CHENNAI.0, CHENNAI.1),
        Waypoint::new(MUMBAI.0 + 1.0, MUMBAI.1 + 1.0),
    ])
}

fn coords(point: (f64, f64)) -> Coordinates {
    Coordinates::new(point.0, point.1)
}

fn location_frame(train: &str, lat: f64, lng: f64, chainage: &str) -> String {
    format!(
        r#"{{"type":"location_update","trainId":"{}","data":{{"lat":{},"lng":{},"chainage":"{}","speedKmph":110,"status":"On Time","nextStation":"Kanpur Central","eta":"14:25"}}}}"#,
        train, lat, lng, chainage
    )
}

async fn wait_for_state(mut status: watch::Receiver<WatchStatus>, state: WatchState) {
    tokio::time::timeout(Duration::from_secs(60), status.wait_for(|s| s.state == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", state))
        .expect("status channel closed");
}

/// Let spawned tasks run without crossing an adapter interval.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ============================================================================
// Merge Semantics
// ============================================================================

#[tokio::test]
async fn test_sticky_merge_keeps_fields_absent_from_update() {
    let controller = ReconciliationController::new();
    controller
        .seed("12001", LocationUpdate::at(NEW_DELHI.0, NEW_DELHI.1))
        .unwrap();

    controller
        .merge(
            LocationUpdate::at(27.0, 78.0).with_chainage("200"),
            UpdateSource::WebSocket,
        )
        .unwrap();
    let snapshot = controller
        .merge(LocationUpdate::at(27.5, 79.0), UpdateSource::Polling)
        .unwrap();

    assert_eq!(snapshot.chainage_km.as_deref(), Some("200"));
    assert_eq!(snapshot.coordinates, Coordinates::new(27.5, 79.0));
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::Polling));
}

#[tokio::test]
async fn test_empty_update_rejected_without_touching_snapshot() {
    let controller = ReconciliationController::new();
    let seeded = controller
        .seed("12001", LocationUpdate::at(NEW_DELHI.0, NEW_DELHI.1))
        .unwrap();

    let result = controller.merge(LocationUpdate::default(), UpdateSource::WebSocket);

    assert!(matches!(result, Err(LocationError::MalformedUpdate(_))));
    let current = controller.current_snapshot().unwrap();
    assert!(Arc::ptr_eq(&seeded, &current));
}

// ============================================================================
// Fallback Chain
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_websocket_error_falls_back_to_polling() {
    let h = create_harness();
    h.connector.refuse("12001");
    h.client.reply(
        "12001",
        Reply::Location {
            lat: KANPUR.0,
            lng: KANPUR.1,
            delay: Duration::ZERO,
        },
    );

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::PollingFallback).await;
    settle().await;

    assert_eq!(h.manager.topology(), Some(SourceTopology::PollingFallback));
    assert!(h.client.calls("12001") >= 1);

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::Polling));
    assert_eq!(snapshot.coordinates, coords(KANPUR));
    assert_eq!(h.manager.live_resources(), 1);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_fallback_keeps_websocket_chainage() {
    let h = create_harness();
    let frames = h.connector.script("12001");
    frames
        .send(Ok(location_frame("12001", 27.2, 79.0, "441.2")))
        .unwrap();
    h.client.reply(
        "12001",
        Reply::Location {
            lat: KANPUR.0,
            lng: KANPUR.1,
            delay: Duration::ZERO,
        },
    );

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::WebSocketPrimary).await;

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::WebSocket));
    assert_eq!(snapshot.chainage_km.as_deref(), Some("441.2"));
    assert_eq!(snapshot.status, Some(TrainStatus::OnTime));

    frames
        .send(Err(SourceError::Closed("connection reset".to_string())))
        .unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::PollingFallback).await;
    settle().await;

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::Polling));
    assert_eq!(snapshot.coordinates, coords(KANPUR));
    assert_eq!(snapshot.chainage_km.as_deref(), Some("441.2"));
    assert_eq!(snapshot.speed_kmph, Some(110.0));
    assert_eq!(snapshot.eta.as_deref(), Some("14:25"));
    assert_eq!(h.connector.closes.load(Ordering::SeqCst), 1);

    h.manager.stop().await;
}

/// Rajdhani 12001 with no network: the socket errors, the first poll gets
/// HTTP 500, and the simulation takes over from the first waypoint.
#[tokio::test(start_paused = true)]
async fn test_rajdhani_falls_back_to_simulation() {
    let h = create_harness();
    h.connector.refuse("12001");
    h.client.reply("12001", Reply::Status(500));

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::SimulationOnly).await;
    settle().await;

    assert_eq!(h.client.calls("12001"), 1);
    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.train_id.as_str(), "12001");
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::Simulation));
    assert_eq!(snapshot.coordinates, coords(NEW_DELHI));
    assert_eq!(snapshot.next_station.as_deref(), Some("Kanpur Central"));
    assert_eq!(h.manager.live_resources(), 1);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_crashed_polling_task_counts_as_failure() {
    let h = create_harness();
    h.connector.refuse("12001");
    h.client.reply("12001", Reply::Crash);

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::SimulationOnly).await;
    settle().await;

    assert_eq!(h.client.calls("12001"), 1);
    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::Simulation));
    assert_eq!(h.manager.live_resources(), 1);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_simulation_cycles_route() {
    let h = create_harness();
    h.connector.refuse("12001");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.controller.subscribe(move |location| {
        if location.last_update_source == Some(UpdateSource::Simulation) {
            sink.lock().push(location.coordinates);
        }
    });

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::SimulationOnly).await;
    tokio::time::sleep(Duration::from_millis(4 * 3000 + 10)).await;

    let seen = seen.lock().clone();
    assert!(seen.len() >= 5, "expected five ticks, got {}", seen.len());
    assert_eq!(
        &seen[..5],
        &[
            coords(NEW_DELHI),
            coords(KANPUR),
            coords(HOWRAH),
            coords(NEW_DELHI),
            coords(KANPUR),
        ]
    );

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_retry_leaves_simulation() {
    let h = create_harness();
    h.connector.refuse("12001");

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::SimulationOnly).await;

    h.connector.accept("12001");
    let frames = h.connector.script("12001");
    frames
        .send(Ok(location_frame("12001", 27.2, 79.0, "310.0")))
        .unwrap();

    assert!(h.manager.retry().await);
    wait_for_state(h.manager.subscribe_state(), WatchState::WebSocketPrimary).await;

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.last_update_source, Some(UpdateSource::WebSocket));
    assert_eq!(snapshot.chainage_km.as_deref(), Some("310.0"));
    assert_eq!(h.manager.live_resources(), 1);

    // Only meaningful in SimulationOnly
    assert!(!h.manager.retry().await);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_retry_without_watch_is_noop() {
    let h = create_harness();
    assert!(!h.manager.retry().await);
    assert_eq!(h.manager.state(), WatchState::Idle);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_switch_discards_late_result_from_previous_train() {
    let h = create_harness();
    h.connector.refuse("12001");
    h.client.reply(
        "12001",
        Reply::Location {
            lat: MUMBAI.0,
            lng: MUMBAI.1,
            delay: Duration::from_secs(4),
        },
    );

    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(h.manager.subscribe_state(), WatchState::PollingFallback).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.client.calls("12001"), 1, "request should be in flight");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.controller.subscribe(move |location| {
        let entry = (location.train_id.to_string(), location.coordinates);
        sink.lock().push(entry);
    });

    h.manager.watch("12002", chennai_route()).await.unwrap();
    settle().await;
    assert_eq!(h.manager.live_resources(), 1);

    // Well past the moment the old request would have resolved
    tokio::time::sleep(Duration::from_secs(20)).await;

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.train_id.as_str(), "12002");
    assert_eq!(snapshot.coordinates, coords(CHENNAI));
    assert_eq!(h.manager.watched_train().unwrap().as_str(), "12002");
    assert_eq!(h.manager.live_resources(), 1);
    assert_eq!(h.client.calls("12001"), 1);

    let seen = seen.lock();
    assert!(seen.iter().all(|(train, _)| train == "12002"));
    assert!(seen.iter().all(|(_, c)| *c != coords(MUMBAI)));

    drop(seen);
    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_twice_is_idle() {
    let h = create_harness();
    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    settle().await;
    assert_eq!(h.manager.live_resources(), 1);

    h.manager.stop().await;
    h.manager.stop().await;

    assert_eq!(h.manager.state(), WatchState::Idle);
    assert_eq!(h.manager.topology(), None);
    assert!(h.manager.watched_train().is_none());
    assert!(h.controller.current_snapshot().is_none());
    assert_eq!(h.manager.live_resources(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_watching_same_train_is_noop() {
    let h = create_harness();
    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    settle().await;
    h.manager.watch("12001", rajdhani_route()).await.unwrap();
    settle().await;

    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1);
    assert_eq!(h.manager.state(), WatchState::Connecting);
    assert_eq!(h.manager.live_resources(), 1);

    h.manager.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_train_rejected() {
    let h = create_harness();

    let result = h.manager.watch("", rajdhani_route()).await;
    assert!(matches!(result, Err(LocationError::InvalidTrain(_))));

    let result = h.manager.watch("12001", Route::default()).await;
    assert!(matches!(result, Err(LocationError::InvalidTrain(_))));

    assert_eq!(h.manager.state(), WatchState::Idle);
    assert_eq!(h.manager.live_resources(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_rejected_before_watching() {
    let controller = Arc::new(ReconciliationController::new());
    let connector = Arc::new(MockConnector::default());
    connector.refuse("12001");
    let client = Arc::new(MockClient::default());
    let sources: LocationSources<MockConnector, MockClient> = LocationSources {
        connector: Arc::clone(&connector),
        client: Arc::clone(&client),
        live_status: None,
    };
    let mut config = LifecycleConfig::default();
    config.polling.interval = Duration::ZERO;
    let manager = SubscriptionLifecycleManager::new(Arc::clone(&controller), sources, config);

    let result = manager.watch("12001", rajdhani_route()).await;
    assert!(matches!(result, Err(LocationError::Configuration(_))));

    settle().await;
    assert_eq!(manager.state(), WatchState::Idle);
    assert_eq!(manager.live_resources(), 0);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    assert_eq!(client.calls("12001"), 0);
    assert!(controller.current_snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_manager_ends_session() {
    let Harness {
        manager,
        controller,
        connector,
        ..
    } = create_harness();

    manager.watch("12001", rajdhani_route()).await.unwrap();
    settle().await;
    assert_eq!(manager.live_resources(), 1);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 0);

    drop(manager);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    assert_eq!(Arc::strong_count(&controller), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watch_with_seed_uses_static_location() {
    let h = create_harness();
    let seed = LocationUpdate::at(KANPUR.0, KANPUR.1).with_chainage("441.2");

    h.manager
        .watch_with_seed("12001", rajdhani_route(), seed)
        .await
        .unwrap();

    let snapshot = h.controller.current_snapshot().unwrap();
    assert_eq!(snapshot.coordinates, coords(KANPUR));
    assert_eq!(snapshot.chainage_km.as_deref(), Some("441.2"));
    assert!(snapshot.last_update_source.is_none());

    h.manager.stop().await;
}

// ============================================================================
// Live Status
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_live_status_runs_alongside_topology() {
    let controller = Arc::new(ReconciliationController::new());
    let connector = Arc::new(MockConnector::default());
    let live_status = Arc::new(MockLiveStatus {
        calls: AtomicUsize::new(0),
    });
    let frames = connector.script("12001");
    frames
        .send(Ok(location_frame("12001", 27.2, 79.0, "441.2")))
        .unwrap();

    let sources: LocationSources<MockConnector, MockClient, MockLiveStatus> = LocationSources {
        connector: Arc::clone(&connector),
        client: Arc::new(MockClient::default()),
        live_status: Some(Arc::clone(&live_status)),
    };
    let manager = SubscriptionLifecycleManager::new(
        Arc::clone(&controller),
        sources,
        LifecycleConfig::default(),
    );

    manager.watch("12001", rajdhani_route()).await.unwrap();
    wait_for_state(manager.subscribe_state(), WatchState::WebSocketPrimary).await;
    settle().await;

    assert!(live_status.calls.load(Ordering::SeqCst) >= 1);
    let snapshot = controller.current_snapshot().unwrap();
    assert_eq!(snapshot.delay_minutes, Some(7));
    assert_eq!(snapshot.chainage_km.as_deref(), Some("441.2"));
    assert_eq!(manager.live_resources(), 1);

    manager.stop().await;
    let calls = live_status.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(live_status.calls.load(Ordering::SeqCst), calls);
}
