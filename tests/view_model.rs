use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use bus_tracker::client::{FeedError, RouteFeed, RouteViewModel, ViewState};
use bus_tracker::services::aggregation::{BusSummary, RouteView};

type FeedResult = Result<Vec<RouteView>, FeedError>;

enum Step {
    Now(FeedResult),
    After(oneshot::Receiver<FeedResult>),
}

/// Answers each fetch with the next scripted step.
struct ScriptedFeed {
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedFeed {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
        }
    }
}

#[async_trait]
impl RouteFeed for ScriptedFeed {
    async fn fetch_routes(&self) -> FeedResult {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Now(result)) => result,
            Some(Step::After(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FeedError::Transport("gate dropped".to_string()))),
            None => Err(FeedError::Transport("script exhausted".to_string())),
        }
    }
}

struct CountingFeed {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RouteFeed for CountingFeed {
    async fn fetch_routes(&self) -> FeedResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

const IDLE: Duration = Duration::from_secs(3600);

fn route(number: &str, name: &str) -> RouteView {
    RouteView {
        id: Uuid::new_v4(),
        number: number.to_string(),
        name: name.to_string(),
        origin: "Central".to_string(),
        destination: "Airport".to_string(),
        distance: "12 km".to_string(),
        duration: "35 min".to_string(),
        frequency: "Every 15 min".to_string(),
        buses: vec![BusSummary {
            id: Uuid::new_v4(),
            number: format!("BUS-{number}"),
            eta: 6.0,
            passengers: 20,
            capacity: 40,
            lat: 21.25,
            lng: 81.63,
        }],
        favorite: false,
    }
}

fn offline() -> FeedResult {
    Err(FeedError::Transport("connection refused".to_string()))
}

async fn settle<F: RouteFeed>(view_model: &RouteViewModel<F>, done: impl FnMut(&ViewState) -> bool) {
    let mut rx = view_model.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
        .await
        .expect("view model did not settle")
        .expect("view model sender dropped");
}

#[tokio::test]
async fn test_first_load_failure_then_retry() {
    let (gate, gated) = oneshot::channel();
    let routes = vec![route("101", "Central - Airport")];
    let feed = ScriptedFeed::new([Step::Now(offline()), Step::After(gated)]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    assert!(matches!(view_model.current(), ViewState::Loading { previous: None }));

    settle(&view_model, |s| matches!(s, ViewState::Error { .. })).await;
    match view_model.current() {
        ViewState::Error { message, last_good } => {
            assert!(message.contains("connection refused"));
            assert!(last_good.is_none());
        }
        other => panic!("expected error, got {other:?}"),
    }

    let expected = routes.clone();
    tokio::join!(view_model.retry(), async {
        assert!(matches!(view_model.current(), ViewState::Loading { previous: None }));
        gate.send(Ok(routes)).unwrap();
    });

    match view_model.current() {
        ViewState::Ready(snapshot) => assert_eq!(snapshot.routes, expected),
        other => panic!("expected ready, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_from_ready_does_not_show_loading() {
    let (gate, gated) = oneshot::channel();
    let first = vec![route("101", "Central - Airport")];
    let second = vec![route("101", "Central - Airport"), route("102", "Station - Mall")];
    let feed = ScriptedFeed::new([Step::Now(Ok(first)), Step::After(gated)]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    settle(&view_model, ViewState::is_ready).await;

    let mut updates = view_model.subscribe();
    updates.borrow_and_update();

    tokio::join!(view_model.refresh(), async {
        assert!(view_model.current().is_ready());
        assert!(!updates.has_changed().unwrap());
        gate.send(Ok(second)).unwrap();
    });

    let state = updates.borrow_and_update().clone();
    let snapshot = state.snapshot().unwrap();
    assert!(state.is_ready());
    assert_eq!(snapshot.routes.len(), 2);
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let (slow_gate, slow) = oneshot::channel();
    let (fast_gate, fast) = oneshot::channel();
    let stale = vec![route("900", "Old Depot - Nowhere")];
    let fresh = vec![route("101", "Central - Airport")];
    let feed = ScriptedFeed::new([
        Step::Now(Ok(Vec::new())),
        Step::After(slow),
        Step::After(fast),
    ]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    settle(&view_model, ViewState::is_ready).await;

    let expected = fresh.clone();
    tokio::join!(view_model.refresh(), view_model.refresh(), async {
        // The later request answers first.
        fast_gate.send(Ok(fresh)).unwrap();
        settle(&view_model, |s| s.snapshot().is_some_and(|snap| snap.sequence == 3)).await;
        slow_gate.send(Ok(stale)).unwrap();
    });

    let state = view_model.current();
    let snapshot = state.snapshot().unwrap();
    assert_eq!(snapshot.sequence, 3);
    assert_eq!(snapshot.routes, expected);
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_good_snapshot() {
    let feed = ScriptedFeed::new([
        Step::Now(Ok(vec![route("101", "Central - Airport")])),
        Step::Now(offline()),
    ]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    settle(&view_model, ViewState::is_ready).await;
    let good = view_model.current().snapshot().cloned().unwrap();

    view_model.refresh().await;

    match view_model.current() {
        ViewState::Error { last_good, .. } => {
            assert!(Arc::ptr_eq(&last_good.unwrap(), &good));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_favorites_survive_refresh() {
    let airport = route("101", "Central - Airport");
    let mall = route("102", "Station - Mall");
    let routes = vec![airport.clone(), mall.clone()];
    let feed = ScriptedFeed::new([Step::Now(Ok(routes.clone())), Step::Now(Ok(routes))]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    settle(&view_model, ViewState::is_ready).await;
    let before = view_model.current().snapshot().cloned().unwrap();

    assert!(view_model.toggle_favorite(airport.id));

    let after = view_model.current().snapshot().cloned().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(before.favorites().is_empty());
    assert_eq!(after.favorites().len(), 1);
    assert_eq!(after.favorites()[0].id, airport.id);

    view_model.refresh().await;
    let refreshed = view_model.current().snapshot().cloned().unwrap();
    assert_eq!(refreshed.sequence, 2);
    let favorites: Vec<_> = refreshed.favorites().iter().map(|r| r.id).collect();
    assert_eq!(favorites, vec![airport.id]);

    assert!(!view_model.toggle_favorite(airport.id));
    assert!(view_model.current().snapshot().unwrap().favorites().is_empty());
}

#[tokio::test]
async fn test_snapshot_queries() {
    let airport = route("101", "Central - Airport");
    let mall = route("102", "Station - Mall");
    let feed = ScriptedFeed::new([Step::Now(Ok(vec![airport.clone(), mall.clone()]))]);

    let view_model = RouteViewModel::mount(feed, IDLE);
    settle(&view_model, ViewState::is_ready).await;
    let state = view_model.current();
    let snapshot = state.snapshot().unwrap();

    let hits: Vec<_> = snapshot.search("mall").iter().map(|r| r.id).collect();
    assert_eq!(hits, vec![mall.id]);
    assert_eq!(snapshot.search("").len(), 2);
    assert_eq!(
        snapshot.nearest_bus(airport.id).map(|b| b.id),
        Some(airport.buses[0].id)
    );
    assert!(snapshot.nearest_bus(Uuid::new_v4()).is_none());
}

#[tokio::test]
async fn test_unmount_stops_polling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let view_model = RouteViewModel::mount(
        CountingFeed {
            calls: Arc::clone(&calls),
        },
        Duration::from_millis(20),
    );
    assert!(view_model.is_mounted());

    tokio::time::sleep(Duration::from_millis(110)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2);

    let mut updates = view_model.subscribe();
    view_model.unmount();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let settled = calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), settled);
    assert!(updates.changed().await.is_err());
}

#[tokio::test]
async fn test_zero_interval_still_polls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let view_model = RouteViewModel::mount(
        CountingFeed {
            calls: Arc::clone(&calls),
        },
        Duration::ZERO,
    );

    settle(&view_model, ViewState::is_ready).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(view_model.is_mounted());
    assert!(calls.load(Ordering::SeqCst) >= 2);
}
