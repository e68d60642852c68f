use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::client::feed::RouteFeed;
use crate::client::views;
use crate::services::aggregation::{BusSummary, RouteView};

/// Shortest accepted poll period; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An immutable copy of one successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub routes: Vec<RouteView>,
    pub fetched_at: DateTime<Utc>,
    /// Sequence number of the request that produced it.
    pub sequence: u64,
}

impl Snapshot {
    fn new(mut routes: Vec<RouteView>, favorites: &HashSet<Uuid>, sequence: u64) -> Self {
        for route in &mut routes {
            route.favorite = favorites.contains(&route.id);
        }

        Self {
            routes,
            fetched_at: Utc::now(),
            sequence,
        }
    }

    pub fn search(&self, query: &str) -> Vec<&RouteView> {
        views::search(&self.routes, query)
    }

    pub fn favorites(&self) -> Vec<&RouteView> {
        views::favorites(&self.routes)
    }

    pub fn nearest_bus(&self, route_id: Uuid) -> Option<&BusSummary> {
        self.routes
            .iter()
            .find(|r| r.id == route_id)
            .and_then(views::nearest_bus)
    }
}

#[derive(Debug, Clone)]
pub enum ViewState {
    /// First load, or a retry after an error. `previous` is the last good
    /// snapshot if there ever was one.
    Loading { previous: Option<Arc<Snapshot>> },
    Ready(Arc<Snapshot>),
    Error {
        message: String,
        last_good: Option<Arc<Snapshot>>,
    },
}

impl ViewState {
    /// The snapshot to render, whatever the phase.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            ViewState::Loading { previous } => previous.as_ref(),
            ViewState::Ready(snapshot) => Some(snapshot),
            ViewState::Error { last_good, .. } => last_good.as_ref(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }
}

struct Shared<F> {
    feed: F,
    state: watch::Sender<ViewState>,
    favorites: Mutex<HashSet<Uuid>>,
    issued: AtomicU64,
    // Only touched inside `state.send_*` closures, which run one at a time.
    applied: AtomicU64,
}

impl<F: RouteFeed> Shared<F> {
    async fn refresh(&self) {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        // A refresh from Ready keeps the current snapshot on screen; only an
        // error goes back through Loading.
        self.state.send_if_modified(|state| {
            if let ViewState::Error { last_good, .. } = state {
                let previous = last_good.take();
                *state = ViewState::Loading { previous };
                true
            } else {
                false
            }
        });

        let result = self.feed.fetch_routes().await;

        self.state.send_if_modified(|state| {
            let latest = self.applied.load(Ordering::SeqCst);
            if sequence <= latest {
                tracing::debug!(sequence, latest, "Discarding stale route response");
                return false;
            }
            self.applied.store(sequence, Ordering::SeqCst);

            match result {
                Ok(routes) => {
                    let favorites = self.favorites.lock().unwrap_or_else(PoisonError::into_inner);
                    let snapshot = Snapshot::new(routes, &favorites, sequence);
                    tracing::debug!(sequence, routes = snapshot.routes.len(), "Route snapshot replaced");
                    *state = ViewState::Ready(Arc::new(snapshot));
                }
                Err(err) => {
                    tracing::warn!(sequence, error = %err, "Route refresh failed");
                    *state = ViewState::Error {
                        message: err.to_string(),
                        last_good: state.snapshot().cloned(),
                    };
                }
            }
            true
        });
    }

    fn toggle_favorite(&self, route_id: Uuid) -> bool {
        let mut now_favorite = false;

        self.state.send_modify(|state| {
            let mut favorites = self.favorites.lock().unwrap_or_else(PoisonError::into_inner);
            now_favorite = favorites.insert(route_id);
            if !now_favorite {
                favorites.remove(&route_id);
            }

            // Republish a copy; readers holding the old Arc keep their view.
            let republish = |snapshot: &Arc<Snapshot>| {
                Arc::new(Snapshot {
                    fetched_at: snapshot.fetched_at,
                    ..Snapshot::new(snapshot.routes.clone(), &favorites, snapshot.sequence)
                })
            };
            match state {
                ViewState::Ready(snapshot) => *snapshot = republish(snapshot),
                ViewState::Loading { previous: Some(snapshot) }
                | ViewState::Error { last_good: Some(snapshot), .. } => {
                    *snapshot = republish(snapshot)
                }
                _ => {}
            }
        });

        now_favorite
    }
}

/// Keeps a fresh copy of the route views while mounted.
///
/// Mounting spawns a task that refreshes immediately and then once per
/// interval. Dropping the view model aborts that task.
pub struct RouteViewModel<F: RouteFeed> {
    shared: Arc<Shared<F>>,
    poller: JoinHandle<()>,
}

impl<F: RouteFeed> RouteViewModel<F> {
    pub fn mount(feed: F, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, using the minimum"
            );
        }
        let interval = interval.max(MIN_POLL_INTERVAL);

        let (state, _) = watch::channel(ViewState::Loading { previous: None });

        let shared = Arc::new(Shared {
            feed,
            state,
            favorites: Mutex::new(HashSet::new()),
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        });

        let poller = tokio::spawn(poll(Arc::clone(&shared), interval));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Route view model mounted");

        Self { shared, poller }
    }

    pub fn current(&self) -> ViewState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.state.subscribe()
    }

    /// Fetch now, alongside the timer.
    pub async fn refresh(&self) {
        self.shared.refresh().await;
    }

    /// Manual retry after an error.
    pub async fn retry(&self) {
        self.shared.refresh().await;
    }

    /// Flips the favorite flag for a route and returns the new value.
    /// The flag survives later refreshes.
    pub fn toggle_favorite(&self, route_id: Uuid) -> bool {
        self.shared.toggle_favorite(route_id)
    }

    pub fn is_mounted(&self) -> bool {
        !self.poller.is_finished()
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl<F: RouteFeed> Drop for RouteViewModel<F> {
    fn drop(&mut self) {
        self.poller.abort();
        tracing::debug!("Route view model unmounted");
    }
}

async fn poll<F: RouteFeed>(shared: Arc<Shared<F>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        shared.refresh().await;
    }
}
