//! Terminal dashboard: polls the route views and logs the nearest bus per route.
//!
//! Usage: `route-watch [search query]`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bus_tracker::client::views::{display_eta, nearest_bus, occupancy_percent};
use bus_tracker::client::{HttpRouteFeed, RouteViewModel, ViewState};
use bus_tracker::config::ClientConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_watch=info,bus_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env();
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let feed = HttpRouteFeed::new(&config).expect("Failed to create route feed");
    tracing::info!(
        url = feed.url(),
        interval_secs = config.poll_interval.as_secs(),
        "Watching routes"
    );

    let view_model = RouteViewModel::mount(feed, config.poll_interval);
    let mut updates = view_model.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                render(&state, &query);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    view_model.unmount();
}

fn render(state: &ViewState, query: &str) {
    match state {
        ViewState::Loading { previous: None } => tracing::info!("Loading routes..."),
        ViewState::Loading { previous: Some(_) } => tracing::info!("Retrying..."),
        ViewState::Error { message, last_good } => tracing::warn!(
            error = %message,
            showing_stale = last_good.is_some(),
            "Failed to load routes, will retry on next refresh"
        ),
        ViewState::Ready(snapshot) => {
            let routes = snapshot.search(query);
            tracing::info!(routes = routes.len(), at = %snapshot.fetched_at, "Routes updated");

            for route in routes {
                match nearest_bus(route) {
                    Some(bus) => tracing::info!(
                        "#{} {}: {} in {} min ({}% full)",
                        route.number,
                        route.name,
                        bus.number,
                        display_eta(bus.eta),
                        occupancy_percent(bus)
                    ),
                    None => tracing::info!("#{} {}: no buses running", route.number, route.name),
                }
            }
        }
    }
}
