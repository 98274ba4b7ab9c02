//! BDD step definitions for readiness

use axum::http::Method;
use cucumber::{then, when};

use crate::world::ThermowatchWorld;

#[when("readiness is requested")]
async fn readiness_requested(world: &mut ThermowatchWorld) {
    world.request(Method::GET, "/readyz").await;
}

#[then(expr = "readiness reports {int} of {int} sensors accessible with {int} required")]
fn readiness_counts(
    world: &mut ThermowatchWorld,
    accessible: u64,
    total: u64,
    minimum_required: u64,
) {
    let body = world.body();
    assert_eq!(body["accessible"].as_u64(), Some(accessible), "{body}");
    assert_eq!(body["total"].as_u64(), Some(total), "{body}");
    assert_eq!(body["minimum_required"].as_u64(), Some(minimum_required), "{body}");
}

#[then(expr = "the service is reported {string}")]
fn service_reported(world: &mut ThermowatchWorld, status: String) {
    let body = world.body();
    assert_eq!(body["status"], status.as_str(), "{body}");
    assert_eq!(body["ready"].as_bool(), Some(status == "ready"), "{body}");
}

#[then(expr = "the cached snapshot is reported {word}")]
fn cache_freshness(world: &mut ThermowatchWorld, freshness: String) {
    let expected = match freshness.as_str() {
        "fresh" => true,
        "stale" => false,
        other => panic!("Unknown freshness: {}", other),
    };
    assert_eq!(world.body()["cache_fresh"].as_bool(), Some(expected));
}
