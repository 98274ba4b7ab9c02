//! BDD step definitions for the snapshot pipeline

use std::time::Duration;

use axum::http::Method;
use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use thermowatch::config::ArchiveConfig;
use thermowatch::scheduler::SchedulerState;

use crate::world::ThermowatchWorld;

#[given("the archive location is not writable")]
fn archive_not_writable(world: &mut ThermowatchWorld) {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("archive");
    std::fs::write(&blocker, "a file where a directory should be").unwrap();
    world.config.storage.archive = ArchiveConfig::Filesystem { directory: blocker };
    world.archive_dir = Some(dir);
}

#[given(expr = "the scheduler interval is {int} milliseconds")]
fn scheduler_interval(world: &mut ThermowatchWorld, millis: u64) {
    world.config.scheduler.interval = Duration::from_millis(millis);
}

#[when("a snapshot is stored")]
async fn snapshot_stored(world: &mut ThermowatchWorld) {
    world.request(Method::POST, "/store").await;
    assert_eq!(world.last_status, Some(200), "{:?}", world.last_body);
}

#[when("a snapshot store is requested")]
async fn snapshot_store_requested(world: &mut ThermowatchWorld) {
    world.request(Method::POST, "/store").await;
}

#[when(expr = "the scheduler runs for {int} milliseconds")]
async fn scheduler_runs(world: &mut ThermowatchWorld, millis: u64) {
    let scheduler = world.app().scheduler;
    assert_eq!(scheduler.state().await, SchedulerState::Stopped);

    let cancel = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(millis)).await;
    assert_eq!(scheduler.state().await, SchedulerState::Running);
    cancel.cancel();
    handle.await.unwrap();
}

#[then("the scheduler is stopped")]
async fn scheduler_stopped(world: &mut ThermowatchWorld) {
    assert_eq!(world.app().scheduler.state().await, SchedulerState::Stopped);
}

#[then(expr = "at least {int} snapshots were taken")]
fn snapshots_taken(world: &mut ThermowatchWorld, count: u64) {
    let ticks = world.app().metrics.snapshot_ticks();
    assert!(ticks >= count, "only {} snapshots taken", ticks);
}

#[then(expr = "every snapshot failed to persist")]
fn every_snapshot_failed(world: &mut ThermowatchWorld) {
    let metrics = world.app().metrics;
    assert!(metrics.snapshot_ticks() > 0);
    assert_eq!(metrics.snapshot_tick_failures(), metrics.snapshot_ticks());
}

#[then(expr = "the error mentions {string}")]
fn error_mentions(world: &mut ThermowatchWorld, fragment: String) {
    let error = world.body()["error"].as_str().unwrap_or_default().to_string();
    assert!(error.contains(&fragment), "{error}");
}
