//! Steps that configure the sensor fleet and move time

use cucumber::{given, when};

use crate::world::{SensorBehaviour, ThermowatchWorld};

#[given(expr = "sensors {string} are configured")]
fn sensors_configured(world: &mut ThermowatchWorld, list: String) {
    world.config.sensors = thermowatch::config::parse_sensor_list(&list);
}

#[given(expr = "sensor {string} reports {float} degrees")]
fn sensor_reports(world: &mut ThermowatchWorld, id: String, value: f64) {
    world.script(&id, SensorBehaviour::Reports(value));
}

#[given(expr = "sensor {string} times out")]
fn sensor_times_out(world: &mut ThermowatchWorld, id: String) {
    world.script(&id, SensorBehaviour::TimesOut);
}

#[given(expr = "sensor {string} only has a stale temperature")]
fn sensor_stale(world: &mut ThermowatchWorld, id: String) {
    world.script(&id, SensorBehaviour::Stale(20.0));
}

#[given(expr = "all sensors report {float} degrees")]
fn all_sensors_report(world: &mut ThermowatchWorld, value: f64) {
    for id in world.config.configured_sensors() {
        world.script(&id, SensorBehaviour::Reports(value));
    }
}

fn mark_all_unreachable(world: &mut ThermowatchWorld) {
    for id in world.config.configured_sensors() {
        world.script(&id, SensorBehaviour::TimesOut);
    }
}

#[given("all sensors are unreachable")]
fn all_sensors_unreachable(world: &mut ThermowatchWorld) {
    mark_all_unreachable(world);
}

#[when("all sensors become unreachable")]
fn all_sensors_become_unreachable(world: &mut ThermowatchWorld) {
    mark_all_unreachable(world);
}

#[when(expr = "{int} seconds pass")]
fn seconds_pass(world: &mut ThermowatchWorld, seconds: i64) {
    world.clock().advance(chrono::Duration::seconds(seconds));
}

#[when(expr = "{int} minutes pass")]
fn minutes_pass(world: &mut ThermowatchWorld, minutes: i64) {
    world.clock().advance(chrono::Duration::minutes(minutes));
}
