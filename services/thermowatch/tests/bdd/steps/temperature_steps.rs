//! BDD step definitions for the temperature endpoint

use axum::http::Method;
use cucumber::{then, when};

use crate::world::ThermowatchWorld;

#[when("the temperature is requested")]
async fn temperature_requested(world: &mut ThermowatchWorld) {
    world.request(Method::GET, "/temperature").await;
}

#[then(expr = "the response status is {int}")]
fn response_status(world: &mut ThermowatchWorld, status: u16) {
    assert_eq!(world.last_status, Some(status), "body: {:?}", world.last_body);
}

#[then(expr = "the temperature is {float} with status {string}")]
fn temperature_is(world: &mut ThermowatchWorld, value: f64, status: String) {
    let body = world.body();
    assert_eq!(body["temperature"].as_f64(), Some(value), "{body}");
    assert_eq!(body["status"], status.as_str());
}

#[then(expr = "the error is {string}")]
fn error_is(world: &mut ThermowatchWorld, message: String) {
    assert_eq!(world.body()["error"], message.as_str());
}
