//! BDD test world for thermowatch service

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use cucumber::World;
use tower::ServiceExt;

use thermowatch::clock::{Clock, ManualClock};
use thermowatch::config::{ArchiveConfig, Config};
use thermowatch::io::{HttpClient, HttpResponse};
use thermowatch::server::{build_router, AppState};
use thermowatch::ThermowatchError;

/// How a scripted sensor box answers
#[derive(Debug, Clone)]
pub enum SensorBehaviour {
    Reports(f64),
    Stale(f64),
    TimesOut,
}

/// HTTP client answering `/boxes/{id}` from a mutable script
#[derive(Debug)]
pub struct ScriptedHttpClient {
    pub script: RwLock<HashMap<String, SensorBehaviour>>,
    pub clock: Arc<ManualClock>,
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, url: &str) -> thermowatch::Result<HttpResponse> {
        let id = url.rsplit('/').next().unwrap_or_default();
        let behaviour = self
            .script
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or(SensorBehaviour::TimesOut);

        let now = self.clock.now();
        let (created_at, value) = match behaviour {
            SensorBehaviour::Reports(v) => (now - chrono::Duration::minutes(10), v),
            SensorBehaviour::Stale(v) => (now - chrono::Duration::hours(3), v),
            SensorBehaviour::TimesOut => {
                return Err(ThermowatchError::Fetch(format!("GET {} timed out", url)))
            }
        };

        let body = serde_json::json!({
            "_id": id,
            "sensors": [{
                "title": "Temperatur",
                "lastMeasurement": {
                    "createdAt": created_at.to_rfc3339(),
                    "value": value.to_string(),
                }
            }]
        });
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

#[derive(Default, World)]
pub struct ThermowatchWorld {
    pub config: Config,
    pub http: Option<Arc<ScriptedHttpClient>>,
    pub clock: Option<Arc<ManualClock>>,
    pub app: Option<AppState>,
    pub archive_dir: Option<tempfile::TempDir>,
    pub last_status: Option<u16>,
    pub last_body: Option<serde_json::Value>,
}

impl fmt::Debug for ThermowatchWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThermowatchWorld")
            .field("sensors", &self.config.sensors)
            .field("built", &self.app.is_some())
            .field("last_status", &self.last_status)
            .field("last_body", &self.last_body)
            .finish()
    }
}

impl ThermowatchWorld {
    pub fn clock(&mut self) -> Arc<ManualClock> {
        self.clock
            .get_or_insert_with(|| {
                Arc::new(ManualClock::new("2024-03-01T12:00:00Z".parse().unwrap()))
            })
            .clone()
    }

    pub fn http(&mut self) -> Arc<ScriptedHttpClient> {
        let clock = self.clock();
        self.http
            .get_or_insert_with(|| {
                Arc::new(ScriptedHttpClient {
                    script: RwLock::new(HashMap::new()),
                    clock,
                })
            })
            .clone()
    }

    pub fn script(&mut self, sensor_id: &str, behaviour: SensorBehaviour) {
        self.http()
            .script
            .write()
            .unwrap()
            .insert(sensor_id.to_string(), behaviour);
    }

    /// The wired service, built on first use
    pub fn app(&mut self) -> AppState {
        if self.app.is_none() {
            if self.archive_dir.is_none() {
                self.config.storage.archive = ArchiveConfig::Memory;
            }
            let http: Arc<dyn HttpClient> = self.http();
            let clock: Arc<dyn Clock> = self.clock();
            self.app = Some(thermowatch::build_app_state(&self.config, http, clock));
        }
        self.app.clone().expect("app just built")
    }

    pub async fn request(&mut self, method: Method, uri: &str) {
        let router = build_router(self.app());
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        self.last_status = Some(response.status().as_u16());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        self.last_body = serde_json::from_slice(&body).ok();
    }

    pub fn body(&self) -> &serde_json::Value {
        self.last_body.as_ref().expect("no JSON response recorded")
    }
}
