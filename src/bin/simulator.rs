//! Synthetic field devices: posts one reading per sensor every interval.

use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
enum SimulatorError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

struct SimulatorConfig {
    api_url: String,
    api_key: String,
    interval: Duration,
}

impl SimulatorConfig {
    fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let interval = std::env::var("SIMULATOR_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            api_url: std::env::var("SIMULATOR_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: std::env::var("SIMULATOR_API_KEY")
                .unwrap_or_else(|_| "key_farmer_12345".to_string()),
            interval: Duration::from_secs(interval),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Parcel {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    id: i32,
    #[serde(rename = "type")]
    sensor_type: String,
}

#[derive(Debug, Serialize)]
struct Reading {
    value: f64,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
    alert_triggered: bool,
}

struct ApiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    fn new(config: &SimulatorConfig) -> Result<Self, SimulatorError> {
        let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http_client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, SimulatorError> {
        let response = self
            .http_client
            .get(format!("{}{path}", self.base_url))
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_reading(&self, sensor_id: i32, reading: &Reading) -> Result<IngestResponse, SimulatorError> {
        let response = self
            .http_client
            .post(format!("{}/sensors/{sensor_id}/data", self.base_url))
            .header("X-API-Key", &self.api_key)
            .json(reading)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, SimulatorError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SimulatorError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    async fn discover_sensors(&self) -> Result<Vec<(Sensor, String)>, SimulatorError> {
        let parcels: Vec<Parcel> = self.get("/parcels").await?;
        let mut sensors = Vec::new();
        for parcel in parcels {
            match self.get::<Vec<Sensor>>(&format!("/parcels/{}/sensors", parcel.id)).await {
                Ok(found) => sensors.extend(found.into_iter().map(|s| (s, parcel.name.clone()))),
                Err(e) => tracing::warn!(parcel_id = parcel.id, error = %e, "sensor_discovery_failed"),
            }
        }
        Ok(sensors)
    }
}

/// Plausible value for a sensor type at a local hour of day.
fn synthetic_value(sensor_type: &str, hour: u32, rng: &mut impl Rng) -> f64 {
    let phase = (f64::from(hour) - 8.0) / 24.0 * std::f64::consts::TAU;
    let value = match sensor_type {
        "temperature" => 20.0 + 10.0 * phase.sin() + rng.gen_range(-1.0..1.0),
        "soil_humidity" => 60.0 + 20.0 * phase.cos() + rng.gen_range(-5.0..5.0),
        "luminosity" if (6..=19).contains(&hour) => rng.gen_range(500.0..1000.0),
        "luminosity" => rng.gen_range(0.0..10.0),
        _ => rng.gen_range(10.0..100.0),
    };
    (value * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = SimulatorConfig::from_env();
    let client = ApiClient::new(&config)?;
    tracing::info!(
        target_url = %config.api_url,
        interval_secs = config.interval.as_secs(),
        "Starting sensor simulator"
    );

    let sensors = client.discover_sensors().await?;
    if sensors.is_empty() {
        tracing::warn!("No sensors found to simulate");
        return Ok(());
    }
    tracing::info!(sensors = sensors.len(), "Sensors discovered");

    let mut ticker = tokio::time::interval(config.interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Simulator stopped");
                return Ok(());
            }
        }

        let hour = Local::now().hour();
        for (sensor, parcel) in &sensors {
            let reading = Reading {
                value: synthetic_value(&sensor.sensor_type, hour, &mut rand::thread_rng()),
                timestamp: Utc::now().to_rfc3339(),
            };
            match client.post_reading(sensor.id, &reading).await {
                Ok(response) => tracing::info!(
                    sensor_id = sensor.id,
                    sensor_type = %sensor.sensor_type,
                    parcel = %parcel,
                    value = reading.value,
                    alert_triggered = response.alert_triggered,
                    "reading_sent"
                ),
                Err(e) => tracing::warn!(sensor_id = sensor.id, error = %e, "reading_failed"),
            }
        }
    }
}
