use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use homedash_common::{
    endpoints::{device_command_url, status_url},
    ApiConfig, ApiError, DeviceCommand, StateSnapshot,
};

/// The remote status endpoint: one read resource and one write action per
/// device.
#[async_trait]
pub trait StatusApi: Send + Sync {
    async fn fetch_status(&self) -> Result<StateSnapshot, ApiError>;

    async fn send_command(&self, command: DeviceCommand) -> Result<(), ApiError>;
}

pub struct HttpStatusApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusApi {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        let client = builder.build().context("failed to build http client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StatusApi for HttpStatusApi {
    async fn fetch_status(&self) -> Result<StateSnapshot, ApiError> {
        let response = self
            .client
            .get(status_url(&self.base_url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn send_command(&self, command: DeviceCommand) -> Result<(), ApiError> {
        let response = self
            .client
            .post(device_command_url(&self.base_url, command))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    use super::*;
    use homedash_common::{DeviceAction, DeviceName, DeviceState};

    type Received = Arc<Mutex<Vec<(String, String, Option<String>)>>>;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn api_for(base_url: String, request_timeout_ms: u64) -> HttpStatusApi {
        HttpStatusApi::new(&ApiConfig {
            base_url,
            request_timeout_ms,
        })
        .unwrap()
    }

    fn sample_snapshot() -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        snapshot.indoor.temperature = 26.2;
        snapshot.outdoor.humidity = 80.0;
        snapshot.wifi = true;
        snapshot.devices.light = DeviceState {
            status: true,
            manual: false,
        };
        snapshot
    }

    async fn record_command(
        State(received): State<Received>,
        Path((device, action)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> StatusCode {
        let content_type = headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        received
            .lock()
            .unwrap()
            .push((device.clone(), action, content_type));
        if device == "fan" {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    #[tokio::test]
    async fn fetches_and_decodes_status() {
        let snapshot = sample_snapshot();
        let served = snapshot.clone();
        let router = Router::new().route(
            "/api/status",
            get(move || {
                let served = served.clone();
                async move { Json(served) }
            }),
        );
        let api = api_for(serve(router).await, 2_000);

        assert_eq!(api.fetch_status().await, Ok(snapshot));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/api/status",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let api = api_for(serve(router).await, 2_000);

        assert_eq!(api.fetch_status().await, Err(ApiError::Status(503)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new().route("/api/status", get(|| async { "not json" }));
        let api = api_for(serve(router).await, 2_000);

        assert!(matches!(api.fetch_status().await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = api_for(format!("http://{addr}/api"), 2_000);

        assert!(matches!(
            api.fetch_status().await,
            Err(ApiError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let router = Router::new().route(
            "/api/status",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }),
        );
        let api = api_for(serve(router).await, 100);

        assert_eq!(api.fetch_status().await, Err(ApiError::Timeout));
    }

    #[tokio::test]
    async fn posts_device_commands() {
        let received: Received = Arc::default();
        let router = Router::new()
            .route("/api/device/{device}/{action}", post(record_command))
            .with_state(received.clone());
        let api = api_for(serve(router).await, 2_000);

        let ok = api
            .send_command(DeviceCommand::new(DeviceName::Fan, DeviceAction::On))
            .await;
        let rejected = api
            .send_command(DeviceCommand::new(DeviceName::Ac, DeviceAction::Auto))
            .await;

        assert_eq!(ok, Ok(()));
        assert_eq!(rejected, Err(ApiError::Status(400)));
        assert_eq!(
            received.lock().unwrap().clone(),
            vec![
                (
                    "fan".to_string(),
                    "on".to_string(),
                    Some("application/json".to_string())
                ),
                (
                    "ac".to_string(),
                    "auto".to_string(),
                    Some("application/json".to_string())
                ),
            ]
        );
    }
}
