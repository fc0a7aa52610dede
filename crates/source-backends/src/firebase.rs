// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use krishi_relay_types::secret::SecretString;
use krishi_relay_utils::probe;
use krishi_relay_utils::{Error, Result};
use url::Url;

use crate::Snapshot;

/// Reads the sensor collection of a Firebase Realtime Database over REST.
///
/// Every read is a single `GET {database_url}/{collection}.json`, the whole
/// collection comes back in one response.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct FirebaseSource {
    /// Root URL of the database.
    database_url: Url,
    /// Path of the collection, relative to the root.
    #[builder(default = String::from("sensor_data"), setter(into))]
    collection: String,
    /// Sent as the `auth` query parameter when set.
    #[builder(default, setter(strip_option))]
    auth_token: Option<SecretString>,
    /// Per request timeout.
    #[builder(default = Duration::from_secs(10))]
    timeout: Duration,
    #[builder(default)]
    client: reqwest::Client,
}

impl FirebaseSource {
    fn collection_url(&self) -> Url {
        let mut url = self.database_url.clone();
        let path = format!(
            "{}/{}.json",
            url.path().trim_end_matches('/'),
            self.collection.trim_matches('/')
        );
        url.set_path(&path);
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token.expose());
        }
        url
    }

    async fn get(&self, url: Url) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SourceUnavailable {
                reason: format!("HTTP {status}: {}", body.trim()),
            });
        }
        response.json().await.map_err(unavailable)
    }
}

// The request URL may carry the auth token, it is never part of the reason.
fn unavailable(e: reqwest::Error) -> Error {
    Error::SourceUnavailable {
        reason: e.without_url().to_string(),
    }
}

#[async_trait::async_trait]
impl super::SensorSource for FirebaseSource {
    async fn snapshot(&self) -> Result<Snapshot> {
        let body = self.get(self.collection_url()).await?;
        let snapshot = super::decode_snapshot(body)?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Source,
            collection = %self.collection,
            devices = snapshot.len(),
        );
        Ok(snapshot)
    }

    async fn health_check(&self) -> Result<()> {
        let mut url = self.collection_url();
        url.query_pairs_mut().append_pair("shallow", "true");
        self.get(url).await?;
        tracing::debug!(
            "Source {}/{} is reachable",
            self.database_url.host_str().unwrap_or_default(),
            self.collection
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;

    use axum::extract::Query;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    use super::*;
    use crate::SensorSource;

    const BODY: &str = r#"{
        "field-7": {"moisture": 420, "temperature": 26.5, "humidity": "61.2", "status": "OK", "localDate": "2024-03-01", "localTime": "10:15:00", "timestamp": 1709288100000},
        "field-2": {"moisture": 380, "temperature": 24.1, "humidity": 58, "status": "DRY", "localDate": "2024-03-01", "localTime": "10:15:02", "timestamp": 1709288102000}
    }"#;

    async fn serve(app: Router) -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        addr
    }

    fn source(addr: SocketAddr) -> FirebaseSource {
        FirebaseSource::builder()
            .database_url(format!("http://{addr}/").parse().unwrap())
            .auth_token(SecretString::from("s3cr3t".to_string()))
            .timeout(Duration::from_millis(500))
            .build()
    }

    fn json(
        body: &'static str,
    ) -> ([(header::HeaderName, &'static str); 1], &'static str) {
        ([(header::CONTENT_TYPE, "application/json")], body)
    }

    #[tokio::test]
    async fn reads_the_whole_collection_in_order() {
        let app = Router::new().route(
            "/sensor_data.json",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("auth").map(String::as_str), Some("s3cr3t"));
                assert!(!q.contains_key("shallow"));
                json(BODY)
            }),
        );
        let addr = serve(app).await;
        let snapshot = source(addr).snapshot().await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["field-7", "field-2"]);
        assert_eq!(snapshot[0].1.as_ref().unwrap().humidity, 61.2);
        assert_eq!(snapshot[1].1.as_ref().unwrap().status, "DRY");
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let app = Router::new()
            .route("/farms/north.json", get(|| async { json("null") }));
        let addr = serve(app).await;
        let source = FirebaseSource::builder()
            .database_url(format!("http://{addr}").parse().unwrap())
            .collection("/farms/north/")
            .build();
        assert!(source.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_errors_make_the_source_unavailable() {
        let app = Router::new().route(
            "/sensor_data.json",
            get(|| async {
                (StatusCode::UNAUTHORIZED, r#"{"error": "Permission denied"}"#)
            }),
        );
        let addr = serve(app).await;
        let err = source(addr).snapshot().await.unwrap_err();
        let Error::SourceUnavailable { reason } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(reason.contains("401"));
        assert!(reason.contains("Permission denied"));
        assert!(!reason.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn invalid_json_is_not_a_partial_snapshot() {
        let app = Router::new().route(
            "/sensor_data.json",
            get(|| async { json(r#"{"field-7": {"moisture": 4"#) }),
        );
        let addr = serve(app).await;
        let err = source(addr).snapshot().await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let app = Router::new().route(
            "/sensor_data.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                json("null")
            }),
        );
        let addr = serve(app).await;
        let err = source(addr).snapshot().await.unwrap_err();
        let Error::SourceUnavailable { reason } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(!reason.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        // grab a free port and release it again
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let err = source(addr).health_check().await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn health_check_is_shallow() {
        let app = Router::new().route(
            "/sensor_data.json",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("shallow").map(String::as_str) == Some("true") {
                    (StatusCode::OK, json(r#"{"field-7": true}"#)).into_response()
                } else {
                    StatusCode::BAD_REQUEST.into_response()
                }
            }),
        );
        let addr = serve(app).await;
        source(addr).health_check().await.unwrap();
    }
}
