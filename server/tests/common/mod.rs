use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, Method, Request, StatusCode,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use log::debug;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use tokio::{sync::mpsc, time::timeout};
use xerosync::{storage::Storage, XeroSync};
use xerosync_server::{build_server, run_server, Config};

pub const TOKEN: &str = "supersecrettoken";

/// Start a server on an ephemeral port in front of `xero_sync`, with its
/// payment listener running.
pub async fn start_server<S: Storage + 'static>(
    xero_sync: XeroSync<S>,
    token: Option<&str>,
) -> SocketAddr {
    let mut config = Config::default();
    config.server.port = 0;
    config.server.ipv6 = None;
    config.server.token = token.map(|token| Secret::new(token.to_string()));

    let (payments, receiver) = mpsc::channel(config.sync.event_queue_size);
    let listener = xero_sync.listen(receiver);
    let server = build_server(&config, xero_sync.clone(), payments).await;
    let address = server.ipv4_address().unwrap();
    tokio::spawn(run_server(server, listener, xero_sync));
    address
}

pub struct ApiClient {
    client: Client<HttpConnector, Full<Bytes>>,
    url: String,
    pub token: Option<String>,
}

impl ApiClient {
    pub fn new(address: SocketAddr) -> ApiClient {
        ApiClient {
            client: Client::builder(TokioExecutor::new()).build_http(),
            url: format!("http://{address}"),
            token: Some(TOKEN.to_string()),
        }
    }

    pub async fn get(&self, endpoint: &str) -> ApiResponse {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post(&self, endpoint: &str, body: Option<serde_json::Value>) -> ApiResponse {
        self.request(Method::POST, endpoint, body).await
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResponse {
        let mut request_builder = Request::builder()
            .method(method)
            .uri(format!("{}{endpoint}", self.url));
        if let Some(token) = &self.token {
            request_builder = request_builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request_builder = request_builder.header(CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(json.to_string()))
            }
            None => Full::new(Bytes::new()),
        };
        let request = request_builder.body(body).unwrap();
        debug!("Sending request: {:?}", request);

        let response = timeout(Duration::from_secs(10), self.client.request(request))
            .await
            .expect("timed out waiting for response")
            .expect("request failed");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        ApiResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body is not the expected JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
