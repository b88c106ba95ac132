pub mod api;
mod auth;
mod state;

use std::{
    io::Error as IoError,
    net::{SocketAddr, SocketAddrV4, SocketAddrV6},
};

use axum::{extract::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use log::{debug, error, info};
pub(crate) use state::State;
use tokio::{
    join,
    net::{TcpListener, TcpStream},
};
use tower::Service;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use xerosync::storage::Storage;

use super::config::ServerConfig;
use crate::server::{
    api::{api, oauth},
    auth::MaybeBearer,
};

/// Bind the configured addresses. The wallet platform API sits behind the
/// bearer token, the OAuth routes do not.
pub(crate) async fn new_server<S: Storage + 'static>(
    server_config: ServerConfig,
    state: State<S>,
) -> std::io::Result<Server> {
    let router = Router::new()
        .merge(api(state.clone()))
        .layer(ValidateRequestHeaderLayer::custom(MaybeBearer::new(
            server_config.token,
        )))
        .merge(oauth(state));

    let ipv4 = bind(SocketAddrV4::new(server_config.ipv4, server_config.port).into()).await?;
    let ipv6 = match server_config.ipv6 {
        Some(ip) => Some(bind(SocketAddrV6::new(ip, server_config.port, 0, 0).into()).await?),
        None => None,
    };

    Ok(Server { ipv4, ipv6, router })
}

async fn bind(address: SocketAddr) -> std::io::Result<TcpListener> {
    debug!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    if let Ok(bound) = listener.local_addr() {
        info!("Listening on {bound}");
    }
    Ok(listener)
}

pub(crate) struct Server {
    ipv4: TcpListener,
    ipv6: Option<TcpListener>,
    router: Router,
}

impl Server {
    pub(crate) async fn serve(self) {
        if let Some(ipv6) = &self.ipv6 {
            join!(self.serve_inner(&self.ipv4), self.serve_inner(ipv6));
        } else {
            self.serve_inner(&self.ipv4).await;
        }
    }

    async fn serve_inner(&self, listener: &TcpListener) {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {e}");
                    continue;
                }
            };
            tokio::spawn(serve_connection(self.router.clone(), stream, peer));
        }
    }

    pub(crate) fn ipv4_address(&self) -> Result<SocketAddr, IoError> {
        self.ipv4.local_addr()
    }
}

async fn serve_connection(router: Router, stream: TcpStream, peer: SocketAddr) {
    // Hyper's `Service` takes `&self` and tower's takes `&mut self`, so each
    // request calls its own clone of the router. `Router` is always ready.
    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
        router.clone().call(request)
    });

    if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("Connection from {peer} ended with an error: {e}");
    }
}
