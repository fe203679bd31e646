//! API Server

use anyhow::{anyhow, Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::api::handlers::{create_router, AppState};
use crate::api::middleware::{create_body_limit_layer, create_cors_layer};

pub struct ApiServer {
    bind_addr: SocketAddr,
    router: Router,
}

impl ApiServer {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("binding {}", self.bind_addr))?;

        log::info!("record store API listening on http://{}", self.bind_addr);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("API server failed")?;
        log::info!("record store API stopped");
        Ok(())
    }
}

pub struct ApiServerBuilder {
    bind_addr: SocketAddr,
    max_request_size: usize,
    state: Option<AppState>,
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_request_size: 1024 * 1024,
            state: None,
        }
    }

    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    pub fn state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<ApiServer> {
        let state = self.state.ok_or_else(|| anyhow!("API server needs application state"))?;
        let router = create_router(state)
            .layer(create_body_limit_layer(self.max_request_size))
            .layer(create_cors_layer());
        Ok(ApiServer {
            bind_addr: self.bind_addr,
            router,
        })
    }
}
