//! Test server wrapper that starts Parley on a random port

use std::net::SocketAddr;

use parley_config::Config;
use parley_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config).await?;
        let (addr, shutdown) = super::spawn(server.into_router()).await?;

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    /// URL of `path` on the running server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a JSON body to `/conversation` as `user`
    pub async fn converse(&self, user: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/conversation"))
            .header("x-ms-client-principal-id", user)
            .json(body)
            .send()
            .await
            .expect("server reachable")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
