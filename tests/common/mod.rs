use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Migrate only when a database is configured; otherwise startup would
        // wait out the connection timeout before serving.
        let migrate = std::env::var_os("DATABASE_URL").is_some();

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lifeos-api"));
        cmd.env("LIFEOS_API_PORT", port.to_string())
            .env("JOBS_ENABLED", "false")
            .env("RUN_MIGRATIONS", migrate.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // DATABASE_URL is inherited when set; without it the server still
        // starts and reports 503 on /health.
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() <= deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// True when /health reports a reachable database. Database-backed tests
/// return early otherwise.
#[allow(dead_code)]
pub async fn database_ready(server: &TestServer) -> Result<bool> {
    let status = reqwest::get(server.url("/health")).await?.status();
    if status != StatusCode::OK {
        eprintln!("skipping: /health answered {}", status);
    }
    Ok(status == StatusCode::OK)
}

/// Register a fresh user and return its access token.
#[allow(dead_code)]
pub async fn register_user(server: &TestServer) -> Result<String> {
    let email = format!("it-{}@lifeos.test", uuid::Uuid::new_v4().simple());
    let res = reqwest::Client::new()
        .post(server.url("/api/auth/register"))
        .json(&json!({ "email": email, "password": "correct-horse-battery" }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register answered {}", res.status());

    let body = res.json::<Value>().await?;
    body["data"]["accessToken"]
        .as_str()
        .map(str::to_string)
        .context("register response carries no accessToken")
}

/// `data` of a success envelope, after checking the status.
#[allow(dead_code)]
pub async fn data_of(res: reqwest::Response, expected: StatusCode) -> Result<Value> {
    let status = res.status();
    let body = res.json::<Value>().await?;
    anyhow::ensure!(status == expected, "expected {}, got {}: {}", expected, status, body);
    Ok(body["data"].clone())
}
