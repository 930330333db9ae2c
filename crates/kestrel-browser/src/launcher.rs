use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

/// Default time allowed for Chrome to open its debugging port
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// File Chrome writes into its user-data dir once the debugging port is bound
const DEVTOOLS_ACTIVE_PORT: &str = "DevToolsActivePort";

/// Port from the first line of a `DevToolsActivePort` file
pub fn parse_devtools_active_port(contents: &str) -> Option<u16> {
    contents
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
}

/// Builds and spawns a headless Chrome exposing a remote-debugging port.
///
/// Chrome picks the port itself (`--remote-debugging-port=0`) and reports it
/// through `DevToolsActivePort` in the profile dir, so concurrent launches
/// can never race for the same port.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    sandbox: bool,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            chrome_path,
            profile_path,
            sandbox: true,
        }
    }

    /// Disable the Chrome sandbox (required when running as root in containers)
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Spawn Chrome. The process is killed when the returned handle is dropped.
    pub fn launch(&self) -> Result<ChromeProcess> {
        let args = self.build_args();
        tracing::debug!("Launching {} {}", self.chrome_path.display(), args.join(" "));

        let child = Command::new(&self.chrome_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))?;

        Ok(ChromeProcess {
            child,
            profile_path: self.profile_path.clone(),
            port: None,
        })
    }

    /// Build Chrome command-line arguments
    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--headless=new".to_string(),
            "--remote-debugging-port=0".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
        ];

        if !self.sandbox {
            args.push("--no-sandbox".to_string());
        }

        args.push("about:blank".to_string());
        args
    }
}

/// A running Chrome process
pub struct ChromeProcess {
    child: Child,
    profile_path: PathBuf,
    port: Option<u16>,
}

impl ChromeProcess {
    /// Debugging port, known once [`wait_until_ready`](Self::wait_until_ready) succeeded
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    async fn read_active_port(profile: &Path) -> Option<u16> {
        let contents = tokio::fs::read_to_string(profile.join(DEVTOOLS_ACTIVE_PORT))
            .await
            .ok()?;
        parse_devtools_active_port(&contents)
    }

    /// Wait until Chrome reports its debugging port and accepts connections on it
    pub async fn wait_until_ready(&mut self, timeout: Duration) -> Result<u16> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(Error::Browser(format!(
                    "Chrome exited during startup ({})",
                    status
                )));
            }

            if let Some(port) = Self::read_active_port(&self.profile_path).await {
                if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                    tracing::debug!("Chrome debugging port {} is ready", port);
                    self.port = Some(port);
                    return Ok(port);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(
                    timeout,
                    "Chrome never opened its debugging port".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Kill Chrome and reap it
    pub async fn shutdown(mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(Some(status));
        }
        self.child.kill().await?;
        let status = self.child.wait().await?;
        tracing::debug!("Chrome stopped ({})", status);
        Ok(Some(status))
    }
}
