use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("Failed to build browser config: {0}")]
    Config(String),
    #[error("Browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("User data dir error: {0}")]
    Io(#[from] std::io::Error),
}

/// A live DevTools connection, either to a browser we launched or to one
/// the user already runs with remote debugging enabled.
pub struct CdpClient {
    browser: Browser,
    handler_task: JoinHandle<()>,
    launched: bool,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    /// Attach to `debug_url`, e.g. `http://127.0.0.1:9222`.
    pub async fn connect(debug_url: &str) -> Result<Self, CdpError> {
        tracing::info!("Attaching to browser at {}", debug_url);
        let (mut browser, handler) = Browser::connect(debug_url).await?;
        let handler_task = spawn_handler(handler);

        // Tabs opened before we attached are unknown until fetched.
        if let Err(e) = browser.fetch_targets().await {
            tracing::warn!("Failed to fetch existing targets: {}", e);
        }

        Ok(Self {
            browser,
            handler_task,
            launched: false,
            user_data_dir: None,
            cleanup_user_data_dir: false,
        })
    }

    pub async fn launch(visible: bool) -> Result<Self, CdpError> {
        let mut config_builder = BrowserConfig::builder();
        config_builder = config_builder.no_sandbox();
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, handler) =
            Browser::launch(config_builder.build().map_err(CdpError::Config)?).await?;
        let handler_task = spawn_handler(handler);

        // A launched browser starts without tabs; give it one to look at.
        browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            handler_task,
            launched: true,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    pub async fn pages(&self) -> Result<Vec<Page>, CdpError> {
        Ok(self.browser.pages().await?)
    }

    /// Shut down a launched browser, or just detach from an attached one.
    pub async fn close(mut self) -> Result<(), CdpError> {
        if self.launched {
            self.browser.close().await?;
            if let Err(e) = self.handler_task.await {
                tracing::debug!("Browser handler ended abnormally: {}", e);
            }
        } else {
            self.handler_task.abort();
        }

        if self.cleanup_user_data_dir
            && let Some(dir) = &self.user_data_dir
            && let Err(e) = std::fs::remove_dir_all(dir)
        {
            tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
        }

        Ok(())
    }
}

fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                tracing::error!("Browser handler error (ignoring): {}", e);
            }
        }
        tracing::info!("Browser handler task ended");
    })
}

fn resolve_user_data_dir() -> Result<(PathBuf, bool), CdpError> {
    if let Ok(dir) = std::env::var("STUDYGUARD_USER_DATA_DIR") {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path)?;
        tracing::info!(
            "Using user data dir from STUDYGUARD_USER_DATA_DIR: {}",
            path.display()
        );
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let unique = format!("studyguard-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
