//! HTTP server: public site and admin panel

pub mod admin;
mod error;
mod middleware;
mod public;

pub use error::AppError;

use anyhow::Result;
use axum::{middleware as axum_middleware, routing::get, Router};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::SessionStore;
use crate::content::ContentRepository;
use crate::data::{spawn_compactor, Handler};
use crate::media::MediaLibrary;
use crate::theme::ThemeRenderer;
use crate::Site;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub data: Arc<Handler>,
    pub content: ContentRepository,
    pub media: MediaLibrary,
    pub sessions: Arc<SessionStore>,
    pub theme: Arc<RwLock<ThemeRenderer>>,
}

impl AppState {
    /// Wire up the state for a site whose data handler is already open
    pub fn new(site: Site, data: Arc<Handler>) -> Result<Self> {
        let registry = site.registry();
        registry.ensure_dirs()?;

        let theme_name = data
            .setting("theme")?
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| site.config.theme.clone());
        let theme = match ThemeRenderer::load(
            &site.theme_dir,
            &theme_name,
            site.config.tz(),
            &site.config.date_format,
        ) {
            Ok(theme) => theme,
            Err(e) if theme_name != "default" => {
                tracing::error!("Theme '{}' failed to load, using default: {}", theme_name, e);
                ThemeRenderer::load(
                    &site.theme_dir,
                    "default",
                    site.config.tz(),
                    &site.config.date_format,
                )?
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            content: ContentRepository::new(&registry)?,
            media: MediaLibrary::new(registry.files("media")?, site.config.media.clone()),
            sessions: Arc::new(SessionStore::new(site.config.admin.session_ttl_minutes)),
            theme: Arc::new(RwLock::new(theme)),
            site: Arc::new(site),
            data,
        })
    }

    /// Run filesystem work (listing and rendering entries) on the blocking pool
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&AppState) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Blocking task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

/// Create the axum router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(public::home))
        .route("/blog", get(public::blog))
        .route("/blog/:slug", get(public::post))
        .route("/tag/:tag", get(public::tag))
        .route("/theme/*path", get(public::theme_asset))
        .route("/:slug", get(public::page))
        .nest_service("/media", ServeDir::new(&state.site.media_dir))
        .fallback(public::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::redirect_mappings,
        ));

    Router::new()
        .nest("/admin", admin::router(&state))
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(site: Site, host: &str, port: u16, watch: bool) -> Result<()> {
    site.registry().ensure_dirs()?;

    let data = {
        let site = site.clone();
        Arc::new(tokio::task::spawn_blocking(move || site.open_data()).await??)
    };
    spawn_compactor(data.clone());

    let state = AppState::new(site, data.clone())?;
    spawn_session_sweeper(state.sessions.clone());

    if watch {
        let theme = state.theme.clone();
        let themes_dir = state.site.theme_dir.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_templates(themes_dir, theme) {
                tracing::error!("Template watcher error: {}", e);
            }
        });
    }

    // Parse address - handle "localhost" specially
    let bind_ip = if host == "localhost" { "127.0.0.1" } else { host };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving at http://{}:{} (admin at /admin)", host, port);

    if data.users()?.is_empty() {
        tracing::warn!("No users exist yet; create one with `marques user add <name>`");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

/// Drop expired sessions once a minute
fn spawn_session_sweeper(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired sessions", purged);
            }
        }
    });
}

/// Reload the theme when files under the themes directory change
fn watch_templates(themes_dir: PathBuf, theme: Arc<RwLock<ThemeRenderer>>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    std::fs::create_dir_all(&themes_dir)?;
    debouncer
        .watcher()
        .watch(&themes_dir, RecursiveMode::Recursive)?;
    tracing::info!("Watching {:?} for template changes", themes_dir);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|e| {
                    let path_str = e.path.to_string_lossy();
                    !path_str.contains(".git")
                        && !path_str.contains(".DS_Store")
                        && !path_str.ends_with('~')
                });
                if !relevant {
                    continue;
                }

                let mut renderer = theme.blocking_write();
                let name = renderer.theme().to_string();
                match renderer.reload(&name) {
                    Ok(()) => tracing::info!("Reloaded theme '{}' after file change", name),
                    Err(e) => tracing::error!("Theme reload failed, keeping previous templates: {}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}
