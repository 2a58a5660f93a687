//! Long-running service: shared state, scheduled runs and the HTTP API.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use rankscope::{CheckerConfig, DomainChecker, DomainResult, PageSource, SerankingProvider};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::{RuntimeConfig, Settings};
use crate::notify::Notifier;
use crate::scheduler::{Automation, RunFn};
use crate::store::Store;

/// Services shared by request handlers, scheduled runs and CLI commands.
pub struct AppContext {
    pub store: Arc<Store>,
    pub notifier: Notifier,
    env_api_key: Option<String>,
    /// Replaces the HTTP fetcher when set.
    pages: Option<Arc<dyn PageSource>>,
    /// Replaces the paid-metrics API host when set.
    provider_base_url: Option<String>,
}

impl AppContext {
    pub fn new(store: Arc<Store>, env_api_key: Option<String>) -> Self {
        Self {
            store,
            notifier: Notifier::default(),
            env_api_key,
            pages: None,
            provider_base_url: None,
        }
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageSource>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_provider_base_url(mut self, base: impl Into<String>) -> Self {
        self.provider_base_url = Some(base.into());
        self
    }

    pub fn settings(&self) -> Result<Settings> {
        self.store.settings()
    }

    /// A checker for the current settings. Built per request so that a
    /// changed API key applies immediately.
    pub fn checker(&self, settings: &Settings) -> DomainChecker {
        let mut config = settings.checker_config(self.env_api_key.as_deref());
        config.provider_base_url = self.provider_base_url.clone();
        match &self.pages {
            Some(pages) => DomainChecker::with_pages(Arc::clone(pages), &config),
            None => DomainChecker::from_config(&config),
        }
    }

    /// A provider client for an ad-hoc API key.
    pub fn metrics_provider(&self, api_key: &str) -> SerankingProvider {
        let provider = SerankingProvider::new(api_key, CheckerConfig::default().provider_timeout);
        match &self.provider_base_url {
            Some(base) => provider.with_base_url(base.clone()),
            None => provider,
        }
    }

    /// Check domains, save every result and send the automatic report when
    /// enabled.
    pub async fn check_and_save<S: AsRef<str>>(&self, domains: &[S]) -> Result<Vec<DomainResult>> {
        let settings = self.settings()?;
        let results = self.checker(&settings).check_many(domains).await;
        self.store.save_results(&results)?;

        if settings.wants_auto_report() {
            self.notifier.dispatch_report(&results, &settings).await;
        }
        Ok(results)
    }

    /// Re-check all tracked domains. Reports go out when `emailReports` is set.
    pub async fn run_tracked(&self) -> Result<Vec<DomainResult>> {
        let domains = self.store.tracked_domains()?;
        if domains.is_empty() {
            info!("no tracked domains to check");
            return Ok(Vec::new());
        }

        let settings = self.settings()?;
        info!(domains = domains.len(), "checking tracked domains");
        let results = self.checker(&settings).check_many(&domains).await;
        self.store.save_results(&results)?;

        if settings.email_reports {
            self.notifier.dispatch_report(&results, &settings).await;
        }
        Ok(results)
    }

    /// Scheduler callback running [`AppContext::run_tracked`].
    pub fn scheduled_run(self: &Arc<Self>) -> RunFn {
        let ctx = Arc::clone(self);
        Arc::new(move || -> BoxFuture<'static, ()> {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                match ctx.run_tracked().await {
                    Ok(results) => info!(checked = results.len(), "scheduled check finished"),
                    Err(e) => error!("scheduled check failed: {e:#}"),
                }
            })
        })
    }
}

/// State handed to HTTP handlers.
pub struct SharedState {
    pub ctx: Arc<AppContext>,
    pub automation: Automation,
    pub started_at: Instant,
}

impl SharedState {
    /// Start the scheduler and apply the stored automation settings.
    pub async fn start(ctx: Arc<AppContext>) -> Result<Self> {
        let automation = Automation::start(ctx.scheduled_run()).await?;
        match ctx.settings() {
            Ok(settings) => {
                if let Err(e) = automation.apply(&settings).await {
                    warn!("stored automation schedule not applied: {e:#}");
                }
            }
            Err(e) => warn!("could not read settings: {e:#}"),
        }

        Ok(Self {
            ctx,
            automation,
            started_at: Instant::now(),
        })
    }
}

/// The HTTP service.
pub struct Server {
    config: RuntimeConfig,
    shutdown: Arc<Notify>,
    pages: Option<Arc<dyn PageSource>>,
}

impl Server {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(Notify::new()),
            pages: None,
        }
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageSource>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Get the shutdown notifier (for external shutdown signaling).
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Open the store, start the scheduler and serve until shutdown.
    pub async fn start(&self) -> Result<()> {
        self.config.ensure_data_dir()?;
        let store = Arc::new(Store::open(&self.config.db_path())?);

        let mut ctx = AppContext::new(store, self.config.env_api_key.clone());
        if let Some(pages) = &self.pages {
            ctx = ctx.with_pages(Arc::clone(pages));
        }
        let state = Arc::new(SharedState::start(Arc::new(ctx)).await?);

        let addr: SocketAddr = format!("{}:{}", self.config.bind, self.config.port)
            .parse()
            .with_context(|| format!("invalid bind address {}", self.config.bind))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        let shutdown = Arc::clone(&self.shutdown);
        crate::rest::start(listener, Arc::clone(&state), async move {
            shutdown.notified().await
        })
        .await
        .context("HTTP server failed")?;

        info!("shutdown signal received");
        state.automation.shutdown().await?;
        Ok(())
    }
}
