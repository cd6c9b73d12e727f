//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use greens_auth::{AuthSession, BearerToken};
use greens_client::{CartGateway, CartStore, HttpGateway, MemoryGateway, VoucherController};
use greens_commerce::{Cart, OrderSummary};

use crate::config::StorefrontConfig;
use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["greens.toml", ".greens.toml", "greens.json"];

/// Environment variable holding the backend bearer token.
pub const TOKEN_ENV: &str = "GREENS_TOKEN";

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: StorefrontConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    pub session: Arc<AuthSession>,
    backend: Backend,
}

enum Backend {
    Http(Arc<HttpGateway>),
    /// Offline mode keeps its cart under `.greens/` between runs.
    Memory(Arc<MemoryGateway>),
}

impl Context {
    /// Load config, sign in and pick a backend.
    pub fn load(config_path: Option<&str>, offline: bool, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = resolve(&cwd, path);
                (StorefrontConfig::load(&path)?, Some(path))
            }
            None => match find_config(&cwd) {
                Some(path) => (StorefrontConfig::load(&path)?, Some(path)),
                None => (StorefrontConfig::default(), None),
            },
        };
        config.validate()?;

        let session = Arc::new(build_session(&config, offline)?);
        session.on_logout(|reason| tracing::warn!(?reason, "signed out"));

        let backend = if offline {
            let state = state_dir(&cwd);
            let saved = read_json::<Cart>(&state.join("cart.json"))?;
            let cart = Cart::from_items(
                config.api.currency,
                saved.map(|c| c.items).unwrap_or_default(),
            )
            .context("Offline cart is corrupt")?;
            let orders = read_json::<Vec<OrderSummary>>(&state.join("orders.json"))?
                .unwrap_or_default();
            let gateway = MemoryGateway::with_cart(cart)
                .with_orders(orders)
                .with_vouchers(config.voucher_book()?)
                .with_unauthorized_hook(session.clone());
            Backend::Memory(Arc::new(gateway))
        } else {
            let gateway = HttpGateway::new(&config.api, session.clone())
                .context("Failed to set up the HTTP client")?;
            Backend::Http(Arc::new(gateway))
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            session,
            backend,
        })
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    pub fn gateway(&self) -> Arc<dyn CartGateway> {
        match &self.backend {
            Backend::Http(gateway) => gateway.clone() as Arc<dyn CartGateway>,
            Backend::Memory(gateway) => gateway.clone() as Arc<dyn CartGateway>,
        }
    }

    /// A cart store over the configured backend.
    pub fn store(&self) -> CartStore<Arc<dyn CartGateway>> {
        CartStore::new(self.gateway(), self.config.api.currency)
    }

    pub fn vouchers(&self) -> Result<VoucherController> {
        let book = self.config.voucher_book()?;
        Ok(VoucherController::new(Arc::new(book), self.config.api.currency)
            .with_latency(Duration::from_millis(self.config.voucher.latency_ms)))
    }

    /// Write the offline cart back to disk. Does nothing when online.
    pub fn persist(&self) -> Result<()> {
        let Backend::Memory(gateway) = &self.backend else {
            return Ok(());
        };
        let dir = state_dir(&self.cwd);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join("cart.json");
        let content = serde_json::to_string_pretty(&gateway.cart())?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn build_session(config: &StorefrontConfig, offline: bool) -> Result<AuthSession> {
    let session = AuthSession::new();
    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(|t| BearerToken::new(t.trim()));

    match (&config.profile, token) {
        (Some(profile), Some(token)) => session.login(profile.user()?, token),
        (Some(profile), None) if offline => {
            session.login(profile.user()?, BearerToken::new("offline"))
        }
        (_, Some(token)) => session.set_token(token),
        _ => tracing::debug!("no credentials configured, continuing anonymously"),
    }
    Ok(session)
}

/// Search the directory tree upward for a config file.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

fn state_dir(cwd: &Path) -> PathBuf {
    cwd.join(".greens")
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}
