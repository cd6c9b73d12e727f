//! CLI configuration.

use std::path::Path;

use anyhow::{bail, Context, Result};
use greens_auth::{ProfileForm, Role, User, Validate};
use greens_client::GatewayConfig;
use greens_commerce::{Currency, Money, VoucherBook, VoucherRule};
use serde::{Deserialize, Serialize};

/// Contents of `greens.toml` / `greens.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Backend connection.
    #[serde(default)]
    pub api: GatewayConfig,

    /// Voucher evaluation.
    #[serde(default)]
    pub voucher: VoucherConfig,

    /// The signed-in user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileConfig>,
}

impl StorefrontConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Check everything serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            bail!("api.base_url must be an http(s) URL: {}", self.api.base_url);
        }
        self.voucher_book()?;
        if let Some(profile) = &self.profile {
            profile.user()?;
        }
        Ok(())
    }

    /// The configured voucher rules, or the built-in ones when none are set.
    pub fn voucher_book(&self) -> Result<VoucherBook> {
        let currency = self.api.currency;
        if self.voucher.rules.is_empty() {
            return Ok(VoucherBook::builtin(currency));
        }
        let rules = self
            .voucher
            .rules
            .iter()
            .map(|rule| rule.to_rule(currency))
            .collect::<Result<Vec<_>>>()?;
        Ok(VoucherBook::new(rules))
    }
}

/// `[voucher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherConfig {
    /// Simulated evaluation latency.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Overrides the built-in rules when non-empty.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_latency_ms() -> u64 {
    500
}

impl Default for VoucherConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            rules: Vec::new(),
        }
    }
}

/// One `[[voucher.rules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub code: String,
    pub kind: RuleKind,
    /// Percent for `percentage`, amount in major units for `fixed`.
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Percentage,
    Fixed,
}

impl RuleConfig {
    fn to_rule(&self, currency: Currency) -> Result<VoucherRule> {
        let code = self.code.trim();
        if code.is_empty() {
            bail!("voucher rule with an empty code");
        }
        match self.kind {
            RuleKind::Percentage => {
                if !(0.0..=100.0).contains(&self.value) {
                    bail!("voucher {code}: percentage must be between 0 and 100");
                }
                Ok(VoucherRule::percentage(code, self.value))
            }
            RuleKind::Fixed => {
                if self.value < 0.0 {
                    bail!("voucher {code}: fixed amount must not be negative");
                }
                let amount = Money::from_decimal(self.value, currency)
                    .with_context(|| format!("voucher {code}: invalid amount"))?;
                Ok(VoucherRule::fixed_amount(code, amount))
            }
        }
    }
}

/// `[profile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileConfig {
    /// Validate the profile fields and build the user.
    pub fn user(&self) -> Result<User> {
        let update = ProfileForm {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
        .validate()
        .context("Invalid [profile] section")?;

        let mut user = User::new(self.id.as_str(), "", "", self.role);
        user.apply_profile(update);
        Ok(user)
    }
}

/// Generate a default greens.toml config file.
pub fn generate_default_config() -> String {
    r#"# Global Greens storefront client configuration

[api]
base_url = "http://localhost:5000/api"
currency = "USD"
connect_timeout_ms = 5000
request_timeout_ms = 15000
max_retries = 2
retry_statuses = [429]

[voucher]
latency_ms = 500

# Leave out [[voucher.rules]] to use SAVE10, WELCOME and FIXED15.
# [[voucher.rules]]
# code = "SPRING5"
# kind = "fixed"
# value = 5.0

# [profile]
# id = "u-1"
# name = "Asha Rao"
# email = "asha@example.com"
# role = "seller"
"#
    .to_string()
}
