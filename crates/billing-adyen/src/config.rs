//! # Adyen Webhook Configuration
//!
//! How inbound Adyen webhooks are authenticated.
//! All secrets are loaded from environment variables.

use billing_core::env::{bool_var, var_or};
use billing_core::{BillingError, BillingResult};

const ENV_PREFIX: &str = "EXCHEQUER_ADYEN_WEBHOOK_";

/// Adyen webhook authentication settings
#[derive(Clone, Default)]
pub struct AdyenWebhookConfig {
    /// Require HTTP basic auth on the webhook endpoint
    pub use_basic_auth: bool,

    /// Basic auth username configured in the Adyen customer area
    pub username: String,

    /// Basic auth password (plaintext)
    pub password: String,

    /// Verify the HMAC signature of every notification item
    pub verify_hmac: bool,

    /// Hex encoded HMAC key from the Adyen customer area
    pub hmac_secret: String,
}

impl AdyenWebhookConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized env vars (all optional):
    /// - `EXCHEQUER_ADYEN_WEBHOOK_USE_BASIC_AUTH`
    /// - `EXCHEQUER_ADYEN_WEBHOOK_USERNAME`
    /// - `EXCHEQUER_ADYEN_WEBHOOK_PASSWORD`
    /// - `EXCHEQUER_ADYEN_WEBHOOK_VERIFY_HMAC`
    /// - `EXCHEQUER_ADYEN_WEBHOOK_HMAC_SECRET`
    pub fn from_env() -> BillingResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            use_basic_auth: bool_var(&key("USE_BASIC_AUTH"), false)?,
            username: var_or(&key("USERNAME"), ""),
            password: var_or(&key("PASSWORD"), ""),
            verify_hmac: bool_var(&key("VERIFY_HMAC"), false)?,
            hmac_secret: var_or(&key("HMAC_SECRET"), ""),
        };

        config.validate()?;
        Ok(config)
    }

    /// Builder: require basic auth with the given credentials
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.use_basic_auth = true;
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Builder: verify HMAC signatures with the given hex secret
    pub fn with_hmac_secret(mut self, secret: impl Into<String>) -> Self {
        self.verify_hmac = true;
        self.hmac_secret = secret.into();
        self
    }

    /// Check the settings are usable together
    pub fn validate(&self) -> BillingResult<()> {
        if self.use_basic_auth && (self.username.is_empty() || self.password.is_empty()) {
            return Err(BillingError::Configuration(
                "username and password required when basic auth is enabled".to_string(),
            ));
        }

        if self.verify_hmac {
            if self.hmac_secret.is_empty() {
                return Err(BillingError::Configuration(
                    "hmac secret is required when verify hmac is enabled".to_string(),
                ));
            }

            if hex::decode(&self.hmac_secret).is_err() {
                return Err(BillingError::Configuration(
                    "hmac secret must be a hex encoded string".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Check basic auth credentials against the configured ones
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        // Evaluate both so a wrong username costs the same as a wrong password.
        let user_ok = crate::verify::constant_time_compare(username, &self.username);
        let pass_ok = crate::verify::constant_time_compare(password, &self.password);
        user_ok & pass_ok
    }
}

impl std::fmt::Debug for AdyenWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdyenWebhookConfig")
            .field("use_basic_auth", &self.use_basic_auth)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("verify_hmac", &self.verify_hmac)
            .field("hmac_secret", &"[redacted]")
            .finish()
    }
}

fn key(name: &str) -> String {
    format!("{}{}", ENV_PREFIX, name)
}
