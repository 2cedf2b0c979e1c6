//! Account model types.

use std::time::Duration;

use popledger_pop3::{AuthMechanism, Config, Security};
use serde::{Deserialize, Serialize};

/// POP3 account configuration, as stored in `config.json`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (default: 995 with SSL, 110 otherwise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Connect with implicit TLS.
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
    /// Upgrade a plaintext connection with STLS (ignored when `use_ssl` is set).
    #[serde(default)]
    pub starttls: bool,
    /// Mailbox name.
    pub username: String,
    /// Password or shared secret.
    pub password: String,
    /// Authentication mechanism: `plain`, `apop` or `rpop`.
    #[serde(default, with = "auth_method")]
    pub auth_method: AuthMechanism,
    /// Transport options.
    #[serde(default)]
    pub options: ConnectionOptions,
}

const fn default_use_ssl() -> bool {
    true
}

impl AccountConfig {
    /// Creates a configuration with defaults for everything but the
    /// host and credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: None,
            use_ssl: true,
            starttls: false,
            username: username.into(),
            password: password.into(),
            auth_method: AuthMechanism::default(),
            options: ConnectionOptions::default(),
        }
    }

    /// Returns the transport security mode.
    #[must_use]
    pub const fn security(&self) -> Security {
        match (self.use_ssl, self.starttls) {
            (true, _) => Security::Implicit,
            (false, true) => Security::StartTls,
            (false, false) => Security::None,
        }
    }

    /// Returns the configured port or the default for the security mode.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security().default_port())
    }

    /// Builds the connection configuration for the POP3 client.
    #[must_use]
    pub fn connection_config(&self) -> Config {
        Config::builder(self.host.clone())
            .port_opt(self.port)
            .security(self.security())
            .connect_timeout(self.options.connect_timeout())
            .io_timeout(self.options.io_timeout())
            .build()
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("security", &self.security())
            .field("username", &self.username)
            .field("password", &"****")
            .field("auth_method", &self.auth_method)
            .field("options", &self.options)
            .finish()
    }
}

/// Transport options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Seconds allowed for TCP connect plus TLS handshake.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for each reply line.
    pub io_timeout_secs: u64,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            io_timeout_secs: 60,
        }
    }
}

impl ConnectionOptions {
    /// Connect timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout as a duration.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// (De)serializes [`AuthMechanism`] by name.
mod auth_method {
    use popledger_pop3::AuthMechanism;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(mechanism: &AuthMechanism, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(mechanism.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AuthMechanism, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        name.as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: AccountConfig = serde_json::from_str(
            r#"{"host": "pop.example.com", "username": "alice", "password": "secret"}"#,
        )
        .unwrap();

        assert!(config.use_ssl);
        assert_eq!(config.security(), Security::Implicit);
        assert_eq!(config.port(), 995);
        assert_eq!(config.auth_method, AuthMechanism::Plain);
        assert_eq!(config.options, ConnectionOptions::default());
    }

    #[test]
    fn test_full_json() {
        let config: AccountConfig = serde_json::from_str(
            r#"{
                "host": "pop.example.com",
                "port": 1110,
                "use_ssl": false,
                "starttls": true,
                "username": "alice",
                "password": "secret",
                "auth_method": "challenge-response",
                "options": {"connect_timeout_secs": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(config.security(), Security::StartTls);
        assert_eq!(config.port(), 1110);
        assert_eq!(config.auth_method, AuthMechanism::ChallengeResponse);
        assert_eq!(config.options.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.options.io_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_plaintext_default_port() {
        let mut config = AccountConfig::new("pop.example.com", "alice", "secret");
        config.use_ssl = false;
        assert_eq!(config.port(), 110);
        assert_eq!(config.connection_config().port, 110);
    }

    #[test]
    fn test_null_auth_method_is_plain() {
        let config: AccountConfig = serde_json::from_str(
            r#"{"host": "h", "username": "u", "password": "p", "auth_method": null}"#,
        )
        .unwrap();
        assert_eq!(config.auth_method, AuthMechanism::Plain);
    }

    #[test]
    fn test_unknown_auth_method_rejected() {
        let result: Result<AccountConfig, _> = serde_json::from_str(
            r#"{"host": "h", "username": "u", "password": "p", "auth_method": "gssapi"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = AccountConfig::new("pop.example.com", "alice", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = AccountConfig::new("pop.example.com", "alice", "secret");
        config.auth_method = AuthMechanism::RelationshipBased;

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""auth_method":"rpop""#));
        let back: AccountConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
