/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

pub mod logging;
pub mod offset_store;
pub mod registry;
pub mod transaction;

use crate::error::SessionError;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use logging::LoggingConfig;
use offset_store::OffsetStoreConfig;
use registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use transaction::TransactionConfig;

pub const ENV_PREFIX: &str = "SESSION_LEDGER_";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub registry: RegistryConfig,
    pub offset_store: OffsetStoreConfig,
    pub transaction: TransactionConfig,
    pub logging: LoggingConfig,
}

impl SessionConfig {
    /// Defaults, then the optional TOML file, then `SESSION_LEDGER_*` environment variables.
    /// Nested keys are separated with `__`, e.g. `SESSION_LEDGER_REGISTRY__LOCK_TIMEOUT=1500`.
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, SessionError> {
        let mut figment = Figment::from(Serialized::defaults(SessionConfig::default()));
        if let Some(path) = path {
            info!("Loading session config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let config: SessionConfig = figment
            .merge(Env::prefixed(env_prefix).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        let durations = [
            ("registry.lock_timeout", self.registry.lock_timeout),
            (
                "registry.channel_expired_timeout",
                self.registry.channel_expired_timeout,
            ),
            ("registry.scan_interval", self.registry.scan_interval),
            ("offset_store.rpc_timeout", self.offset_store.rpc_timeout),
            ("transaction.check_timeout", self.transaction.check_timeout),
        ];
        for (name, value) in durations {
            if value == Duration::ZERO {
                return Err(SessionError::InvalidConfiguration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_should_match_broker_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.registry.lock_timeout, Duration::from_millis(3_000));
        assert_eq!(
            config.registry.channel_expired_timeout,
            Duration::from_millis(120_000)
        );
        assert_eq!(config.offset_store.rpc_timeout, Duration::from_millis(5_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_file_should_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[registry]\nlock_timeout = 250\n\n[offset_store]\nrpc_timeout = 1000\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config =
            SessionConfig::load_with_env_prefix(Some(file.path()), "SESSION_LEDGER_TOML_TEST_")
                .unwrap();

        assert_eq!(config.registry.lock_timeout, Duration::from_millis(250));
        assert_eq!(
            config.registry.channel_expired_timeout,
            Duration::from_millis(120_000)
        );
        assert_eq!(config.offset_store.rpc_timeout, Duration::from_millis(1_000));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn env_should_override_file() {
        std::env::set_var("SESSION_LEDGER_ENV_TEST_REGISTRY__SCAN_INTERVAL", "500");
        let config =
            SessionConfig::load_with_env_prefix(None, "SESSION_LEDGER_ENV_TEST_").unwrap();
        std::env::remove_var("SESSION_LEDGER_ENV_TEST_REGISTRY__SCAN_INTERVAL");

        assert_eq!(config.registry.scan_interval, Duration::from_millis(500));
    }

    #[test]
    fn zero_timeout_should_be_rejected() {
        let mut config = SessionConfig::default();
        config.offset_store.rpc_timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfiguration(_))
        ));
    }
}
