use std::time::Duration;

use crate::Result;

/// Runtime knobs for the execution loop (§5 Timeouts, §9 Open Question d).
///
/// The original source hard-codes these as constants; this crate treats them
/// as configurable with the documented defaults, loaded via the `config`
/// crate from environment variables prefixed `TASKLOOP_`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub agent_timeout: Duration,
    pub verify_timeout: Duration,
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
    pub subprocess_grace: Duration,
    pub max_attempts: u32,
    pub max_transient_retries: u32,
    pub cooldown: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(15 * 60),
            verify_timeout: Duration::from_secs(2 * 60),
            lock_timeout: Duration::from_secs(15),
            lock_poll_interval: Duration::from_millis(150),
            subprocess_grace: Duration::from_secs(10),
            max_attempts: 3,
            max_transient_retries: 3,
            cooldown: Duration::from_secs(0),
        }
    }
}

impl Settings {
    /// Loads defaults overridden by `TASKLOOP_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();

        let builder = config::Config::builder()
            .add_source(config::Environment::with_prefix("TASKLOOP"))
            .build()?;

        if let Ok(secs) = builder.get_int("agent_timeout_secs") {
            settings.agent_timeout = Duration::from_secs(secs.max(0) as u64);
        }
        if let Ok(secs) = builder.get_int("verify_timeout_secs") {
            settings.verify_timeout = Duration::from_secs(secs.max(0) as u64);
        }
        if let Ok(secs) = builder.get_int("lock_timeout_secs") {
            settings.lock_timeout = Duration::from_secs(secs.max(0) as u64);
        }
        if let Ok(secs) = builder.get_int("subprocess_grace_secs") {
            settings.subprocess_grace = Duration::from_secs(secs.max(0) as u64);
        }
        if let Ok(n) = builder.get_int("max_attempts") {
            settings.max_attempts = n.max(1) as u32;
        }
        if let Ok(n) = builder.get_int("max_transient_retries") {
            settings.max_transient_retries = n.max(0) as u32;
        }
        if let Ok(secs) = builder.get_int("cooldown_secs") {
            settings.cooldown = Duration::from_secs(secs.max(0) as u64);
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_with_no_environment_overrides() {
        for key in [
            "TASKLOOP_AGENT_TIMEOUT_SECS",
            "TASKLOOP_MAX_ATTEMPTS",
            "TASKLOOP_COOLDOWN_SECS",
        ] {
            std::env::remove_var(key);
        }
        let settings = Settings::load().unwrap();
        assert_eq!(settings.agent_timeout, Duration::from_secs(15 * 60));
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        std::env::set_var("TASKLOOP_AGENT_TIMEOUT_SECS", "60");
        std::env::set_var("TASKLOOP_MAX_ATTEMPTS", "5");

        let settings = Settings::load().unwrap();
        assert_eq!(settings.agent_timeout, Duration::from_secs(60));
        assert_eq!(settings.max_attempts, 5);

        std::env::remove_var("TASKLOOP_AGENT_TIMEOUT_SECS");
        std::env::remove_var("TASKLOOP_MAX_ATTEMPTS");
    }
}
