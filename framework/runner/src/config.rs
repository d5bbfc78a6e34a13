use std::collections::HashMap;
use std::env;
use std::time::Duration;

use stampede_core::prelude::ConfigError;

use crate::cli::StampedeScenarioCli;
use crate::definition::ScenarioDefinition;

/// Environment variable to override the base URL that requests are sent to.
pub const TARGET_URL_ENV: &str = "TARGET_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_VUS: usize = 30;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(120);

/// The settings for a single run. Validated before any virtual user starts and never changed
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// The number of virtual users
    pub concurrency: usize,
    /// How long virtual users keep starting new iterations
    pub duration: Duration,
    pub base_url: String,
    /// Variable overrides. These take precedence over the scenario's own variables.
    pub env: HashMap<String, String>,
}

impl RunConfig {
    pub fn new(concurrency: usize, duration: Duration, base_url: impl Into<String>) -> Self {
        Self {
            concurrency,
            duration,
            base_url: base_url.into(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Combine command line flags, the environment and the scenario's defaults.
    pub fn from_cli(cli: &StampedeScenarioCli, definition: &ScenarioDefinition) -> Self {
        let base_url = cli.target_url.clone().unwrap_or_else(base_url_from_env);

        Self {
            concurrency: cli.vus.or(definition.default_vus).unwrap_or(DEFAULT_VUS),
            duration: cli
                .duration
                .or(definition.default_duration)
                .unwrap_or(DEFAULT_DURATION),
            base_url,
            env: cli.vars.iter().cloned().collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency < 1 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }

        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        Ok(())
    }
}

/// Get the base URL from [TARGET_URL_ENV], falling back to [DEFAULT_BASE_URL] when it is unset
/// or empty.
pub fn base_url_from_env() -> String {
    match env::var(TARGET_URL_ENV).ok().as_deref().map(str::trim) {
        Some("") | None => DEFAULT_BASE_URL.to_string(),
        Some(url) => {
            log::debug!("Using base URL from '{TARGET_URL_ENV}': {url}");
            url.to_string()
        }
    }
}

/// Parse a duration given either as bare seconds (`90`, `1.5`) or as a human readable duration
/// (`2m`, `1m 30s`, `500ms`).
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).map_err(|e| ConfigError::InvalidDuration {
            value: value.to_string(),
            reason: e.to_string(),
        });
    }

    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a `KEY=VALUE` variable override.
pub fn parse_var(value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.to_string()))
        }
        _ => Err(ConfigError::InvalidVariableOverride(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ScenarioDefinitionBuilder;

    fn scenario(vus: Option<usize>, duration: Option<Duration>) -> ScenarioDefinition {
        let mut builder = ScenarioDefinitionBuilder::new("defaults").use_fixed_pace(0.1);
        if let Some(vus) = vus {
            builder = builder.with_default_vus(vus);
        }
        if let Some(duration) = duration {
            builder = builder.with_default_duration(duration);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_should_prefer_cli_over_scenario_defaults() {
        let cli = StampedeScenarioCli {
            vus: Some(2),
            duration: Some(Duration::from_secs(5)),
            target_url: Some("http://cli:2".to_string()),
            ..Default::default()
        };

        let config = RunConfig::from_cli(&cli, &scenario(Some(7), Some(Duration::from_secs(9))));

        assert_eq!(2, config.concurrency);
        assert_eq!(Duration::from_secs(5), config.duration);
        assert_eq!("http://cli:2", config.base_url);
    }

    #[test]
    fn test_should_prefer_scenario_defaults_over_built_in_defaults() {
        let config = RunConfig::from_cli(
            &StampedeScenarioCli::default(),
            &scenario(Some(7), Some(Duration::from_secs(9))),
        );

        assert_eq!(7, config.concurrency);
        assert_eq!(Duration::from_secs(9), config.duration);
    }

    #[test]
    fn test_should_fall_back_to_built_in_defaults() {
        let config = RunConfig::from_cli(&StampedeScenarioCli::default(), &scenario(None, None));

        assert_eq!(DEFAULT_VUS, config.concurrency);
        assert_eq!(DEFAULT_DURATION, config.duration);
    }

    #[test]
    fn test_should_collect_variable_overrides_from_cli() {
        let cli = StampedeScenarioCli {
            vars: vec![
                ("message".to_string(), "hi".to_string()),
                ("unit".to_string(), "air".to_string()),
            ],
            ..Default::default()
        };

        let config = RunConfig::from_cli(&cli, &scenario(None, None));

        assert_eq!(
            HashMap::from([
                ("message".to_string(), "hi".to_string()),
                ("unit".to_string(), "air".to_string()),
            ]),
            config.env
        );
    }

    #[test]
    fn test_should_parse_seconds_and_human_durations() {
        assert_eq!(Duration::from_secs(90), parse_duration("90").unwrap());
        assert_eq!(Duration::from_millis(1500), parse_duration("1.5").unwrap());
        assert_eq!(Duration::from_secs(120), parse_duration("2m").unwrap());
        assert_eq!(Duration::from_secs(90), parse_duration("1m 30s").unwrap());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-3").is_err());
    }

    #[test]
    fn test_should_parse_variable_override() {
        assert_eq!(
            ("message".to_string(), "a=b".to_string()),
            parse_var("message=a=b").unwrap()
        );
        assert!(parse_var("message").is_err());
        assert!(parse_var("=value").is_err());
    }

    #[test]
    fn test_should_reject_zero_concurrency() {
        let config = RunConfig::new(0, Duration::from_secs(1), DEFAULT_BASE_URL);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn test_should_reject_zero_duration() {
        let config = RunConfig::new(1, Duration::ZERO, DEFAULT_BASE_URL);

        assert!(matches!(config.validate(), Err(ConfigError::ZeroDuration)));
    }

    #[test]
    fn test_should_reject_bad_base_url() {
        assert!(RunConfig::new(1, Duration::from_secs(1), "localhost")
            .validate()
            .is_err());
        assert!(RunConfig::new(1, Duration::from_secs(1), "ftp://localhost")
            .validate()
            .is_err());
        assert!(RunConfig::new(1, Duration::from_secs(1), "https://example.com/api")
            .validate()
            .is_ok());
    }

    // The only test that touches the environment, so that tests running in parallel don't race
    // on it.
    #[test]
    fn test_should_read_base_url_from_env() {
        env::set_var(TARGET_URL_ENV, "http://target:9000");
        assert_eq!("http://target:9000", base_url_from_env());

        let from_env = RunConfig::from_cli(&StampedeScenarioCli::default(), &scenario(None, None));
        assert_eq!("http://target:9000", from_env.base_url);

        let cli = StampedeScenarioCli {
            target_url: Some("http://cli:2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            "http://cli:2",
            RunConfig::from_cli(&cli, &scenario(None, None)).base_url
        );

        env::set_var(TARGET_URL_ENV, "");
        assert_eq!(DEFAULT_BASE_URL, base_url_from_env());

        env::remove_var(TARGET_URL_ENV);
        assert_eq!(DEFAULT_BASE_URL, base_url_from_env());
    }
}
