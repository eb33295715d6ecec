use std::{collections::HashMap, fmt, time::Duration};

use reqwest::Url;
use tracing::warn;

use super::{
    blank_to_none, parse_flag, Config, ConfigSource, DatabaseConfig, Error, InfluxDbV2Config,
    SpeedTestConfig, DEFAULT_COMMAND, DEFAULT_DELAY_SECS, DEFAULT_URL,
};

/// Process environment. Always targets InfluxDB 2 and never fails: every
/// variable falls back to a usable default.
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Variables whose name or value is not UTF-8 are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        blank_to_none(self.vars.get(key).cloned())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn delay(&self) -> u64 {
        let raw = match self.get("GENERAL_DELAY") {
            Some(raw) => raw,
            None => return DEFAULT_DELAY_SECS,
        };

        match raw.parse::<u64>() {
            Ok(delay) if delay > 0 => delay,
            _ => {
                warn!(
                    variable = "GENERAL_DELAY",
                    value = raw.as_str(),
                    default = DEFAULT_DELAY_SECS,
                    "invalid delay, using default"
                );
                DEFAULT_DELAY_SECS
            }
        }
    }

    fn url(&self) -> String {
        let raw = match self.get("INFLUX_URL") {
            Some(raw) => raw,
            None => return DEFAULT_URL.to_string(),
        };

        match Url::parse(&raw) {
            Ok(_) => raw,
            Err(e) => {
                warn!(
                    variable = "INFLUX_URL",
                    value = raw.as_str(),
                    error = %e,
                    default = DEFAULT_URL,
                    "invalid url, using default"
                );
                DEFAULT_URL.to_string()
            }
        }
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            vars: HashMap::from_iter(iter),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("environment")
    }
}

impl ConfigSource for Environment {
    fn load(&self) -> Result<Config, Error> {
        Ok(Config {
            delay: Duration::from_secs(self.delay()),
            verbose: parse_flag(self.vars.get("GENERAL_OUTPUT").map(String::as_str), true),
            database: DatabaseConfig::V2(InfluxDbV2Config {
                url: self.url(),
                token: self.get_or("INFLUX_TOKEN", "my-token"),
                org: self.get_or("INFLUX_ORG", "my-org"),
                bucket: self.get_or("INFLUX_BUCKET", "my-bucket"),
            }),
            speedtest: SpeedTestConfig {
                command: self.get_or("SPEEDTEST_COMMAND", DEFAULT_COMMAND),
                server: self.get("SPEEDTEST_SERVER"),
            },
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Environment;
    use crate::config::{ConfigSource, DatabaseConfig, InfluxDbV2Config, SpeedTestConfig};

    fn env(vars: &[(&str, &str)]) -> Environment {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = env(&[]).load().unwrap();

        assert_eq!(config.delay, Duration::from_secs(2));
        assert!(config.verbose);
        assert_eq!(config.speedtest, SpeedTestConfig::default());
        assert_eq!(
            config.database,
            DatabaseConfig::V2(InfluxDbV2Config {
                url: "http://localhost:8086".to_string(),
                token: "my-token".to_string(),
                org: "my-org".to_string(),
                bucket: "my-bucket".to_string(),
            })
        );
    }

    #[test]
    fn test_overrides() {
        let config = env(&[
            ("GENERAL_DELAY", "30"),
            ("GENERAL_OUTPUT", "false"),
            ("INFLUX_URL", "http://influx:8086"),
            ("INFLUX_TOKEN", "secret"),
            ("INFLUX_ORG", "home"),
            ("INFLUX_BUCKET", "speed"),
            ("SPEEDTEST_SERVER", "speedtest.example.net:8080"),
            ("SPEEDTEST_COMMAND", "/usr/local/bin/SpeedTest"),
        ])
        .load()
        .unwrap();

        assert_eq!(config.delay, Duration::from_secs(30));
        assert!(!config.verbose);
        assert_eq!(
            config.speedtest,
            SpeedTestConfig {
                command: "/usr/local/bin/SpeedTest".to_string(),
                server: Some("speedtest.example.net:8080".to_string()),
            }
        );
        assert_eq!(
            config.database,
            DatabaseConfig::V2(InfluxDbV2Config {
                url: "http://influx:8086".to_string(),
                token: "secret".to_string(),
                org: "home".to_string(),
                bucket: "speed".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        for delay in ["0", "-5", "two", ""] {
            let config = env(&[("GENERAL_DELAY", delay)]).load().unwrap();
            assert_eq!(config.delay, Duration::from_secs(2), "delay {delay:?}");
        }

        assert!(env(&[("GENERAL_OUTPUT", "")]).load().unwrap().verbose);
        assert!(env(&[("GENERAL_OUTPUT", "yes")]).load().unwrap().verbose);
        assert!(!env(&[("GENERAL_OUTPUT", "0")]).load().unwrap().verbose);

        for url in ["not a url", "http://[::1", "http://influx:port"] {
            match env(&[("INFLUX_URL", url)]).load().unwrap().database {
                DatabaseConfig::V2(db) => assert_eq!(db.url, "http://localhost:8086", "{url:?}"),
                other => panic!("expected v2 database, got {other:?}"),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        std::env::set_var("SPEED2INFLUX_TEST_BINARY", OsStr::from_bytes(&[0xff, 0xfe]));
        std::env::set_var(OsStr::from_bytes(&[0xfe, 0xff]), "value");
        std::env::set_var("SPEED2INFLUX_TEST_TEXT", "kept");

        let env = Environment::from_process();

        assert!(!env.vars.contains_key("SPEED2INFLUX_TEST_BINARY"));
        assert_eq!(env.vars["SPEED2INFLUX_TEST_TEXT"], "kept");
        assert!(env.load().is_ok());
    }
}
