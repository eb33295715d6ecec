use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use configparser::ini::Ini;

use super::{
    blank_to_none, parse_flag, Config, ConfigSource, DatabaseConfig, Error, InfluxDbV1Config,
    InfluxDbV2Config, SpeedTestConfig, DEFAULT_COMMAND, DEFAULT_DATABASE, DEFAULT_DELAY_SECS,
    DEFAULT_PORT,
};

const GENERAL: &str = "GENERAL";
const INFLUXDB: &str = "INFLUXDB";
const SPEEDTEST: &str = "SPEEDTEST";

/// INI file with `GENERAL`, `INFLUXDB` and `SPEEDTEST` sections.
///
/// The `INFLUXDB` block is read as an InfluxDB 2 target when it carries a
/// `Url` key, and as an InfluxDB 1 target (which requires `Address`)
/// otherwise.
pub struct IniFile {
    path: PathBuf,
}

impl IniFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl fmt::Display for IniFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl ConfigSource for IniFile {
    fn load(&self) -> Result<Config, Error> {
        if !self.path.is_file() {
            return Err(Error::NotFound(self.path.clone()));
        }

        let mut ini = Ini::new();
        ini.load(&self.path)
            .map_err(|e| Error::Parse(e, self.path.clone()))?;

        from_ini(&ini)
    }
}

fn get(ini: &Ini, section: &str, key: &str) -> Option<String> {
    blank_to_none(ini.get(section, key))
}

fn get_or(ini: &Ini, section: &str, key: &str, default: &str) -> String {
    get(ini, section, key).unwrap_or_else(|| default.to_string())
}

fn get_positive<T>(ini: &Ini, section: &str, key: &str, default: T) -> Result<T, Error>
where
    T: FromStr + PartialOrd + Default,
{
    match get(ini, section, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(v) if v > T::default() => Ok(v),
            _ => Err(Error::InvalidValue(format!("{section}.{key}"), raw)),
        },
    }
}

fn database(ini: &Ini) -> Result<DatabaseConfig, Error> {
    if let Some(url) = get(ini, INFLUXDB, "Url") {
        return Ok(DatabaseConfig::V2(InfluxDbV2Config {
            url,
            token: get_or(ini, INFLUXDB, "Token", ""),
            org: get_or(ini, INFLUXDB, "Org", ""),
            bucket: get_or(ini, INFLUXDB, "Bucket", ""),
        }));
    }

    let host =
        get(ini, INFLUXDB, "Address").ok_or_else(|| Error::Missing(format!("{INFLUXDB}.Address")))?;

    Ok(DatabaseConfig::V1(InfluxDbV1Config {
        host,
        port: get_positive(ini, INFLUXDB, "Port", DEFAULT_PORT)?,
        database: get_or(ini, INFLUXDB, "Database", DEFAULT_DATABASE),
        username: get_or(ini, INFLUXDB, "Username", ""),
        password: get_or(ini, INFLUXDB, "Password", ""),
        ssl: parse_flag(ini.get(INFLUXDB, "SSL").as_deref(), false),
        verify_ssl: parse_flag(ini.get(INFLUXDB, "Verify_SSL").as_deref(), true),
    }))
}

fn from_ini(ini: &Ini) -> Result<Config, Error> {
    let delay = get_positive(ini, GENERAL, "Delay", DEFAULT_DELAY_SECS)?;

    Ok(Config {
        delay: Duration::from_secs(delay),
        verbose: parse_flag(ini.get(GENERAL, "Output").as_deref(), true),
        database: database(ini)?,
        speedtest: SpeedTestConfig {
            command: get_or(ini, SPEEDTEST, "Command", DEFAULT_COMMAND),
            server: get(ini, SPEEDTEST, "Server"),
        },
    })
}

#[cfg(test)]
mod test {
    use std::{io::Write, time::Duration};

    use configparser::ini::Ini;

    use super::{from_ini, IniFile};
    use crate::config::{ConfigSource, DatabaseConfig, Error, InfluxDbV1Config, InfluxDbV2Config};

    fn parse(content: &str) -> Result<crate::config::Config, Error> {
        let mut ini = Ini::new();
        ini.read(content.to_string()).unwrap();
        from_ini(&ini)
    }

    #[test]
    fn test_v1_defaults() {
        let config = parse("[INFLUXDB]\nAddress = influx.lan\n").unwrap();

        assert_eq!(config.delay, Duration::from_secs(2));
        assert!(config.verbose);
        assert_eq!(config.speedtest.command, "SpeedTest");
        assert_eq!(config.speedtest.server, None);
        assert_eq!(
            config.database,
            DatabaseConfig::V1(InfluxDbV1Config {
                host: "influx.lan".to_string(),
                port: 8086,
                database: "speedtests".to_string(),
                username: "".to_string(),
                password: "".to_string(),
                ssl: false,
                verify_ssl: true,
            })
        );
    }

    #[test]
    fn test_v1_full() {
        let config = parse(
            "[GENERAL]\n\
             Delay = 5\n\
             Output = False\n\
             [INFLUXDB]\n\
             Address = 10.0.0.2\n\
             Port = 8087\n\
             Database = speed\n\
             Username = admin\n\
             Password = secret\n\
             SSL = True\n\
             Verify_SSL = False\n\
             [SPEEDTEST]\n\
             Server = speedtest.example.net:8080\n",
        )
        .unwrap();

        assert_eq!(config.delay, Duration::from_secs(5));
        assert!(!config.verbose);
        assert_eq!(
            config.speedtest.server.as_deref(),
            Some("speedtest.example.net:8080")
        );

        match config.database {
            DatabaseConfig::V1(db) => {
                assert_eq!(db.port, 8087);
                assert_eq!(db.database, "speed");
                assert_eq!(db.username, "admin");
                assert_eq!(db.password, "secret");
                assert!(db.ssl);
                assert!(!db.verify_ssl);
            }
            other => panic!("expected v1 database, got {other:?}"),
        }
    }

    #[test]
    fn test_v2_block() {
        let config = parse(
            "[INFLUXDB]\n\
             Url = https://influx.example.com\n\
             Token = t0k3n\n\
             Org = home\n\
             Bucket = speed\n",
        )
        .unwrap();

        assert_eq!(
            config.database,
            DatabaseConfig::V2(InfluxDbV2Config {
                url: "https://influx.example.com".to_string(),
                token: "t0k3n".to_string(),
                org: "home".to_string(),
                bucket: "speed".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_address() {
        assert!(matches!(
            parse("[GENERAL]\nDelay = 3\n"),
            Err(Error::Missing(option)) if option == "INFLUXDB.Address"
        ));
    }

    #[test]
    fn test_invalid_delay() {
        for delay in ["0", "-1", "soon"] {
            let content = format!("[GENERAL]\nDelay = {delay}\n[INFLUXDB]\nAddress = a\n");
            assert!(matches!(
                parse(&content),
                Err(Error::InvalidValue(option, _)) if option == "GENERAL.Delay"
            ));
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        assert!(matches!(
            IniFile::new(&path).load(),
            Err(Error::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[GENERAL]\nDelay = 10\n[INFLUXDB]\nAddress = localhost").unwrap();

        let config = IniFile::new(file.path()).load().unwrap();
        assert_eq!(config.delay, Duration::from_secs(10));
    }
}
