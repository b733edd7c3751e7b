use chrono::{FixedOffset, Local, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const PLUGIN_NAME: &str = "INTRSPD";

const DEFAULT_INSTALL_PATH: &str = "/app";
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct Settings {
    pub log_path: PathBuf,
    pub log_level: LogLevel,
    pub timezone: Timezone,
    pub binary: PathBuf,
    pub binary_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_INSTALL_PATH).join("log"),
            log_level: LogLevel::default(),
            timezone: Timezone::Local,
            binary: PathBuf::from("/usr/bin/speedtest"),
            binary_args: vec![
                "--format=json".to_string(),
                "--accept-license".to_string(),
                "--accept-gdpr".to_string(),
            ],
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from host bootstrap variables. `LOG_LEVEL` and
    /// `TIMEZONE` fall back to the host's `config/app.conf` when the lookup
    /// has no value for them.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let install_path = lookup("NETALERTX_APP")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_PATH));
        let log_path = lookup("NETALERTX_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| install_path.join("log"));

        let host_conf = read_host_conf(&install_path.join("config").join("app.conf"));
        let setting = |key: &str| lookup(key).or_else(|| host_conf.get(key).cloned());

        Self {
            log_level: setting("LOG_LEVEL")
                .map(|v| LogLevel::from_setting(&v))
                .unwrap_or_default(),
            timezone: setting("TIMEZONE")
                .map(|v| Timezone::from_setting(&v))
                .unwrap_or(Timezone::Local),
            log_path,
            ..Self::default()
        }
    }

    pub fn result_file(&self) -> PathBuf {
        self.log_path
            .join("plugins")
            .join(format!("last_result.{PLUGIN_NAME}.log"))
    }
}

/// Host log levels, from quietest to noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    None,
    Minimal,
    #[default]
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    /// Unknown values keep the default level.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => LogLevel::None,
            "minimal" => LogLevel::Minimal,
            "verbose" => LogLevel::Verbose,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::default(),
        }
    }

    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Minimal => "warn",
            LogLevel::Verbose => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    /// System local time, which honours `TZ`.
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl Timezone {
    pub fn from_setting(value: &str) -> Self {
        let value = value.trim();
        match value.to_ascii_uppercase().as_str() {
            "UTC" | "ETC/UTC" | "GMT" | "ETC/GMT" | "Z" => Timezone::Utc,
            _ => parse_offset(value).map_or(Timezone::Local, Timezone::Fixed),
        }
    }

    pub fn now_db(&self) -> String {
        match self {
            Timezone::Local => Local::now().format(DB_TIMESTAMP_FORMAT).to_string(),
            Timezone::Utc => Utc::now().format(DB_TIMESTAMP_FORMAT).to_string(),
            Timezone::Fixed(offset) => Utc::now()
                .with_timezone(offset)
                .format(DB_TIMESTAMP_FORMAT)
                .to_string(),
        }
    }
}

// Accepts `+hh:mm`, `-hhmm` and `+hh`.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn read_host_conf(path: &Path) -> HashMap<String, String> {
    let Ok(content) = fs::read_to_string(path) else {
        return HashMap::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
