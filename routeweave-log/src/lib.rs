//! Logging for routeweave.
//!
//! Entries go to stderr. The environment is read once, on first use:
//!
//! - `ROUTEWEAVE_LOG_LEVEL=trace|debug|info|warn|error|off` - minimum level
//! - `ROUTEWEAVE_DEBUG=1` - shorthand for `debug` when no level is set
//! - `ROUTEWEAVE_LOG_FORMAT=pretty|compact|json` - output format (default json)
//! - `ROUTEWEAVE_LOG_TIMESTAMPS=1|0` - include timestamps
//!
//! ```rust
//! use routeweave_log::{debug, info};
//!
//! info!("registered {} routes", 3);
//! debug!("compiling {}", "/users/{id}");
//! ```

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::json;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" => Ok(Level::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Compact,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings from `lookup`. Unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        };
        let defaults = Self::default();

        let level = lookup("ROUTEWEAVE_LOG_LEVEL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(match flag("ROUTEWEAVE_DEBUG") {
                Some(true) => Level::Debug,
                _ => defaults.level,
            });

        Self {
            level,
            format: lookup("ROUTEWEAVE_LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.format),
            timestamps: flag("ROUTEWEAVE_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level >= self.level
    }

    /// Format one entry, without the trailing newline.
    pub fn render(&self, level: Level, target: &str, message: &str, at: DateTime<Utc>) -> String {
        match self.format {
            Format::Json => {
                let mut entry = json!({
                    "level": level.as_str(),
                    "target": target,
                    "message": message,
                });
                if self.timestamps {
                    entry["timestamp"] = at.to_rfc3339().into();
                }
                entry.to_string()
            }
            Format::Pretty => {
                let stamp = self.stamp(at, "%Y-%m-%d %H:%M:%S%.3f ");
                format!("{}{:5} [{}] {}", stamp, level.as_str(), target, message)
            }
            Format::Compact => {
                let stamp = self.stamp(at, "%H:%M:%S ");
                let letter = &level.as_str()[..1];
                format!("{}{} {}: {}", stamp, letter, target, message)
            }
        }
    }

    fn stamp(&self, at: DateTime<Utc>, pattern: &str) -> String {
        if self.timestamps {
            at.format(pattern).to_string()
        } else {
            String::new()
        }
    }
}

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn enabled(level: Level) -> bool {
    CONFIG.enabled(level)
}

#[doc(hidden)]
pub fn write(level: Level, target: &str, message: &str) {
    eprintln!("{}", CONFIG.render(level, target, message, Utc::now()));
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, $($arg:tt)+) => {
        if $crate::enabled($level) {
            $crate::write($level, module_path!(), &format!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_lookup(|name| vars.get(name).cloned())
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert!("loud".parse::<Level>().is_err());
        assert_eq!(" Compact ".parse::<Format>(), Ok(Format::Compact));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_config_from_lookup() {
        assert_eq!(from(&[]), LogConfig::default());

        let debug = from(&[("ROUTEWEAVE_DEBUG", "1")]);
        assert_eq!(debug.level, Level::Debug);

        let explicit = from(&[
            ("ROUTEWEAVE_DEBUG", "1"),
            ("ROUTEWEAVE_LOG_LEVEL", "error"),
            ("ROUTEWEAVE_LOG_FORMAT", "pretty"),
            ("ROUTEWEAVE_LOG_TIMESTAMPS", "0"),
        ]);
        assert_eq!(explicit.level, Level::Error);
        assert_eq!(explicit.format, Format::Pretty);
        assert!(!explicit.timestamps);

        assert_eq!(from(&[("ROUTEWEAVE_LOG_LEVEL", "loud")]).level, Level::Info);
    }

    #[test]
    fn test_enabled() {
        let config = from(&[("ROUTEWEAVE_LOG_LEVEL", "warn")]);
        assert!(config.enabled(Level::Error));
        assert!(config.enabled(Level::Warn));
        assert!(!config.enabled(Level::Info));
        assert!(!from(&[("ROUTEWEAVE_LOG_LEVEL", "trace")]).enabled(Level::Off));
        assert!(!from(&[("ROUTEWEAVE_LOG_LEVEL", "off")]).enabled(Level::Error));
    }

    #[test]
    fn test_render_json() {
        let line = LogConfig::default().render(Level::Info, "routeweave::registrar", "a \"b\"", noon());
        let entry: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(entry["level"], "INFO");
        assert_eq!(entry["message"], "a \"b\"");
        assert_eq!(entry["timestamp"], "2024-05-01T12:00:00+00:00");

        let quiet = from(&[("ROUTEWEAVE_LOG_TIMESTAMPS", "false")]);
        assert!(!quiet.render(Level::Info, "t", "m", noon()).contains("timestamp"));
    }

    #[test]
    fn test_render_text() {
        let pretty = from(&[("ROUTEWEAVE_LOG_FORMAT", "pretty")]);
        assert_eq!(
            pretty.render(Level::Warn, "t", "careful", noon()),
            "2024-05-01 12:00:00.000 WARN  [t] careful"
        );

        let compact = from(&[
            ("ROUTEWEAVE_LOG_FORMAT", "compact"),
            ("ROUTEWEAVE_LOG_TIMESTAMPS", "0"),
        ]);
        assert_eq!(compact.render(Level::Error, "t", "boom", noon()), "E t: boom");
    }

    #[test]
    fn test_macros_expand() {
        trace!("trace {}", 1);
        debug!("debug");
        info!("info {}", "x");
        warn!("warn");
        error!("error {:?}", Some(2));
    }
}
