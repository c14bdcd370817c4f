use std::fmt;
use std::str::FromStr;

/// Level accepted by `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `info` in production, `debug` everywhere else.
    pub fn default_for(is_production: bool) -> Self {
        if is_production {
            LogLevel::Info
        } else {
            LogLevel::Debug
        }
    }

    /// Read `LOG_LEVEL`; unknown values fall back to the environment default.
    pub fn from_env(is_production: bool) -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| Self::default_for(is_production))
    }

    /// Directive string for `EnvFilter`.
    pub fn directives(&self) -> String {
        format!("profile_directory={self},tower_http={self},axum=info,sqlx=warn")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}
