// src/config.rs
use crate::errors::{ForgeError, Result};
use crate::proctor::Chord;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_JUDGE0_URL: &str = "http://localhost:2358";
const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";
const DEFAULT_OVERRIDE_CHORD: &str = "ctrl+shift+x";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_IDLE_SECS: u64 = 3 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeBackendKind {
    Judge0,
    Piston,
}

impl FromStr for JudgeBackendKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "judge0" => Ok(JudgeBackendKind::Judge0),
            "piston" => Ok(JudgeBackendKind::Piston),
            other => Err(ForgeError::Config(format!(
                "JUDGE_BACKEND must be 'judge0' or 'piston', got '{}'",
                other
            ))),
        }
    }
}

/// Configuration for a Judge0 instance, self-hosted or behind RapidAPI.
#[derive(Debug, Clone)]
pub struct Judge0Config {
    pub api_base: String,
    /// Sent as `X-RapidAPI-Key` when set.
    pub api_key: Option<String>,
    /// Sent as `X-RapidAPI-Host` when set.
    pub api_host: Option<String>,
}

/// Configuration for the Piston execution API.
#[derive(Debug, Clone)]
pub struct PistonConfig {
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub backend: JudgeBackendKind,
    pub judge0: Judge0Config,
    pub piston: PistonConfig,
}

/// Bounded retry policy for polling a judge ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Multiplier applied to the delay after every poll. `1.0` keeps it fixed.
    pub backoff: f64,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 30,
            backoff: 1.0,
            max_interval: Duration::from_millis(5000),
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the `attempt`-th poll (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.interval.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_interval.max(self.interval))
    }

    /// Upper bound on the time spent sleeping between polls.
    pub fn total_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1)).map(|n| self.delay(n)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Sqlite { url: String },
    Supabase(SupabaseConfig),
}

#[derive(Debug, Clone)]
pub struct ProctorConfig {
    /// Chord that force-ends a session. `None` disables the override.
    pub override_chord: Option<Chord>,
    /// Sessions with no reported event for this long are dropped.
    pub idle_timeout: Duration,
}

/// High-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub judge: JudgeConfig,
    pub poll: PollPolicy,
    pub store: StoreConfig,
    pub proctor: ProctorConfig,
    pub bind_addr: String,
}

/// Optional TOML file named by `CODEFORGE_CONFIG`. Environment variables win
/// over values set here.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileConfig {
    pub judge: JudgeSection,
    pub poll: PollSection,
    pub store: StoreSection,
    pub proctor: ProctorSection,
    pub server: ServerSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct JudgeSection {
    pub backend: Option<String>,
    pub judge0_url: Option<String>,
    pub judge0_api_key: Option<String>,
    pub judge0_api_host: Option<String>,
    pub piston_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PollSection {
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff: Option<f64>,
    pub max_interval_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct StoreSection {
    pub database_url: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ProctorSection {
    pub override_chord: Option<String>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

impl AppConfig {
    /// Load configuration from the environment, overlaying the optional TOML file.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var("CODEFORGE_CONFIG") {
            Ok(path) => {
                log::info!("Loading configuration file {}", path);
                FileConfig::load(Path::new(&path))?
            }
            Err(_) => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Build the configuration from a file layer and an environment lookup.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |key: &str, fallback: Option<String>| {
            env(key).filter(|v| !v.trim().is_empty()).or(fallback)
        };

        let backend = pick("JUDGE_BACKEND", file.judge.backend)
            .map(|v| v.parse::<JudgeBackendKind>())
            .transpose()?
            .unwrap_or(JudgeBackendKind::Judge0);

        let judge = JudgeConfig {
            backend,
            judge0: Judge0Config {
                api_base: pick("JUDGE0_API_URL", file.judge.judge0_url)
                    .unwrap_or_else(|| DEFAULT_JUDGE0_URL.to_string()),
                api_key: pick("JUDGE0_API_KEY", file.judge.judge0_api_key),
                api_host: pick("JUDGE0_API_HOST", file.judge.judge0_api_host),
            },
            piston: PistonConfig {
                api_base: pick("PISTON_API_URL", file.judge.piston_url)
                    .unwrap_or_else(|| DEFAULT_PISTON_URL.to_string()),
            },
        };

        let defaults = PollPolicy::default();
        let interval_ms = number(&env, "POLL_INTERVAL_MS", file.poll.interval_ms)?
            .unwrap_or(defaults.interval.as_millis() as u64);
        let max_attempts = number(&env, "POLL_MAX_ATTEMPTS", file.poll.max_attempts)?
            .unwrap_or(defaults.max_attempts);
        let backoff = number(&env, "POLL_BACKOFF", file.poll.backoff)?.unwrap_or(defaults.backoff);
        let max_interval_ms = number(&env, "POLL_MAX_INTERVAL_MS", file.poll.max_interval_ms)?
            .unwrap_or(defaults.max_interval.as_millis() as u64);

        if interval_ms == 0 {
            return Err(ForgeError::Config("POLL_INTERVAL_MS must be positive".to_string()));
        }
        if max_attempts == 0 {
            return Err(ForgeError::Config("POLL_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        if !(backoff >= 1.0 && backoff.is_finite()) {
            return Err(ForgeError::Config("POLL_BACKOFF must be a number >= 1.0".to_string()));
        }

        let poll = PollPolicy {
            interval: Duration::from_millis(interval_ms),
            max_attempts,
            backoff,
            max_interval: Duration::from_millis(max_interval_ms),
        };

        let supabase_url = pick("SUPABASE_URL", file.store.supabase_url);
        let supabase_key = pick("SUPABASE_ANON_KEY", file.store.supabase_anon_key);
        let store = match (supabase_url, supabase_key) {
            (Some(url), Some(anon_key)) => {
                StoreConfig::Supabase(SupabaseConfig { url, anon_key })
            }
            (Some(_), None) => {
                return Err(ForgeError::Config(
                    "SUPABASE_URL is set but SUPABASE_ANON_KEY is missing".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ForgeError::Config(
                    "SUPABASE_ANON_KEY is set but SUPABASE_URL is missing".to_string(),
                ));
            }
            (None, None) => {
                let url = pick("DATABASE_URL", file.store.database_url)
                    .unwrap_or_else(default_database_url);
                if !url.starts_with("sqlite:") {
                    return Err(ForgeError::Config(
                        "DATABASE_URL must start with 'sqlite:'".to_string(),
                    ));
                }
                StoreConfig::Sqlite { url }
            }
        };

        let chord = pick("PROCTOR_OVERRIDE_CHORD", file.proctor.override_chord)
            .unwrap_or_else(|| DEFAULT_OVERRIDE_CHORD.to_string());
        let override_chord = if chord.trim().eq_ignore_ascii_case("none") {
            None
        } else {
            Some(chord.parse::<Chord>().map_err(|e| {
                ForgeError::Config(format!("PROCTOR_OVERRIDE_CHORD: {}", e))
            })?)
        };

        let idle_secs = number(
            &env,
            "PROCTOR_IDLE_TIMEOUT_SECS",
            file.proctor.idle_timeout_secs,
        )?
        .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        if idle_secs == 0 {
            return Err(ForgeError::Config(
                "PROCTOR_IDLE_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(AppConfig {
            judge,
            poll,
            store,
            proctor: ProctorConfig {
                override_chord,
                idle_timeout: Duration::from_secs(idle_secs),
            },
            bind_addr: pick("BIND_ADDR", file.server.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

/// Parse a numeric setting, preferring the environment over the file value.
fn number<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    fallback: Option<T>,
) -> Result<Option<T>> {
    match env(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ForgeError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(fallback),
    }
}

fn default_database_url() -> String {
    match dirs::data_dir() {
        Some(dir) => format!("sqlite:{}", dir.join("codeforge").join("codeforge.db").display()),
        None => "sqlite:codeforge.db".to_string(),
    }
}
