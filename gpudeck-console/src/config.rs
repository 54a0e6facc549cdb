use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEMO_ROUTE_PREFIX: &str = "/demo-app";

/// Refresh cadence of the polled pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub machines: Duration,
    pub jobs: Duration,
    pub balance: Duration,
    pub prices: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            machines: Duration::from_secs(5),
            jobs: Duration::from_secs(10),
            balance: Duration::from_secs(30),
            prices: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub demo_mode: bool,
    pub route: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll: PollIntervals,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            demo_mode: false,
            route: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
            poll: PollIntervals::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load `.env` then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(v) => {
                    let n: u64 = v
                        .parse()
                        .with_context(|| format!("{} must be a number of seconds, got '{}'", key, v))?;
                    Ok(Duration::from_secs(n.max(1)))
                }
                None => Ok(Duration::from_secs(default)),
            }
        };

        let token = match get("GPUDECK_API_TOKEN") {
            Some(t) => Some(t),
            None => {
                let path = get("GPUDECK_TOKEN_FILE")
                    .map(PathBuf::from)
                    .or_else(|| get("HOME").map(|h| Path::new(&h).join(".gpudeck").join("token")));
                match path {
                    Some(p) => read_token_file(&p)?,
                    None => None,
                }
            }
        };

        let defaults = PollIntervals::default();
        Ok(Self {
            api_url: get("GPUDECK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token,
            demo_mode: get("GPUDECK_DEMO_MODE").map(|v| is_truthy(&v)).unwrap_or(false),
            route: get("GPUDECK_ROUTE"),
            connect_timeout: secs("GPUDECK_CONNECT_TIMEOUT_SECS", 5)?,
            request_timeout: secs("GPUDECK_HTTP_TIMEOUT_SECS", 20)?,
            poll: PollIntervals {
                machines: secs("GPUDECK_POLL_MACHINES_SECS", defaults.machines.as_secs())?,
                jobs: secs("GPUDECK_POLL_JOBS_SECS", defaults.jobs.as_secs())?,
                balance: secs("GPUDECK_POLL_BALANCE_SECS", defaults.balance.as_secs())?,
                prices: secs("GPUDECK_POLL_PRICES_SECS", defaults.prices.as_secs())?,
            },
        })
    }

    /// Demo when asked for explicitly or when opened on the demo route.
    pub fn is_demo(&self) -> bool {
        self.demo_mode
            || self
                .route
                .as_deref()
                .map(is_demo_route)
                .unwrap_or(false)
    }
}

pub fn is_demo_route(route: &str) -> bool {
    let route = route.trim();
    route == DEMO_ROUTE_PREFIX
        || route
            .strip_prefix(DEMO_ROUTE_PREFIX)
            .map(|rest| rest.starts_with('/') || rest.starts_with('?'))
            .unwrap_or(false)
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// First non-empty line of the token file; a missing file means no token.
fn read_token_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading token file {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ConsoleConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.poll, PollIntervals::default());
        assert_eq!(cfg.request_timeout, Duration::from_secs(20));
        assert!(!cfg.is_demo());
        assert!(cfg.token.is_none());
    }

    #[test]
    fn demo_route_prefix_switches_demo_on() {
        assert!(is_demo_route("/demo-app"));
        assert!(is_demo_route("/demo-app/machines"));
        assert!(!is_demo_route("/demo-apps"));
        assert!(!is_demo_route("/machines"));

        let cfg =
            ConsoleConfig::from_lookup(lookup(&[("GPUDECK_ROUTE", "/demo-app/jobs")])).unwrap();
        assert!(cfg.is_demo());
        let cfg = ConsoleConfig::from_lookup(lookup(&[("GPUDECK_DEMO_MODE", "yes")])).unwrap();
        assert!(cfg.is_demo());
    }

    #[test]
    fn bad_interval_is_reported() {
        let err = ConsoleConfig::from_lookup(lookup(&[("GPUDECK_POLL_JOBS_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("GPUDECK_POLL_JOBS_SECS"));
    }

    #[test]
    fn token_file_first_line_is_used() {
        let dir = std::env::temp_dir().join(format!("gpudeck-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("token");
        std::fs::write(&file, "\n  abc123  \nignored\n").unwrap();
        let cfg = ConsoleConfig::from_lookup(lookup(&[(
            "GPUDECK_TOKEN_FILE",
            file.to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(cfg.token.as_deref(), Some("abc123"));

        let cfg = ConsoleConfig::from_lookup(lookup(&[
            ("GPUDECK_TOKEN_FILE", file.to_str().unwrap()),
            ("GPUDECK_API_TOKEN", "env-wins"),
        ]))
        .unwrap();
        assert_eq!(cfg.token.as_deref(), Some("env-wins"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_token_file_is_not_an_error() {
        let cfg = ConsoleConfig::from_lookup(lookup(&[(
            "GPUDECK_TOKEN_FILE",
            "/definitely/not/here/token",
        )]))
        .unwrap();
        assert!(cfg.token.is_none());
    }
}
