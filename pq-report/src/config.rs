use std::{collections::BTreeMap, env, fs, path::PathBuf};

use anyhow::{anyhow, Context};
use pq_core::{
    dimensions::power::EnergyBranching,
    domain::{Channel, ChannelMap, ReportingPeriod},
    EvaluationOptions, PowerFactorGate,
};
use serde::Deserialize;
use time::{Month, UtcOffset};

pub const CONFIG_ENV: &str = "PQ_REPORT_CONFIG";
pub const TOKEN_ENV: &str = "PQ_API_TOKEN";

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Prefix every endpoint path is appended to, including the trailing slash.
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ApiConfig {
    /// The configured token, or the one in `PQ_API_TOKEN`.
    pub fn auth_token(&self) -> anyhow::Result<String> {
        match &self.auth_token {
            Some(token) if !token.trim().is_empty() => Ok(token.clone()),
            _ => env::var(TOKEN_ENV)
                .map_err(|_| anyhow!("api.auth_token is not set and {TOKEN_ENV} is empty")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Reporting month as `YYYY-MM`.
    pub month: String,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub write_json: bool,
}

impl ReportConfig {
    pub fn year_month(&self) -> anyhow::Result<(i32, Month)> {
        parse_month(&self.month)
    }
}

pub fn parse_month(s: &str) -> anyhow::Result<(i32, Month)> {
    let (year, month) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow!("invalid report month '{s}', expected YYYY-MM"))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("invalid year in report month '{s}'"))?;
    let month: u8 = month
        .parse()
        .with_context(|| format!("invalid month in report month '{s}'"))?;
    let month = Month::try_from(month).map_err(|e| anyhow!("invalid report month '{s}': {e}"))?;
    Ok((year, month))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub power_factor_gate_current: Option<bool>,
    #[serde(default)]
    pub power_factor_gate_previous: Option<bool>,
    #[serde(default)]
    pub energy_branching: EnergyBranching,
}

impl EvaluationConfig {
    pub fn options(&self) -> EvaluationOptions {
        let defaults = PowerFactorGate::default();
        EvaluationOptions {
            power_factor_gate: PowerFactorGate {
                current_period: self
                    .power_factor_gate_current
                    .unwrap_or(defaults.current_period),
                previous_period: self
                    .power_factor_gate_previous
                    .unwrap_or(defaults.previous_period),
            },
            energy_branching: self.energy_branching,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Where the Prometheus text snapshot is written at the end of a run.
    pub textfile_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    pub id: String,
    /// Fixed offset the reporting month is expressed in.
    pub utc_offset_hours: i8,
    #[serde(default)]
    pub label: Option<String>,
}

impl SiteEntry {
    pub fn period(&self, year: i32, month: Month) -> anyhow::Result<ReportingPeriod> {
        let offset = UtcOffset::from_hms(self.utc_offset_hours, 0, 0)
            .with_context(|| format!("site {}: invalid utc_offset_hours", self.id))?;
        Ok(ReportingPeriod::calendar_month(year, month, offset)?)
    }

    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: Option<ApiConfig>,
    pub report: ReportConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Channel column name to remote identifier.
    #[serde(default)]
    pub channels: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| "pq-report.toml".to_string());
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config {path}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.report.year_month()?;
        cfg.channel_map()?;
        Ok(cfg)
    }

    pub fn channel_map(&self) -> anyhow::Result<ChannelMap> {
        self.channels
            .iter()
            .try_fold(ChannelMap::default(), |map, (name, remote_id)| {
                let channel: Channel = name
                    .parse()
                    .with_context(|| format!("unknown channel '{name}' in [channels]"))?;
                Ok(map.with_override(channel, remote_id))
            })
    }
}
