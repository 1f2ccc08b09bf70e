use std::time::Duration;

use anyhow::{bail, Context, Result};
use qproof::{HashAlgorithm, VerifierConfig};

use crate::types::SubjectRef;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend_url: String,
    pub bind_addr: String,
    pub request_timeout: Duration,

    pub verifier: VerifierConfig,
    /// ed25519 key (hex) that signs layer roots
    pub root_public_key: Option<String>,

    pub watch: Vec<SubjectRef>,
    pub watch_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend_url = var("QPROOF_BACKEND_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let bind_addr = var("EXPLORER_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let request_timeout = Duration::from_millis(parse_or("QPROOF_REQUEST_TIMEOUT_MS", &var, 10_000)?);

        let mut verifier = VerifierConfig::default();
        if let Some(hash) = var("QPROOF_HASH") {
            verifier.hash = hash.parse::<HashAlgorithm>().map_err(anyhow::Error::msg)?;
        }
        if let Some(depths) = var("QPROOF_LAYER_DEPTHS") {
            verifier.layer_depths = parse_depths(&depths)?;
        }
        if let Some(max) = var("QPROOF_MAX_DEPTH") {
            verifier.max_depth = max.parse().context("QPROOF_MAX_DEPTH must be an integer")?;
        }
        if let Some(genesis) = var("QPROOF_GENESIS_PARENT") {
            let bytes = hex::decode(genesis.trim_start_matches("0x"))
                .context("QPROOF_GENESIS_PARENT must be hex")?;
            verifier.genesis_parent = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("QPROOF_GENESIS_PARENT must be 32 bytes"))?;
        }
        verifier.require_signatures = var("QPROOF_REQUIRE_SIGNATURES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);

        let root_public_key = var("QPROOF_ROOT_PUBKEY").filter(|k| !k.trim().is_empty());

        let watch = match var("WATCH_SUBJECTS") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<SubjectRef>().map_err(anyhow::Error::msg))
                .collect::<Result<Vec<_>>>()
                .context("WATCH_SUBJECTS")?,
            None => Vec::new(),
        };
        let watch_interval = Duration::from_secs(parse_or("WATCH_INTERVAL_SECS", &var, 3)?);

        // fail fast, fail loud
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            bail!("QPROOF_BACKEND_URL must start with http:// or https://");
        }
        if verifier.require_signatures && root_public_key.is_none() {
            bail!("QPROOF_REQUIRE_SIGNATURES needs QPROOF_ROOT_PUBKEY");
        }
        if watch_interval.is_zero() {
            bail!("WATCH_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            bind_addr,
            request_timeout,
            verifier,
            root_public_key,
            watch,
            watch_interval,
        })
    }
}

fn parse_or(key: &str, var: &impl Fn(&str) -> Option<String>, default: u64) -> Result<u64> {
    match var(key) {
        Some(v) => v.trim().parse().with_context(|| format!("{key} must be an integer")),
        None => Ok(default),
    }
}

/// "4,,2" => [Some(4), None, Some(2)]
fn parse_depths(list: &str) -> Result<Vec<Option<usize>>> {
    list.split(',')
        .map(|d| match d.trim() {
            "" | "-" => Ok(None),
            n => n
                .parse()
                .map(Some)
                .with_context(|| format!("bad QPROOF_LAYER_DEPTHS entry: {n}")),
        })
        .collect()
}
