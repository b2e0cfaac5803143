//! Scenario configuration.

use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use smart_sync_core::SyncConfig;

/// Scenario knobs. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of simulated clients. Player ids are `1..=clients`.
    pub clients: u32,
    pub ticks: u32,
    /// Fixed step in seconds, shared by physics and the controllers.
    pub fixed_dt: f32,
    /// Chance in `[0, 1)` that a state packet is lost.
    pub drop_rate: f64,
    /// One-way delay in ticks.
    pub latency_ticks: u32,
    pub seed: u64,
    /// Tick at which the second client asks for ownership. `None` disables the
    /// hand-off.
    pub handoff_tick: Option<u32>,
    /// Whether the hand-off keeps the object's motion.
    pub handoff_non_destructive: bool,
    pub drop_height: f32,
    pub ball_radius: f32,
    pub sync: SyncConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clients: 3,
            ticks: 600,
            fixed_dt: 1.0 / 60.0,
            drop_rate: 0.1,
            latency_ticks: 3,
            seed: 7,
            handoff_tick: Some(30),
            handoff_non_destructive: true,
            drop_height: 4.0,
            ball_radius: 0.25,
            sync: SyncConfig::default(),
        }
    }
}

impl SimConfig {
    /// Reads a JSON scenario from disk and validates it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.clients < 2 {
            bail!("clients must be at least 2, got {}", self.clients);
        }
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            bail!("fixed_dt must be positive, got {}", self.fixed_dt);
        }
        if !(0.0..1.0).contains(&self.drop_rate) {
            bail!("drop_rate must be in [0, 1), got {}", self.drop_rate);
        }
        if self.ball_radius <= 0.0 {
            bail!("ball_radius must be positive, got {}", self.ball_radius);
        }
        self.sync.validate().context("invalid sync section")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.clients, 3);
        assert_eq!(config.handoff_tick, Some(30));
        config.validate().unwrap();
    }

    #[test]
    fn test_nested_sync_section() {
        let config: SimConfig =
            serde_json::from_str(r#"{"sync": {"push_policy": {"mode": "on_demand"}}}"#).unwrap();
        assert_eq!(config.sync.push_policy, smart_sync_core::PushPolicy::OnDemand);
    }

    #[test]
    fn test_rejects_single_client() {
        let config = SimConfig {
            clients: 1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_certain_loss() {
        let config = SimConfig {
            drop_rate: 1.0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
