#![forbid(unsafe_code)]

//! Tunables for the slot swapper and the stack-driven swapper.
//!
//! Defaults match what hosts expect from CSS-driven transitions: a 250 ms
//! animation, a 50 ms grace period before the fallback timer removes an
//! outgoing view, and a 16 ms (one frame) debounce on stack emissions.
//!
//! With the `config` feature, [`BinderyConfig`] can be loaded from TOML or
//! JSON. Missing keys fall back to their defaults.

use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::error::{BinderyError, Result};

/// Slot swapper timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SwapConfig {
    /// Length of enter/exit animations, in milliseconds.
    pub animation_ms: u64,
    /// Extra wait after `animation_ms` before the fallback timer fires.
    pub fallback_grace_ms: u64,
    /// Size incoming views to fill the container (`width`/`height` = 100%).
    pub fill_container: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            animation_ms: 250,
            fallback_grace_ms: 50,
            fill_container: true,
        }
    }
}

impl SwapConfig {
    #[must_use]
    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    /// Delay after which an outgoing view is removed even without `animationend`.
    #[must_use]
    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.animation_ms.saturating_add(self.fallback_grace_ms))
    }

    /// CSS `animation` value for a named animation.
    #[must_use]
    pub fn animation_style(&self, name: &str) -> String {
        format!("{name} {}s", self.animation_ms as f64 / 1000.0)
    }
}

/// Stack-driven swapper timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct StackConfig {
    /// Quiet period before a stack emission is applied.
    pub debounce_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self { debounce_ms: 16 }
    }
}

impl StackConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct BinderyConfig {
    pub swap: SwapConfig,
    pub stack: StackConfig,
}

#[cfg(feature = "config")]
impl BinderyConfig {
    /// Parse a TOML document.
    ///
    /// ```toml
    /// [swap]
    /// animation_ms = 300
    ///
    /// [stack]
    /// debounce_ms = 0
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| BinderyError::config(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| BinderyError::config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BinderyError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BinderyConfig::default();
        assert_eq!(config.swap.animation(), Duration::from_millis(250));
        assert_eq!(config.swap.fallback(), Duration::from_millis(300));
        assert_eq!(config.stack.debounce(), Duration::from_millis(16));
        assert!(config.swap.fill_container);
    }

    #[test]
    fn animation_style_uses_seconds() {
        let swap = SwapConfig::default();
        assert_eq!(swap.animation_style("push-in"), "push-in 0.25s");
        let slow = SwapConfig {
            animation_ms: 1000,
            ..SwapConfig::default()
        };
        assert_eq!(slow.animation_style("fade-out"), "fade-out 1s");
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_fills_missing_keys() {
        let config = BinderyConfig::from_toml_str("[swap]\nanimation_ms = 400\n").unwrap();
        assert_eq!(config.swap.animation_ms, 400);
        assert_eq!(config.swap.fallback_grace_ms, 50);
        assert_eq!(config.stack, StackConfig::default());

        let text = config.to_toml_string().unwrap();
        assert_eq!(BinderyConfig::from_toml_str(&text).unwrap(), config);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_errors_are_config_errors() {
        let config = BinderyConfig::from_json_str(r#"{"stack":{"debounce_ms":0}}"#).unwrap();
        assert_eq!(config.stack.debounce(), Duration::ZERO);

        let err = BinderyConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, BinderyError::Config { .. }));
    }
}
