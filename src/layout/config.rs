//! Configuration for the layout engine

use serde::Deserialize;

use super::global::Spacing;
use super::solver::SolverSettings;

/// Configuration options for layout computation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Horizontal gap between phases; also the preferred link length
    pub spread: f64,

    /// Vertical gap between nodes stacked in one phase
    pub stack_spread: f64,

    /// Default height of a terminal, and the vertical step between terminals
    pub terminal_height: f64,

    /// Canvas width
    pub width: f64,

    /// Canvas height
    pub height: f64,

    /// Prefer keeping nodes inside the canvas
    pub keep_in_canvas: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spread: 75.0,
            stack_spread: 15.0,
            terminal_height: 20.0,
            width: 800.0,
            height: 600.0,
            keep_in_canvas: true,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the phase gap and link length
    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    /// Set the vertical gap between stacked nodes
    pub fn with_stack_spread(mut self, spread: f64) -> Self {
        self.stack_spread = spread;
        self
    }

    /// Set the default terminal height
    pub fn with_terminal_height(mut self, height: f64) -> Self {
        self.terminal_height = height;
        self
    }

    /// Set the canvas size
    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_keep_in_canvas(mut self, keep: bool) -> Self {
        self.keep_in_canvas = keep;
        self
    }

    pub fn spacing(&self) -> Spacing {
        Spacing {
            gap: self.spread,
            spread: self.stack_spread,
        }
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            link_length: self.spread,
            keep_in_canvas: self.keep_in_canvas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LayoutConfig::default();
        assert_eq!(config.spread, 75.0);
        assert_eq!(config.stack_spread, 15.0);
        assert_eq!(config.terminal_height, 20.0);
        assert_eq!((config.width, config.height), (800.0, 600.0));
        assert!(config.keep_in_canvas);
        assert_eq!(config.spacing(), Spacing::default());
        assert_eq!(config.solver_settings(), SolverSettings::default());
    }

    #[test]
    fn test_builder_pattern() {
        let config = LayoutConfig::new()
            .with_spread(40.0)
            .with_canvas(300.0, 200.0)
            .with_keep_in_canvas(false);

        assert_eq!(config.spacing().gap, 40.0);
        assert_eq!(config.solver_settings().link_length, 40.0);
        assert_eq!((config.width, config.height), (300.0, 200.0));
        assert!(!config.solver_settings().keep_in_canvas);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LayoutConfig = toml::from_str("spread = 50\nwidth = 1024").unwrap();
        assert_eq!(config.spread, 50.0);
        assert_eq!(config.width, 1024.0);
        assert_eq!(config.stack_spread, 15.0);
    }

    #[test]
    fn test_deserialize_rejects_unknown_keys() {
        assert!(toml::from_str::<LayoutConfig>("gap = 3").is_err());
    }
}
