use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";
pub const ENV_PREFIX: &str = "FXALGO_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging defaults, TOML, and environment variables.
    ///
    /// Environment keys use `__` between section and field, e.g. `FXALGO_TRADING__SYMBOL`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        tracing::debug!(path, "Loading configuration");
        let config: AppConfig = Self::base(path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads application configuration with a specific profile layered over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let profile_path = std::path::Path::new(path)
            .with_file_name(format!("Config.{profile}.toml"));
        tracing::debug!(
            path,
            profile,
            profile_path = %profile_path.display(),
            "Loading configuration"
        );

        let config: AppConfig = Self::base(path)
            .merge(Toml::file(profile_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    fn base(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeframe::Timeframe;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ConfigLoader::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.trading.symbol, "EURUSD");
        assert_eq!(config.trading.timeframe, Timeframe::M5);
        assert!((config.trading.risk_fraction - 0.005).abs() < f64::EPSILON);
        assert!(config.trading.paper);
        assert_eq!(config.training.n_estimators, 300);
        assert_eq!(config.training.num_leaves, 64);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[trading]
symbol = "GBPUSD"
timeframe = "H1"
sl_pips = 15.0

[training]
max_depth = 6
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.trading.symbol, "GBPUSD");
        assert_eq!(config.trading.timeframe, Timeframe::H1);
        assert!((config.trading.sl_pips - 15.0).abs() < f64::EPSILON);
        // untouched fields keep defaults
        assert!((config.trading.tp_pips - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.training.max_depth, Some(6));
    }

    #[test]
    fn test_profile_layers_over_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("Config.toml");
        std::fs::write(&base, "[trading]\nsymbol = \"USDJPY\"\npaper = true\n").unwrap();
        std::fs::write(
            dir.path().join("Config.live.toml"),
            "[trading]\npaper = false\n",
        )
        .unwrap();

        let config = ConfigLoader::load_with_profile(base.to_str().unwrap(), "live").unwrap();
        assert_eq!(config.trading.symbol, "USDJPY");
        assert!(!config.trading.paper);
    }

    #[test]
    fn test_invalid_timeframe_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        std::fs::write(&path, "[trading]\ntimeframe = \"5m\"\n").unwrap();

        assert!(ConfigLoader::load_from(path.to_str().unwrap()).is_err());
    }
}
