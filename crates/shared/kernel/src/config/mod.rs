use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides (`EVO__STORAGE__DATA_DIR`).
pub const ENV_PREFIX: &str = "EVO";

#[evo_derive::evo_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from an optional config file layered under environment overrides.
///
/// 1. **File**: when `path` is given the file must exist; its format follows the
///    extension (`evod.toml`). Without a path only defaults and the environment apply.
/// 2. **Environment**: variables prefixed with `EVO__`; nested keys use double
///    underscores, so `EVO__LOGGING__LEVEL=debug` sets `logging.level`.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or malformed, or the merged
/// values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use evo_kernel::config::load_config;
/// use evo_kernel::domain::config::EngineConfig;
///
/// let cfg: EngineConfig = load_config(None::<&str>).unwrap();
/// assert!(cfg.thresholds.is_empty());
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path.as_ref().map(AsRef::<Path>::as_ref), environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .convert_case(config::Case::Snake)
}

fn load_layered<T>(path: Option<&Path>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path {
        info!(path = %path.display(), "Loading config file");
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_domain::config::EngineConfig;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[logging]\nlevel = \"debug\"\n").unwrap();

        let cfg: EngineConfig =
            load_layered(Some(file.path()), env(&[("EVO__LOGGING__LEVEL", "warn")])).unwrap();
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn test_nested_environment_keys() {
        let cfg: EngineConfig = load_layered(
            None,
            env(&[("EVO__STORAGE__DATA_DIR", "/srv/evo"), ("EVO__LOGGING__JSON", "true")]),
        )
        .unwrap();
        assert_eq!(cfg.storage.data_dir, std::path::PathBuf::from("/srv/evo"));
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_unprefixed_variables_are_ignored() {
        let cfg: EngineConfig =
            load_layered(None, env(&[("LOGGING__LEVEL", "trace")])).unwrap();
        assert_eq!(cfg.logging.level, "info");
    }
}
