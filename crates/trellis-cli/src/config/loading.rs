//! Layered configuration loading.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};

use crate::cli::BuildArgs;
use crate::config::TrellisConfig;
use crate::error::{CliError, ConfigError, Result};

impl TrellisConfig {
    /// Load configuration with layered priority:
    /// defaults < `trellis.config.json` < `TRELLIS_*` env < CLI args.
    pub fn load(args: &BuildArgs) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(TrellisConfig::default()));

        let config_file = match &args.config {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()).into());
                }
                Some(path.clone())
            }
            None => {
                let default_path = Path::new("trellis.config.json");
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };
        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed("TRELLIS_").split("__"));

        let mut config: TrellisConfig = figment.extract().map_err(|e| {
            CliError::from(ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: "Check trellis.config.json syntax and field types".to_string(),
            })
        })?;

        // CLI arguments override everything.
        if !args.entry.is_empty() {
            config.entry_points = args.entry.clone();
        }
        if let Some(out_dir) = &args.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(cwd) = &args.cwd {
            config.cwd = Some(cwd.clone());
        }
        if args.optimize {
            config.optimize = true;
        }
        if args.output_hashing {
            config.output_hashing = true;
        }
        if args.sourcemap {
            config.sourcemap = true;
        }
        if let Some(base_href) = &args.base_href {
            config.base_href = Some(base_href.clone());
        }
        if args.stats_json {
            config.stats_json = true;
        }
        if args.clean {
            config.clean = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolved project root: explicit `cwd` or the current directory.
    pub fn project_root(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().map_err(Into::into),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.entry_points.is_empty() {
            return Err(ConfigError::MissingField {
                field: "entryPoints".to_string(),
                hint: "Provide at least one entry point in trellis.config.json or via --entry"
                    .to_string(),
            }
            .into());
        }
        if let Some(base_href) = &self.base_href {
            if !base_href.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "baseHref".to_string(),
                    value: base_href.clone(),
                    hint: "Base href must start with '/', e.g. \"/app/\"".to_string(),
                }
                .into());
            }
        }
        if let Some(i18n) = &self.i18n {
            if i18n.locales.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "i18n.locales".to_string(),
                    hint: "List at least one locale, or remove the i18n section".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
