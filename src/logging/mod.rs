use std::{
    fs::{create_dir_all, OpenOptions},
    path::PathBuf,
    str::FromStr,
};

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

use crate::{
    config::Config,
    config_error,
    core::{CoreResult, ErrorContext},
};

/// Logger settings taken from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub log_errors: bool,
    pub path: Option<PathBuf>,
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.clone(),
            log_errors: config.log_errors,
            path: config.log_path.clone(),
        }
    }
}

impl LogConfig {
    fn level_filter(&self) -> CoreResult<LevelFilter> {
        LevelFilter::from_str(&self.level)
            .map_err(|_| config_error!("invalid log level '{}'", self.level))
    }
}

/// Install the global logger. `RUST_LOG` overrides the configured level.
///
/// Output goes to stderr unless `log_errors` is set together with a log path,
/// in which case it is appended to that file. Stdout is never used since it
/// carries the response.
pub fn init_logger(config: &LogConfig) -> CoreResult<()> {
    let mut builder = Builder::new();
    builder
        .filter_level(config.level_filter()?)
        .parse_env(Env::default());

    match (&config.path, config.log_errors) {
        (Some(path), true) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        _ => {
            builder.target(Target::Stderr);
        }
    }

    builder.try_init().with_context("Unable to install logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let mut config = LogConfig {
            level: "debug".to_string(),
            log_errors: false,
            path: None,
        };
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);

        config.level = "loud".to_string();
        assert!(config.level_filter().is_err());
    }
}
