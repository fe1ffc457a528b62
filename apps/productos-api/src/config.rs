use core_config::{
    AppInfo, FromEnv, app_info, env_or_default, env_parse_or_default, server::ServerConfig,
};
use database::mongodb::MongoConfig;
use domain_productos::UploadConfig;

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub uploads: UploadConfig,
    /// Drop and repopulate both collections at startup
    pub seed_data: bool,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?;
        let server = ServerConfig::from_env()?;

        let defaults = UploadConfig::default();
        let uploads = UploadConfig {
            path: env_or_default("UPLOADS_PATH", &defaults.path.to_string_lossy()).into(),
            max_bytes: env_parse_or_default("MAX_UPLOAD_BYTES", defaults.max_bytes)?,
        };

        Ok(Self {
            app: app_info!(),
            mongodb,
            server,
            environment,
            uploads,
            seed_data: env_parse_or_default("SEED_DATA", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("productos")),
                ("UPLOADS_PATH", None),
                ("MAX_UPLOAD_BYTES", None),
                ("SEED_DATA", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.uploads.path, PathBuf::from("./uploads"));
                assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
                assert!(!config.seed_data);
                assert_eq!(config.app.name, "productos_api");
            },
        );
    }

    #[test]
    fn test_config_overrides() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://db:27017")),
                ("MONGODB_DATABASE", Some("catalogo")),
                ("UPLOADS_PATH", Some("/var/lib/productos/uploads")),
                ("MAX_UPLOAD_BYTES", Some("2048")),
                ("SEED_DATA", Some("true")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.mongodb.database(), "catalogo");
                assert_eq!(
                    config.uploads.path,
                    PathBuf::from("/var/lib/productos/uploads")
                );
                assert_eq!(config.uploads.max_bytes, 2048);
                assert!(config.seed_data);
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_seed_flag() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("productos")),
                ("SEED_DATA", Some("yes please")),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("SEED_DATA"));
            },
        );
    }
}
