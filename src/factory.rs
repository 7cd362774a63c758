use crate::{
    backend::BackendRemote, config::Config, engine::PersonalizationEngine, service::ShopService,
    storage,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;

/// Builds the engine and service from the on-disk layout.
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let state_path = format!("{base_path}/state");

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path,
            state_path,
        })
    }

    /// Load config; `FURNISH_BACKEND_ADDR` wins over the file
    pub fn create_config(paths: &AppPaths) -> Result<Config> {
        let mut config = Config::load_with(&paths.base_path)?;

        if let Ok(addr) = std::env::var("FURNISH_BACKEND_ADDR") {
            let addr = addr.trim();
            if !addr.is_empty() {
                log::info!("using backend from environment: {addr}");
                config.backend_addr = addr.to_string();
                config.validate()?;
            }
        }

        Ok(config)
    }

    pub fn create_engine(paths: &AppPaths) -> Result<PersonalizationEngine> {
        let store = storage::BackendLocal::new(&paths.state_path)
            .with_context(|| format!("Failed to open state directory {}", paths.state_path))?;
        Ok(PersonalizationEngine::load(Arc::new(store)))
    }

    pub fn create_service(paths: &AppPaths, config: &Config) -> Result<ShopService> {
        let engine = Self::create_engine(paths)?;
        let backend = BackendRemote::new(&config.backend_addr);
        Ok(ShopService::new(Box::new(backend), engine))
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("FURNISH_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/furnish", home.to_string_lossy()))
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
    pub state_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Product, ProductId};

    #[test]
    fn engine_state_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let base_path = tmp.path().to_str().unwrap().to_string();
        let paths = AppPaths {
            state_path: format!("{base_path}/state"),
            base_path,
        };

        let mut engine = AppFactory::create_engine(&paths).unwrap();
        engine
            .wishlist_mut()
            .add(&Product {
                id: ProductId::from("sofa-1"),
                title: "Sofa".into(),
                ..Default::default()
            })
            .unwrap();
        drop(engine);

        let engine = AppFactory::create_engine(&paths).unwrap();
        assert!(engine.wishlist().contains(&ProductId::from("sofa-1")));
        assert!(tmp.path().join("state/furniture_wishlist").exists());
    }

    #[test]
    fn service_uses_configured_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let base_path = tmp.path().to_str().unwrap().to_string();
        let paths = AppPaths {
            state_path: format!("{base_path}/state"),
            base_path,
        };

        let config = Config::load_with(&paths.base_path).unwrap();
        let service = AppFactory::create_service(&paths, &config).unwrap();
        assert_eq!(service.engine().wishlist().len(), 0);
    }
}
