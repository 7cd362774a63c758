use crate::{
    service::MAX_RESULTS_LIMIT,
    storage::{self, StorageManager},
};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_BACKEND_ADDR: &str = "http://localhost:8000";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
/// Backend default page size
const DEFAULT_MAX_RESULTS: usize = 8;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base url of the furniture search backend
    #[serde(default = "default_backend_addr")]
    pub backend_addr: String,

    /// Number of results requested per search [1, 50]
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Address the daemon listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Send stored preferences as search filters
    #[serde(default = "default_personalize_search")]
    pub personalize_search: bool,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_addr: default_backend_addr(),
            max_results: default_max_results(),
            listen_addr: default_listen_addr(),
            personalize_search: default_personalize_search(),
            base_path: String::new(),
        }
    }
}

fn default_backend_addr() -> String {
    DEFAULT_BACKEND_ADDR.to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_personalize_search() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.backend_addr)
            .with_context(|| format!("backend_addr {:?} is not a valid url", self.backend_addr))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("backend_addr must use http or https, got {}", url.scheme());
        }

        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results) {
            bail!(
                "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {}",
                self.max_results
            );
        }

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            bail!("listen_addr {:?} is not a socket address", self.listen_addr);
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to create {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(
                CONFIG_FILE,
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }
}
