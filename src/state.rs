use crate::config::settings::AppConfig;
use crate::infrastructure::openai::OpenAiService;
use crate::infrastructure::storage::local::StorageService;
use crate::modules::comic::store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jobs: JobStore,
    pub openai: OpenAiService,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        openai: OpenAiService,
        storage: StorageService,
    ) -> Self {
        Self {
            config,
            jobs: JobStore::new(),
            openai,
            storage,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State wired to a mock model API at `base_url`, storing under `storage_dir`.
    pub fn for_tests(base_url: &str, storage_dir: &std::path::Path) -> Self {
        let config = AppConfig::for_tests(base_url, storage_dir.to_path_buf());
        let openai = OpenAiService::new(config.openai.clone()).unwrap();
        let storage = StorageService::new(config.storage_dir.clone(), None);
        Self::new(config, openai, storage)
    }
}
