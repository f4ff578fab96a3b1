//! Repository adapters for persistence layer

use std::path::PathBuf;

use waybill_infra::persistence::FileWaybillRepository;
use waybill_types::Result;

use crate::config::Config;

/// Open file-based waybill repository
pub fn open_waybill_repo(config: &Config) -> Result<FileWaybillRepository> {
    let store_dir = config.store_dir()?;
    FileWaybillRepository::open(store_dir)
}

/// Open file-based waybill repository at a custom directory
pub fn open_waybill_repo_at(store_dir: PathBuf) -> Result<FileWaybillRepository> {
    FileWaybillRepository::open(store_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_domain::model::Waybill;
    use waybill_domain::repository::WaybillRepository;

    #[test]
    fn test_open_from_config_store_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_dir: Some(dir.path().join("store")),
            ..Config::default()
        };
        let repo = open_waybill_repo(&config).unwrap();
        repo.save(&Waybill::new("WB-1", 100.0)).unwrap();

        let reopened = open_waybill_repo_at(dir.path().join("store")).unwrap();
        assert!(reopened.find_by_number("WB-1").unwrap().is_some());
    }
}
