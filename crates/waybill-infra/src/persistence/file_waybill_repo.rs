//! File-based waybill repository implementation

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use waybill_domain::model::Waybill;
use waybill_domain::repository::WaybillRepository;
use waybill_types::{Error, Result};

/// File-based implementation of WaybillRepository
///
/// Stores waybills keyed by number in a single JSON file on disk.
pub struct FileWaybillRepository {
    store_path: PathBuf,
    waybills: RefCell<HashMap<String, Waybill>>,
}

impl FileWaybillRepository {
    /// Create or load a waybill repository
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&store_dir)?;
        let store_path = store_dir.join("waybills.json");

        let waybills = if store_path.exists() {
            let file = File::open(&store_path)?;
            let reader = BufReader::new(file);
            match serde_json::from_reader(reader) {
                Ok(waybills) => waybills,
                Err(e) => {
                    warn!(path = %store_path.display(), error = %e, "waybill store unreadable, starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            store_path,
            waybills: RefCell::new(waybills),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Save store to disk
    fn persist(&self) -> Result<()> {
        let file = File::create(&self.store_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*self.waybills.borrow())?;
        debug!(path = %self.store_path.display(), "waybill store written");
        Ok(())
    }

    /// Load a waybill or fail with `WaybillNotFound`
    pub fn get(&self, waybill_number: &str) -> Result<Waybill> {
        self.waybills
            .borrow()
            .get(waybill_number)
            .cloned()
            .ok_or_else(|| Error::WaybillNotFound(waybill_number.to_string()))
    }
}

impl WaybillRepository for FileWaybillRepository {
    fn save(&self, waybill: &Waybill) -> std::result::Result<(), Error> {
        self.waybills
            .borrow_mut()
            .insert(waybill.waybill_number.clone(), waybill.clone());
        self.persist()
    }

    fn find_by_number(&self, waybill_number: &str) -> std::result::Result<Option<Waybill>, Error> {
        Ok(self.waybills.borrow().get(waybill_number).cloned())
    }

    /// All waybills, most recently updated first
    fn find_all(&self) -> std::result::Result<Vec<Waybill>, Error> {
        let mut waybills: Vec<_> = self.waybills.borrow().values().cloned().collect();
        waybills.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(waybills)
    }

    fn delete(&self, waybill_number: &str) -> std::result::Result<bool, Error> {
        let removed = self.waybills.borrow_mut().remove(waybill_number).is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }
}
