//! On-disk persistence of the planning.
//!
//! Two JSON documents in the data directory, one for products and one for
//! retailers. A missing document means nothing has been saved yet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{ProductRecord, Retailer};

pub const PRODUCTS_FILE: &str = "productPlanning.json";
pub const RETAILERS_FILE: &str = "retailers.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid planning data: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Whatever was found on disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedPlanning {
    pub products: Option<Vec<ProductRecord>>,
    pub retailers: Option<Vec<Retailer>>,
}

#[derive(Debug, Clone)]
pub struct PlanningStore {
    dir: PathBuf,
}

impl PlanningStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, products: &[ProductRecord], retailers: &[Retailer]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        self.write_json(PRODUCTS_FILE, &products)?;
        self.write_json(RETAILERS_FILE, &retailers)?;
        info!(products = products.len(), retailers = retailers.len(), dir = %self.dir.display(), "planning saved");
        Ok(())
    }

    pub fn load(&self) -> Result<SavedPlanning, StoreError> {
        let saved = SavedPlanning {
            products: self.read_json(PRODUCTS_FILE)?,
            retailers: self.read_json(RETAILERS_FILE)?,
        };
        debug!(
            products = saved.products.as_ref().map(Vec::len),
            retailers = saved.retailers.as_ref().map(Vec::len),
            "planning loaded"
        );
        Ok(saved)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;
        // Write then rename, so a crash never leaves half a document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Io { path, source })
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed { path, source })
    }
}
