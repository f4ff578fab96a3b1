//! Waybill document loader (TOML or JSON)
//!
//! A document describes a truck and its drops as entered by an operator;
//! derived values are not read from it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use waybill_domain::model::Shipper;
use waybill_domain::service::AmountMode;
use waybill_types::{ConfigError, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaybillDocument {
    pub waybill_number: String,
    pub truck_cbm: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub amount_mode: Option<AmountMode>,
    #[serde(default)]
    pub shipper: Option<Shipper>,
    #[serde(default)]
    pub drops: Vec<DocumentDrop>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDrop {
    pub consignee: String,
    pub cbm: f64,
}

/// Load a waybill document, choosing the parser from the file extension
pub fn load_waybill_document(path: &Path) -> Result<WaybillDocument> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(ConfigError::ParseError(format!(
            "Failed to read waybill document {}: {}",
            path.display(),
            e
        )))
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "toml" => load_from_toml(&content),
        "json" => load_from_json(&content),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

pub fn load_from_toml(content: &str) -> Result<WaybillDocument> {
    Ok(toml::from_str(content)?)
}

pub fn load_from_json(content: &str) -> Result<WaybillDocument> {
    Ok(serde_json::from_str(content)?)
}
