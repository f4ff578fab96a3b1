//! Typed field edits on a drop

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use waybill_types::ValidationError;

/// Editable drop fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropField {
    ConsigneeName,
    Cbm,
    Rate,
    Percentage,
}

impl FromStr for DropField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "consigneename" | "consignee" | "name" => Ok(DropField::ConsigneeName),
            "cbm" => Ok(DropField::Cbm),
            "rate" => Ok(DropField::Rate),
            "percentage" | "percent" => Ok(DropField::Percentage),
            _ => Err(ValidationError::UnknownField(s.to_string())),
        }
    }
}

impl std::fmt::Display for DropField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropField::ConsigneeName => write!(f, "consigneeName"),
            DropField::Cbm => write!(f, "cbm"),
            DropField::Rate => write!(f, "rate"),
            DropField::Percentage => write!(f, "percentage"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self, field: DropField) -> Result<f64, ValidationError> {
        match self {
            FieldValue::Number(n) => Ok(*n),
            FieldValue::Text(t) => t.trim().parse().map_err(|_| ValidationError::InvalidValue {
                field: field.to_string(),
                value: t.clone(),
            }),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(t) => t.clone(),
        }
    }
}

/// One edit coming from a form input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: DropField,
    pub value: FieldValue,
}

impl FieldChange {
    pub fn number(field: DropField, value: f64) -> Self {
        Self {
            field,
            value: FieldValue::Number(value),
        }
    }

    pub fn text(field: DropField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: FieldValue::Text(value.into()),
        }
    }

    /// Parse `field=value`, e.g. `cbm=12.5` or `consignee=ABC - Store`
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let (field, value) = input
            .split_once('=')
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "change".to_string(),
                value: input.to_string(),
            })?;
        let field: DropField = field.parse()?;
        let value = value.trim();
        let value = match field {
            DropField::ConsigneeName => FieldValue::Text(value.to_string()),
            _ => FieldValue::Number(FieldValue::Text(value.to_string()).as_number(field)?),
        };
        Ok(Self { field, value })
    }
}
