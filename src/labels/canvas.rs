use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::ServiceError;

pub const CANVAS_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementType {
    Text,
    Barcode,
    Qr,
    Image,
}

/// A positioned drawable on a label. Coordinates are canvas pixels; list
/// order is z-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

// Designer-generated ids are millisecond timestamps.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "element id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDesign {
    pub version: u32,
    pub elements: Vec<Element>,
}

impl Default for CanvasDesign {
    fn default() -> Self {
        Self {
            version: CANVAS_VERSION,
            elements: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

impl CanvasDesign {
    /// Parses and validates a design submitted by a client. A bare element
    /// array is the legacy shape and is lifted to the current version.
    pub fn parse(value: &Value) -> Result<Self, ServiceError> {
        let design = Self::decode(value).map_err(|m| ServiceError::validation("canvas_design", m))?;
        design.validate()?;
        Ok(design)
    }

    /// Decodes a design read back from the store. Corrupt documents are
    /// reported, never replaced with an empty canvas.
    pub fn from_stored(value: &Value) -> Result<Self, ServiceError> {
        let design = Self::decode(value).map_err(|m| {
            ServiceError::SerializationError(format!("stored canvas design is unreadable: {}", m))
        })?;
        design.validate().map_err(|e| {
            ServiceError::SerializationError(format!("stored canvas design is invalid: {}", e))
        })?;
        Ok(design)
    }

    fn decode(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(_) => {
                let elements: Vec<Element> =
                    serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
                Ok(Self {
                    version: CANVAS_VERSION,
                    elements,
                })
            }
            Value::Object(_) => {
                let probe: VersionProbe =
                    serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
                match probe.version {
                    Some(CANVAS_VERSION) => {
                        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
                    }
                    Some(other) => Err(format!("unsupported canvas version {}", other)),
                    None => Err("canvas design is missing its version".to_string()),
                }
            }
            // Older rows stored the array as a JSON string.
            Value::String(raw) => {
                let inner: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
                if inner.is_string() {
                    return Err("canvas design is doubly encoded".to_string());
                }
                Self::decode(&inner)
            }
            Value::Null => Ok(Self::default()),
            other => Err(format!("canvas design must be an object or array, got {}", other)),
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.version != CANVAS_VERSION {
            return Err(ServiceError::validation(
                "canvas_design",
                format!("unsupported canvas version {}", self.version),
            ));
        }

        let mut seen = HashSet::new();
        for element in &self.elements {
            if element.id.trim().is_empty() {
                return Err(ServiceError::validation(
                    "canvas_design",
                    "element id must not be empty",
                ));
            }
            if !seen.insert(element.id.as_str()) {
                return Err(ServiceError::validation(
                    "canvas_design",
                    format!("duplicate element id {}", element.id),
                ));
            }
            for (name, v) in [
                ("x", element.x),
                ("y", element.y),
                ("width", element.width),
                ("height", element.height),
            ] {
                if !v.is_finite() || v < 0.0 {
                    return Err(ServiceError::validation(
                        "canvas_design",
                        format!("element {} has invalid {} {}", element.id, name, v),
                    ));
                }
            }
            if let Some(size) = element.font_size {
                if !size.is_finite() || size <= 0.0 {
                    return Err(ServiceError::validation(
                        "canvas_design",
                        format!("element {} has invalid font size {}", element.id, size),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_value(&self) -> Result<Value, ServiceError> {
        Ok(serde_json::to_value(self)?)
    }
}
