use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::canvas::{CanvasDesign, ElementType};

/// Screen pixels per millimetre (96 DPI).
pub const PX_PER_MM: f64 = 3.78;

pub const BARCODE_FALLBACK: &str = "123456";
pub const QR_FALLBACK: &str = "http://example.com";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Substituted text, or the encoded payload for barcode/QR elements
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub font_size: f64,
    pub font_weight: String,
    pub font_style: String,
    pub text_decoration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedLabel {
    pub width_px: f64,
    pub height_px: f64,
    pub elements: Vec<RenderedElement>,
}

/// Replaces each `{key}` with `data[key]`; unknown keys stay literal.
pub fn substitute(format: &str, data: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(format, |caps: &Captures| match data.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

pub fn render(
    width_mm: f64,
    height_mm: f64,
    design: &CanvasDesign,
    data: &HashMap<String, String>,
) -> RenderedLabel {
    let elements = design
        .elements
        .iter()
        .map(|el| {
            let mut content = el
                .format_string
                .as_deref()
                .map(|f| substitute(f, data))
                .unwrap_or_default();
            if content.is_empty() {
                match el.element_type {
                    ElementType::Barcode => content = BARCODE_FALLBACK.to_string(),
                    ElementType::Qr => content = QR_FALLBACK.to_string(),
                    _ => {}
                }
            }
            RenderedElement {
                id: el.id.clone(),
                element_type: el.element_type,
                x: el.x,
                y: el.y,
                width: el.width,
                height: el.height,
                content,
                src: match el.element_type {
                    ElementType::Image => el.src.clone(),
                    _ => None,
                },
                font_size: el.font_size.unwrap_or(14.0),
                font_weight: el.font_weight.clone().unwrap_or_else(|| "normal".into()),
                font_style: el.font_style.clone().unwrap_or_else(|| "normal".into()),
                text_decoration: el.text_decoration.clone().unwrap_or_else(|| "none".into()),
            }
        })
        .collect();

    RenderedLabel {
        width_px: width_mm * PX_PER_MM,
        height_px: height_mm * PX_PER_MM,
        elements,
    }
}

/// Distinct placeholder keys across all elements, in first-appearance order.
pub fn placeholders(design: &CanvasDesign) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for format in design.elements.iter().filter_map(|e| e.format_string.as_deref()) {
        for caps in PLACEHOLDER.captures_iter(format) {
            let key = &caps[1];
            if seen.insert(key.to_string()) {
                keys.push(key.to_string());
            }
        }
    }
    keys
}

/// Flattens a JSON object into substitution data. Strings are used as-is,
/// other scalars by their JSON text; nulls, arrays and objects are skipped.
pub fn data_from_json(value: &Value) -> HashMap<String, String> {
    let mut data = HashMap::new();
    if let Value::Object(map) = value {
        for (k, v) in map {
            match v {
                Value::String(s) => {
                    data.insert(k.clone(), s.clone());
                }
                Value::Number(_) | Value::Bool(_) => {
                    data.insert(k.clone(), v.to_string());
                }
                _ => {}
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::canvas::Element;
    use proptest::prelude::*;
    use serde_json::json;

    fn element(id: &str, kind: ElementType, format: Option<&str>) -> Element {
        Element {
            id: id.to_string(),
            element_type: kind,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            format_string: format.map(str::to_string),
            font_size: None,
            font_weight: None,
            font_style: None,
            text_decoration: None,
            src: None,
        }
    }

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn material_and_batch_are_substituted() {
        let out = substitute(
            "{materialCode}-{batchNumber}",
            &data(&[("materialCode", "MAT-1"), ("batchNumber", "B7")]),
        );
        assert_eq!(out, "MAT-1-B7");
    }

    #[test]
    fn missing_keys_stay_literal() {
        let out = substitute("Lot {batchNumber} exp {expiry}", &data(&[("batchNumber", "B7")]));
        assert_eq!(out, "Lot B7 exp {expiry}");
    }

    #[test]
    fn empty_braces_and_values_are_not_rescanned() {
        assert_eq!(substitute("{}", &data(&[])), "{}");
        // substituted text is never scanned again
        assert_eq!(substitute("{a}", &data(&[("a", "{b}"), ("b", "x")])), "{b}");
    }

    #[test]
    fn empty_barcode_and_qr_fall_back() {
        let design = CanvasDesign {
            version: 1,
            elements: vec![
                element("b", ElementType::Barcode, None),
                element("q", ElementType::Qr, Some("")),
                element("t", ElementType::Text, None),
            ],
        };
        let label = render(100.0, 50.0, &design, &HashMap::new());
        assert_eq!(label.elements[0].content, BARCODE_FALLBACK);
        assert_eq!(label.elements[1].content, QR_FALLBACK);
        assert_eq!(label.elements[2].content, "");
        assert!((label.width_px - 378.0).abs() < 1e-9);
        assert!((label.height_px - 189.0).abs() < 1e-9);
    }

    #[test]
    fn placeholders_are_distinct_in_first_seen_order() {
        let design = CanvasDesign {
            version: 1,
            elements: vec![
                element("1", ElementType::Text, Some("{materialCode} / {batchNumber}")),
                element("2", ElementType::Barcode, Some("{serial}{materialCode}")),
            ],
        };
        assert_eq!(placeholders(&design), vec!["materialCode", "batchNumber", "serial"]);
    }

    #[test]
    fn json_data_is_flattened() {
        let d = data_from_json(&json!({"code": "A", "qty": 3, "ok": true, "skip": null}));
        assert_eq!(d.get("code").map(String::as_str), Some("A"));
        assert_eq!(d.get("qty").map(String::as_str), Some("3"));
        assert_eq!(d.get("ok").map(String::as_str), Some("true"));
        assert!(!d.contains_key("skip"));
    }

    proptest! {
        #[test]
        fn present_keys_resolve_absent_keys_remain(
            present in proptest::collection::hash_map("[a-z]{1,6}", "[A-Z0-9]{0,6}", 0..4),
            absent in proptest::collection::vec("[a-z]{7,9}", 0..3),
            filler in "[a-zA-Z0-9 _-]{0,8}",
        ) {
            let mut format = String::new();
            for key in present.keys().chain(absent.iter()) {
                format.push_str(&filler);
                format.push('{');
                format.push_str(key);
                format.push('}');
            }
            let out = substitute(&format, &present);
            for key in present.keys() {
                let token = format!("{{{}}}", key);
                prop_assert!(!out.contains(&token));
            }
            for key in &absent {
                let token = format!("{{{}}}", key);
                prop_assert!(out.contains(&token));
            }
        }
    }
}
