use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::packaging_level;

/// Capacity assumed for a level that has none configured.
pub const DEFAULT_LEVEL_CAPACITY: i64 = 10;

/// Largest print run a single plan accepts.
pub const MAX_PLAN_ITEMS: i64 = 10_000_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum PaperSize {
    A4,
    Letter,
}

impl PaperSize {
    /// Sheet width and height in millimetres.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLabelCount {
    pub level_id: Uuid,
    pub level_name: String,
    pub level_order: i32,
    pub labels: i64,
}

/// Number of labels each level needs to cover `total_items` units.
///
/// Levels are walked innermost first. The innermost level needs one label
/// per item; every outer level needs `ceil(previous / capacity)` where the
/// capacity is the previous level's (unset or zero counts as
/// [`DEFAULT_LEVEL_CAPACITY`]).
pub fn plan_label_counts(
    levels: &[packaging_level::Model],
    total_items: i64,
) -> Result<Vec<LevelLabelCount>, ServiceError> {
    if !(0..=MAX_PLAN_ITEMS).contains(&total_items) {
        return Err(ServiceError::validation(
            "total_items",
            format!("Total items must be between 0 and {}", MAX_PLAN_ITEMS),
        ));
    }

    let mut sorted: Vec<&packaging_level::Model> = levels.iter().collect();
    sorted.sort_by_key(|l| l.level_order);

    let mut counts = Vec::with_capacity(sorted.len());
    let mut current = total_items;
    for level in sorted {
        counts.push(LevelLabelCount {
            level_id: level.id,
            level_name: level.level_name.clone(),
            level_order: level.level_order,
            labels: current,
        });
        let capacity = match level.capacity {
            Some(c) if c > 0 => i64::from(c),
            _ => DEFAULT_LEVEL_CAPACITY,
        };
        current = current / capacity + i64::from(current % capacity != 0);
    }
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imposition {
    pub paper: PaperSize,
    pub columns: u32,
    pub rows: u32,
    pub labels_per_sheet: u32,
    pub total_labels: u32,
    pub sheets: u32,
}

/// Lays labels of the given size out on sheets of `paper`.
pub fn impose(
    paper: PaperSize,
    label_width_mm: f64,
    label_height_mm: f64,
    total_labels: u32,
) -> Result<Imposition, ServiceError> {
    if !(label_width_mm > 0.0 && label_height_mm > 0.0) {
        return Err(ServiceError::invalid("Label dimensions must be positive"));
    }
    let (paper_w, paper_h) = paper.dimensions_mm();
    let columns = (paper_w / label_width_mm).floor() as u32;
    let rows = (paper_h / label_height_mm).floor() as u32;
    let labels_per_sheet = columns * rows;
    if labels_per_sheet == 0 {
        return Err(ServiceError::invalid(format!(
            "A {}x{} mm label does not fit on {} paper",
            label_width_mm, label_height_mm, paper
        )));
    }

    Ok(Imposition {
        paper,
        columns,
        rows,
        labels_per_sheet,
        total_labels,
        sheets: total_labels.div_ceil(labels_per_sheet),
    })
}
