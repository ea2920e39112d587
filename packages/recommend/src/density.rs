//! Complaint density grid for heatmap rendering.

use std::collections::HashMap;

use quiet_spaces_complaint_models::NoiseComplaint;

use crate::RecommendError;

/// Default cell size in degrees (about 500 m).
pub const DEFAULT_GRID_SIZE: f64 = 0.005;

/// One populated grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityCell {
    /// Cell center latitude.
    pub lat: f64,
    /// Cell center longitude.
    pub lng: f64,
    /// Complaints in the cell.
    pub weight: u32,
}

/// Complaints bucketed into a fixed lat/lng grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityGrid {
    /// Populated cells, heaviest first.
    pub cells: Vec<DensityCell>,
    /// Located complaints that were bucketed.
    pub total_complaints: usize,
    /// Largest cell weight, for client-side normalization.
    pub max_density: u32,
}

/// Index of the grid line nearest to `value`. Cells are keyed by index so
/// float noise cannot split a cell; the cell center is `index * grid_size`.
#[allow(clippy::cast_possible_truncation)]
fn grid_index(value: f64, grid_size: f64) -> i64 {
    (value / grid_size).round() as i64
}

/// Buckets located complaints into cells of `grid_size` degrees.
///
/// Complaints without coordinates are skipped.
///
/// # Errors
///
/// Returns [`RecommendError::InvalidGridSize`] if `grid_size` is not a
/// positive finite number.
pub fn density_grid(
    complaints: &[NoiseComplaint],
    grid_size: f64,
) -> Result<DensityGrid, RecommendError> {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return Err(RecommendError::InvalidGridSize(grid_size));
    }

    let mut counts: HashMap<(i64, i64), u32> = HashMap::new();
    let mut total_complaints = 0;

    for (lat, lng) in complaints.iter().filter_map(NoiseComplaint::coordinates) {
        let key = (grid_index(lat, grid_size), grid_index(lng, grid_size));
        *counts.entry(key).or_default() += 1;
        total_complaints += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let mut cells: Vec<DensityCell> = counts
        .into_iter()
        .map(|((lat_idx, lng_idx), weight)| DensityCell {
            lat: lat_idx as f64 * grid_size,
            lng: lng_idx as f64 * grid_size,
            weight,
        })
        .collect();

    cells.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then(a.lat.total_cmp(&b.lat))
            .then(a.lng.total_cmp(&b.lng))
    });

    let max_density = cells.first().map_or(0, |c| c.weight);

    log::debug!(
        "Bucketed {total_complaints} complaints into {} cells (max density {max_density})",
        cells.len()
    );

    Ok(DensityGrid {
        cells,
        total_complaints,
        max_density,
    })
}
