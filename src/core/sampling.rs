use crate::core::sector::SectorPolygon;
use crate::types::{DemRaster, Extent, HammerError, HammerResult};

/// DEM cells collected inside one sector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemSample {
    /// Mean of the sampled values, `None` when no cell was contained
    pub mean: Option<f64>,
    pub pixel_count: usize,
}

impl DemSample {
    pub fn empty() -> Self {
        Self {
            mean: None,
            pixel_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }
}

/// Mean elevation and pixel count of the DEM cells whose centres fall in `polygon`
pub fn sample_dem(polygon: &SectorPolygon, dem: &DemRaster) -> HammerResult<DemSample> {
    sample_dem_with(polygon, dem, |z| z)
}

/// Like [`sample_dem`], averaging `value(z)` instead of the raw elevation
pub fn sample_dem_with<F>(polygon: &SectorPolygon, dem: &DemRaster, value: F) -> HammerResult<DemSample>
where
    F: Fn(f64) -> f64,
{
    if !dem.transform.is_north_up() {
        return Err(HammerError::InvalidFormat(format!(
            "DEM '{}' has a rotated geotransform, which is not supported",
            dem.name
        )));
    }

    let Some((rows, cols)) = cell_window(&polygon.bounding_box(), dem) else {
        return Ok(DemSample::empty());
    };

    let mut sum = 0.0;
    let mut count = 0usize;
    for row in rows.0..rows.1 {
        for col in cols.0..cols.1 {
            let z = dem.data[[row, col]];
            if !dem.is_valid(z) {
                continue;
            }
            let (x, y) = dem.transform.cell_center(row, col);
            if polygon.contains(x, y) {
                sum += value(z as f64);
                count += 1;
            }
        }
    }

    log::trace!(
        "Sector {} on DEM '{}': {} pixels",
        polygon.index,
        dem.name,
        count
    );

    Ok(DemSample {
        mean: if count > 0 { Some(sum / count as f64) } else { None },
        pixel_count: count,
    })
}

/// Half-open (row, col) ranges of the cells overlapping `extent`
fn cell_window(extent: &Extent, dem: &DemRaster) -> Option<((usize, usize), (usize, usize))> {
    let (height, width) = dem.dim();
    if height == 0 || width == 0 || !dem.extent().intersects(extent) {
        return None;
    }

    let (col_a, row_a) = dem.transform.map_to_pixel(extent.min_x, extent.min_y);
    let (col_b, row_b) = dem.transform.map_to_pixel(extent.max_x, extent.max_y);

    let clamp = |lo: f64, hi: f64, limit: usize| -> Option<(usize, usize)> {
        let start = lo.floor().max(0.0) as usize;
        let end = (hi.ceil().max(0.0) as usize).min(limit);
        if start < end {
            Some((start, end))
        } else {
            None
        }
    };

    let cols = clamp(col_a.min(col_b), col_a.max(col_b), width)?;
    let rows = clamp(row_a.min(row_b), row_a.max(row_b), height)?;
    Some((rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sector::{generate_ring_sectors, generate_sector_polygon};
    use crate::types::{CoordinateSystem, GeoTransform, RingSpec, Station};
    use ndarray::Array2;

    /// 1 m cells covering [x0, x0 + size) x (y0 - size, y0]
    fn constant_dem(x0: f64, y0: f64, size: usize, value: f32) -> DemRaster {
        DemRaster::new(
            "const",
            Array2::from_elem((size, size), value),
            GeoTransform::from_gdal([x0, 1.0, 0.0, y0, 0.0, -1.0]),
            Some(-9999.0),
            CoordinateSystem::Projected { epsg: 25830 },
        )
    }

    fn brute_force_count(polygon: &SectorPolygon, dem: &DemRaster) -> usize {
        let (rows, cols) = dem.dim();
        let mut count = 0;
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = dem.transform.cell_center(r, c);
                if dem.is_valid(dem.data[[r, c]]) && polygon.contains(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_constant_dem_mean() {
        let station = Station::new("S", 500_000.0, 4_500_000.0, Some(100.0));
        let dem = constant_dem(499_950.0, 4_500_050.0, 100, 120.0);
        let ring = RingSpec::new(10.0, 20.0, 4).unwrap();

        for polygon in generate_ring_sectors(&station, &ring, 1.0).unwrap() {
            let sample = sample_dem(&polygon, &dem).unwrap();
            assert_eq!(sample.mean, Some(120.0));
            assert_eq!(sample.pixel_count, brute_force_count(&polygon, &dem));
            assert!(sample.pixel_count > 0);
        }
    }

    #[test]
    fn test_sectors_partition_annulus_cells() {
        // Station exactly on a cell corner: many centres sit on shared edges
        let station = Station::new("S", 500_000.5, 4_500_000.5, Some(0.0));
        let dem = constant_dem(499_950.0, 4_500_050.0, 100, 5.0);
        let ring = RingSpec::new(0.0, 30.0, 8).unwrap();
        let sectors = generate_ring_sectors(&station, &ring, 1.0).unwrap();

        let total: usize = sectors
            .iter()
            .map(|p| sample_dem(p, &dem).unwrap().pixel_count)
            .sum();

        let (rows, cols) = dem.dim();
        let mut in_any = 0;
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = dem.transform.cell_center(r, c);
                let hits = sectors.iter().filter(|p| p.contains(x, y)).count();
                assert!(hits <= 1, "cell ({}, {}) counted in {} sectors", r, c, hits);
                in_any += hits;
            }
        }
        assert_eq!(total, in_any);
        // Roughly the disc area in 1 m cells
        let disc = std::f64::consts::PI * 900.0;
        assert!((total as f64 - disc).abs() / disc < 0.02);
    }

    #[test]
    fn test_nodata_cells_are_skipped() {
        let station = Station::new("S", 500_000.0, 4_500_000.0, Some(100.0));
        let mut dem = constant_dem(499_950.0, 4_500_050.0, 100, 120.0);
        let ring = RingSpec::new(10.0, 20.0, 1).unwrap();
        let polygon = generate_sector_polygon(&station, &ring, 0, 1.0).unwrap();
        let full = sample_dem(&polygon, &dem).unwrap();

        // East half of the DEM becomes a void
        for r in 0..100 {
            for c in 50..100 {
                dem.data[[r, c]] = -9999.0;
            }
        }
        dem.data[[35, 30]] = f32::NAN;
        let partial = sample_dem(&polygon, &dem).unwrap();

        assert!(partial.pixel_count < full.pixel_count);
        assert!(partial.pixel_count > 0);
        assert_eq!(partial.mean, Some(120.0));
    }

    #[test]
    fn test_no_coverage_returns_empty_sample() {
        let station = Station::new("S", 500_000.0, 4_500_000.0, Some(100.0));
        let dem = constant_dem(600_000.0, 4_600_000.0, 10, 120.0);
        let ring = RingSpec::new(10.0, 20.0, 4).unwrap();
        let polygon = generate_sector_polygon(&station, &ring, 0, 1.0).unwrap();

        let sample = sample_dem(&polygon, &dem).unwrap();
        assert!(sample.is_empty());
        assert_eq!(sample.mean, None);
    }

    #[test]
    fn test_sample_with_transform() {
        let station = Station::new("S", 500_000.0, 4_500_000.0, Some(100.0));
        let data = Array2::from_shape_fn((100, 100), |(_, c)| if c < 50 { 90.0 } else { 110.0 });
        let dem = DemRaster::new(
            "split",
            data,
            GeoTransform::from_gdal([499_950.0, 1.0, 0.0, 4_500_050.0, 0.0, -1.0]),
            None,
            CoordinateSystem::Unspecified,
        );
        let ring = RingSpec::new(10.0, 20.0, 1).unwrap();
        let polygon = generate_sector_polygon(&station, &ring, 0, 1.0).unwrap();

        let signed = sample_dem_with(&polygon, &dem, |z| z - 100.0).unwrap();
        let absolute = sample_dem_with(&polygon, &dem, |z| (z - 100.0).abs()).unwrap();
        assert!(signed.mean.unwrap().abs() < 1.0);
        assert_eq!(absolute.mean, Some(10.0));
    }

    #[test]
    fn test_rotated_dem_rejected() {
        let station = Station::new("S", 0.0, 0.0, Some(0.0));
        let dem = DemRaster::new(
            "rotated",
            Array2::zeros((10, 10)),
            GeoTransform::from_gdal([0.0, 1.0, 0.1, 0.0, 0.1, -1.0]),
            None,
            CoordinateSystem::Unspecified,
        );
        let ring = RingSpec::new(1.0, 2.0, 4).unwrap();
        let polygon = generate_sector_polygon(&station, &ring, 0, 1.0).unwrap();
        assert!(sample_dem(&polygon, &dem).is_err());
    }
}
