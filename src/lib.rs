//! hammernet: Hammer-zone terrain correction for gravimetric surveys
//!
//! For every station, concentric rings are split into compartments, the DEM
//! cells inside each compartment are averaged and the halved elevation
//! difference to the station is reported (Hammer, 1936).

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AttributeKind, AttributeValue, CoordinateSystem, DemRaster, Extent, GeoTransform, HammerError,
    HammerResult, RingSpec, Station, StationSchema, StationSet,
};

pub use config::SurveyConfig;
pub use crate::core::{
    compute_elevation_difference, generate_sector_polygon, run_survey, sample_dem, HammerParams,
    RingSectorAverager, SectorPolygon, SectorRecord,
};
pub use io::{DemDirectory, DemReader, GeoPackageSink, OgrStationReader};

#[cfg(feature = "python")]
mod python {
    use crate::core::hammer::{HammerParams, RingSectorAverager, SectorRecord};
    use crate::types::{CoordinateSystem, DemRaster, GeoTransform, HammerError, RingSpec, Station};
    use numpy::PyReadonlyArray2;
    use pyo3::prelude::*;

    impl From<HammerError> for PyErr {
        fn from(e: HammerError) -> Self {
            match e {
                HammerError::InvalidParameter(_) => {
                    PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
                }
                _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)),
            }
        }
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PySectorRecord>()?;
        m.add_function(wrap_pyfunction!(compute_sectors, m)?)?;
        m.add_function(wrap_pyfunction!(sector_polygon_wkt, m)?)?;
        Ok(())
    }

    /// Python wrapper for SectorRecord
    #[pyclass(name = "SectorRecord")]
    struct PySectorRecord {
        inner: SectorRecord,
    }

    #[pymethods]
    impl PySectorRecord {
        #[getter]
        fn name(&self) -> String {
            self.inner.station_name.clone()
        }

        #[getter]
        fn station_index(&self) -> usize {
            self.inner.station_index
        }

        #[getter]
        fn partition(&self) -> usize {
            self.inner.partition()
        }

        #[getter]
        fn d_height(&self) -> Option<f64> {
            self.inner.half_difference
        }

        #[getter]
        fn n_pixels(&self) -> usize {
            self.inner.pixel_count
        }

        #[getter]
        fn field_name(&self) -> String {
            self.inner.field_name()
        }

        #[getter]
        fn wkt(&self) -> String {
            self.inner.polygon.to_wkt()
        }

        fn __repr__(&self) -> String {
            format!(
                "SectorRecord(name='{}', partition={}, d_height={:?}, n_pixels={})",
                self.inner.station_name,
                self.inner.partition(),
                self.inner.half_difference,
                self.inner.pixel_count
            )
        }
    }

    /// Compute all compartments of one ring for the given stations.
    ///
    /// `stations` holds `(name, easting, northing, elevation)` tuples and
    /// `geotransform` the six GDAL affine coefficients of `dem`.
    #[pyfunction]
    #[pyo3(signature = (stations, dem, geotransform, inner_radius, outer_radius, num_compartments, nodata=None))]
    fn compute_sectors(
        stations: Vec<(String, f64, f64, Option<f64>)>,
        dem: PyReadonlyArray2<f32>,
        geotransform: (f64, f64, f64, f64, f64, f64),
        inner_radius: f64,
        outer_radius: f64,
        num_compartments: usize,
        nodata: Option<f32>,
    ) -> PyResult<Vec<PySectorRecord>> {
        let (a, b, c, d, e, f) = geotransform;
        let raster = DemRaster::new(
            "numpy",
            dem.as_array().to_owned(),
            GeoTransform::from_gdal([a, b, c, d, e, f]),
            nodata,
            CoordinateSystem::Unspecified,
        );
        let stations: Vec<Station> = stations
            .into_iter()
            .map(|(name, x, y, z)| Station::new(name, x, y, z))
            .collect();

        let params = HammerParams::single_ring(inner_radius, outer_radius, num_compartments)?;
        let averager = RingSectorAverager::new(params)?;
        let records = averager.process(&stations, &[raster])?;

        Ok(records.into_iter().map(|inner| PySectorRecord { inner }).collect())
    }

    /// WKT of one compartment polygon
    #[pyfunction]
    fn sector_polygon_wkt(
        easting: f64,
        northing: f64,
        inner_radius: f64,
        outer_radius: f64,
        num_compartments: usize,
        index: usize,
    ) -> PyResult<String> {
        let ring = RingSpec::new(inner_radius, outer_radius, num_compartments)?;
        let station = Station::new("", easting, northing, None);
        let polygon = RingSectorAverager::standard().generate_sector_polygon(&station, &ring, index)?;
        Ok(polygon.to_wkt())
    }
}
