use crate::io::{coordinate_system_of, DemSource};
use crate::types::{CoordinateSystem, DemRaster, GeoTransform, HammerError, HammerResult};
use gdal::Dataset;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Raster extensions picked up when scanning a DEM directory
const DEM_EXTENSIONS: &[&str] = &["tif", "tiff", "img", "asc", "hgt", "vrt", "dem"];

/// Digital Elevation Model reader for an explicit list of files
#[derive(Debug, Clone)]
pub struct DemReader {
    paths: Vec<PathBuf>,
}

impl DemReader {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the first band of a DEM file
    pub fn read_dem<P: AsRef<Path>>(dem_path: P) -> HammerResult<DemRaster> {
        let path = dem_path.as_ref();
        log::info!("Reading DEM from: {}", path.display());

        let dataset = Dataset::open(path)?;

        let geo_transform = dataset.geo_transform()?;
        let (width, height) = dataset.raster_size();
        log::debug!("DEM size: {}x{}", width, height);
        log::debug!("DEM geotransform: {:?}", geo_transform);

        let coordinate_system = match dataset.spatial_ref() {
            Ok(srs) => coordinate_system_of(&srs),
            Err(e) => {
                log::warn!("DEM {} has no spatial reference: {}", path.display(), e);
                CoordinateSystem::Unspecified
            }
        };

        let rasterband = dataset.rasterband(1)?;
        let nodata = rasterband.no_data_value().map(|v| v as f32);
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let data = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| HammerError::Processing(format!("Failed to reshape DEM data: {}", e)))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(DemRaster::new(
            name,
            data,
            GeoTransform::from_gdal(geo_transform),
            nodata,
            coordinate_system,
        ))
    }
}

impl DemSource for DemReader {
    fn read_dems(&self) -> HammerResult<Vec<DemRaster>> {
        if self.paths.is_empty() {
            return Err(HammerError::MissingDem("no DEM files given".to_string()));
        }
        self.paths.iter().map(Self::read_dem).collect()
    }
}

/// Every raster in one directory, ordered by file name
#[derive(Debug, Clone)]
pub struct DemDirectory {
    dir: PathBuf,
}

impl DemDirectory {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// DEM files in the directory, sorted by name
    pub fn find_dem_files(&self) -> HammerResult<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(HammerError::MissingDem(format!(
                "DEM directory '{}' does not exist",
                self.dir.display()
            )));
        }

        let mut dem_files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy().to_lowercase();
                        DEM_EXTENSIONS.contains(&ext.as_str())
                    })
                    .unwrap_or(false)
            })
            .collect();
        dem_files.sort();

        log::info!("Found {} DEM files in {}", dem_files.len(), self.dir.display());
        Ok(dem_files)
    }
}

impl DemSource for DemDirectory {
    fn read_dems(&self) -> HammerResult<Vec<DemRaster>> {
        let files = self.find_dem_files()?;
        if files.is_empty() {
            return Err(HammerError::MissingDem(format!(
                "no raster files found in '{}'",
                self.dir.display()
            )));
        }

        let mut dems = Vec::with_capacity(files.len());
        for file in files {
            match DemReader::read_dem(&file) {
                Ok(dem) => dems.push(dem),
                Err(e) => log::warn!("Skipping {}: {}", file.display(), e),
            }
        }
        if dems.is_empty() {
            return Err(HammerError::MissingDem(format!(
                "none of the rasters in '{}' could be read",
                self.dir.display()
            )));
        }
        Ok(dems)
    }
}
