use crate::core::hammer::SectorRecord;
use crate::core::table::StationTable;
use crate::io::ResultSink;
use crate::types::{AttributeKind, AttributeValue, CoordinateSystem, HammerResult, RingSpec};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Feature, Geometry, LayerAccess};
use gdal::{Dataset, DriverManager, LayerOptions};
use gdal_sys::{OGRFieldType, OGRwkbGeometryType};
use std::path::{Path, PathBuf};

pub const FIELD_NAME: &str = "Name";
pub const FIELD_PARTITION: &str = "Partition";
pub const FIELD_HALF_DIFFERENCE: &str = "d_Height/2";
pub const FIELD_PIXELS: &str = "n_pixels";
pub const FIELD_DEM: &str = "DEM";

/// Layer holding the augmented station attributes
pub const STATIONS_LAYER: &str = "Stations";

/// Writes one polygon layer per ring, plus the station table, into a GeoPackage
pub struct GeoPackageSink {
    dataset: Dataset,
    srs: Option<SpatialRef>,
    csv_path: Option<PathBuf>,
}

impl GeoPackageSink {
    pub fn create<P: AsRef<Path>>(path: P) -> HammerResult<Self> {
        log::info!("Creating output GeoPackage: {}", path.as_ref().display());
        let driver = DriverManager::get_driver_by_name("GPKG")?;
        let dataset = driver.create_vector_only(path.as_ref())?;
        Ok(Self {
            dataset,
            srs: None,
            csv_path: None,
        })
    }

    /// Also export the station table as CSV
    pub fn with_csv<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.csv_path = Some(path.into());
        self
    }
}

impl ResultSink for GeoPackageSink {
    fn set_coordinate_system(&mut self, crs: CoordinateSystem) -> HammerResult<()> {
        self.srs = match crs {
            CoordinateSystem::Projected { epsg } => Some(SpatialRef::from_epsg(epsg)?),
            _ => None,
        };
        Ok(())
    }

    fn write_ring(&mut self, ring: &RingSpec, records: &[SectorRecord]) -> HammerResult<()> {
        let layer_name = ring.layer_name();
        let layer = self.dataset.create_layer(LayerOptions {
            name: &layer_name,
            srs: self.srs.as_ref(),
            ty: OGRwkbGeometryType::wkbPolygon,
            options: None,
        })?;
        layer.create_defn_fields(&[
            (FIELD_NAME, OGRFieldType::OFTString),
            (FIELD_PARTITION, OGRFieldType::OFTInteger),
            (FIELD_HALF_DIFFERENCE, OGRFieldType::OFTReal),
            (FIELD_PIXELS, OGRFieldType::OFTInteger),
            (FIELD_DEM, OGRFieldType::OFTString),
        ])?;

        let defn = layer.defn();
        for record in records {
            let mut feature = Feature::new(defn)?;
            feature.set_geometry(Geometry::from_wkt(&record.polygon.to_wkt())?)?;
            feature.set_field_string(FIELD_NAME, &record.station_name)?;
            feature.set_field_integer(FIELD_PARTITION, record.partition() as i32)?;
            // Unset fields are stored as NULL
            if let Some(value) = record.half_difference {
                feature.set_field_double(FIELD_HALF_DIFFERENCE, value)?;
            }
            feature.set_field_integer(FIELD_PIXELS, record.pixel_count as i32)?;
            if let Some(dem) = &record.dem_name {
                feature.set_field_string(FIELD_DEM, dem)?;
            }
            feature.create(&layer)?;
        }

        log::info!("Wrote {} features to layer {}", records.len(), layer_name);
        Ok(())
    }

    fn write_station_table(&mut self, table: &StationTable) -> HammerResult<()> {
        let layer = self.dataset.create_layer(LayerOptions {
            name: STATIONS_LAYER,
            srs: self.srs.as_ref(),
            ty: OGRwkbGeometryType::wkbPoint,
            options: None,
        })?;

        let mut fields: Vec<(&str, OGRFieldType::Type)> = vec![
            (table.name_field.as_str(), OGRFieldType::OFTString),
            (table.elevation_field.as_str(), OGRFieldType::OFTReal),
        ];
        fields.extend(
            table
                .attributes
                .iter()
                .map(|(name, kind)| (name.as_str(), ogr_field_type(*kind))),
        );
        fields.extend(table.columns.iter().map(|c| (c.as_str(), OGRFieldType::OFTReal)));
        layer.create_defn_fields(&fields)?;

        let defn = layer.defn();
        for row in &table.rows {
            let mut feature = Feature::new(defn)?;
            let wkt = format!("POINT ({} {})", row.station.easting, row.station.northing);
            feature.set_geometry(Geometry::from_wkt(&wkt)?)?;
            feature.set_field_string(&table.name_field, &row.station.name)?;
            if let Some(elevation) = row.station.elevation {
                feature.set_field_double(&table.elevation_field, elevation)?;
            }
            for ((field, _), value) in table.attributes.iter().zip(&row.attributes) {
                match value {
                    Some(AttributeValue::Integer(v)) => feature.set_field_integer64(field, *v)?,
                    Some(AttributeValue::Real(v)) => feature.set_field_double(field, *v)?,
                    Some(AttributeValue::Text(v)) => feature.set_field_string(field, v)?,
                    None => {}
                }
            }
            for (column, value) in table.columns.iter().zip(&row.values) {
                if let Some(value) = value {
                    feature.set_field_double(column, *value)?;
                }
            }
            feature.create(&layer)?;
        }
        log::info!("Wrote {} stations to layer {}", table.rows.len(), STATIONS_LAYER);

        if let Some(path) = &self.csv_path {
            write_station_table_csv(path, table)?;
        }
        Ok(())
    }
}

fn ogr_field_type(kind: AttributeKind) -> OGRFieldType::Type {
    match kind {
        AttributeKind::Integer => OGRFieldType::OFTInteger64,
        AttributeKind::Real => OGRFieldType::OFTReal,
        AttributeKind::Text => OGRFieldType::OFTString,
    }
}

/// Export the station table, one row per station; null values are empty cells
pub fn write_station_table_csv<P: AsRef<Path>>(path: P, table: &StationTable) -> HammerResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let mut header = vec![
        table.name_field.clone(),
        "Easting".to_string(),
        "Northing".to_string(),
        table.elevation_field.clone(),
    ];
    header.extend(table.attributes.iter().map(|(name, _)| name.clone()));
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for row in &table.rows {
        let mut record = vec![
            row.station.name.clone(),
            row.station.easting.to_string(),
            row.station.northing.to_string(),
            fmt(row.station.elevation),
        ];
        record.extend(
            row.attributes
                .iter()
                .map(|v| v.as_ref().map(|v| v.to_string()).unwrap_or_default()),
        );
        record.extend(row.values.iter().map(|v| fmt(*v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    log::info!(
        "The attribute table has been exported to '{}'",
        path.as_ref().display()
    );
    Ok(())
}

/// Keeps results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub coordinate_system: Option<CoordinateSystem>,
    pub rings: Vec<(RingSpec, Vec<SectorRecord>)>,
    pub table: Option<StationTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn set_coordinate_system(&mut self, crs: CoordinateSystem) -> HammerResult<()> {
        self.coordinate_system = Some(crs);
        Ok(())
    }

    fn write_ring(&mut self, ring: &RingSpec, records: &[SectorRecord]) -> HammerResult<()> {
        self.rings.push((*ring, records.to_vec()));
        Ok(())
    }

    fn write_station_table(&mut self, table: &StationTable) -> HammerResult<()> {
        self.table = Some(table.clone());
        Ok(())
    }
}
