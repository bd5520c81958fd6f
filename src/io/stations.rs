use crate::config::SurveyConfig;
use crate::io::{coordinate_system_of, StationSource};
use crate::types::{
    AttributeKind, AttributeValue, CoordinateSystem, HammerError, HammerResult, Station,
    StationSchema, StationSet,
};
use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use gdal_sys::{OGRFieldType, OGRwkbGeometryType};
use std::path::{Path, PathBuf};

/// Reads stations from an OGR point layer (GeoPackage, Shapefile, GeoJSON, ...)
#[derive(Debug, Clone)]
pub struct OgrStationReader {
    path: PathBuf,
    layer: Option<String>,
    name_field: String,
    elevation_field: Option<String>,
}

impl OgrStationReader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            layer: None,
            name_field: "Name".to_string(),
            elevation_field: Some("Elevation".to_string()),
        }
    }

    /// Reader using the layer and attribute names of a survey config
    pub fn from_config<P: Into<PathBuf>>(path: P, config: &SurveyConfig) -> Self {
        Self {
            path: path.into(),
            layer: config.station_layer.clone(),
            name_field: config.name_field.clone(),
            elevation_field: config.elevation_field.clone(),
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_fields(mut self, name_field: impl Into<String>, elevation_field: Option<String>) -> Self {
        self.name_field = name_field.into();
        self.elevation_field = elevation_field;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_point(geometry_type: OGRwkbGeometryType::Type) -> bool {
    matches!(
        geometry_type,
        OGRwkbGeometryType::wkbPoint
            | OGRwkbGeometryType::wkbPoint25D
            | OGRwkbGeometryType::wkbPointM
            | OGRwkbGeometryType::wkbPointZM
    )
}

fn attribute_kind(field_type: OGRFieldType::Type) -> AttributeKind {
    match field_type {
        OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => AttributeKind::Integer,
        OGRFieldType::OFTReal => AttributeKind::Real,
        _ => AttributeKind::Text,
    }
}

fn attribute_value(value: FieldValue) -> Option<AttributeValue> {
    match value {
        FieldValue::IntegerValue(v) => Some(AttributeValue::Integer(v.into())),
        FieldValue::Integer64Value(v) => Some(AttributeValue::Integer(v)),
        FieldValue::RealValue(v) => Some(AttributeValue::Real(v)),
        other => other.into_string().map(AttributeValue::Text),
    }
}

impl StationSource for OgrStationReader {
    fn read_stations(&self) -> HammerResult<StationSet> {
        log::info!("Reading stations from: {}", self.path.display());
        let dataset = Dataset::open(&self.path)?;

        let mut layer = match &self.layer {
            Some(name) => dataset.layer_by_name(name)?,
            None => dataset.layers().next().ok_or_else(|| {
                HammerError::NoStations(format!(
                    "'{}' contains no vector layer",
                    self.path.display()
                ))
            })?,
        };

        let fields: Vec<(String, OGRFieldType::Type)> = layer
            .defn()
            .fields()
            .map(|f| (f.name(), f.field_type()))
            .collect();
        let field_names: Vec<String> = fields.iter().map(|(name, _)| name.clone()).collect();
        if !field_names.contains(&self.name_field) {
            return Err(HammerError::InvalidFormat(format!(
                "station layer '{}' has no '{}' field (fields: {:?})",
                layer.name(),
                self.name_field,
                field_names
            )));
        }
        let elevation_field = match &self.elevation_field {
            Some(field) if field_names.contains(field) => Some(field.as_str()),
            Some(field) => {
                log::warn!(
                    "Station layer '{}' has no '{}' field; elevations are absent",
                    layer.name(),
                    field
                );
                None
            }
            None => None,
        };

        let schema = StationSchema {
            name_field: self.name_field.clone(),
            elevation_field: self
                .elevation_field
                .clone()
                .unwrap_or_else(|| StationSchema::default().elevation_field),
            attributes: Vec::new(),
        };
        // Everything except name and elevation is carried through to the outputs
        let attributes: Vec<(String, AttributeKind)> = fields
            .iter()
            .filter(|(name, _)| *name != schema.name_field && *name != schema.elevation_field)
            .map(|(name, ty)| (name.clone(), attribute_kind(*ty)))
            .collect();
        let schema = StationSchema { attributes, ..schema };

        let coordinate_system = layer
            .spatial_ref()
            .map(|srs| coordinate_system_of(&srs))
            .unwrap_or(CoordinateSystem::Unspecified);

        let mut stations = Vec::new();
        for (i, feature) in layer.features().enumerate() {
            let Some(geometry) = feature.geometry() else {
                log::warn!("Feature {} has no geometry and will be ignored", i);
                continue;
            };
            if !is_point(geometry.geometry_type()) {
                log::warn!("Feature {} is not a point and will be ignored", i);
                continue;
            }
            let (x, y, _) = geometry.get_point(0);

            let name = feature
                .field_as_string_by_name(&self.name_field)?
                .unwrap_or_else(|| format!("station_{}", i + 1));
            let elevation = match elevation_field {
                Some(field) => feature.field_as_double_by_name(field)?,
                None => None,
            };

            let mut values = Vec::with_capacity(schema.attributes.len());
            for (field, _) in &schema.attributes {
                values.push(feature.field(field)?.and_then(attribute_value));
            }

            stations.push(Station::new(name, x, y, elevation).with_attributes(values));
        }

        log::info!(
            "Read {} stations ({}) from layer '{}'",
            stations.len(),
            coordinate_system,
            layer.name()
        );

        Ok(StationSet {
            stations,
            coordinate_system,
            schema,
        })
    }
}
