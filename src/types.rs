use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Coordinate system of a station layer or DEM raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Geographic coordinates (latitude, longitude)
    Geographic,
    /// Projected coordinates (e.g., UTM)
    Projected { epsg: u32 },
    /// Source carried no usable spatial reference
    Unspecified,
}

impl CoordinateSystem {
    pub fn is_projected(&self) -> bool {
        matches!(self, CoordinateSystem::Projected { .. })
    }
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateSystem::Geographic => write!(f, "geographic"),
            CoordinateSystem::Projected { epsg } => write!(f, "EPSG:{}", epsg),
            CoordinateSystem::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Type of a pass-through station attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Integer,
    Real,
    Text,
}

/// Value of a pass-through station attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Real(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Gravimetric station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub easting: f64,   // meters
    pub northing: f64,  // meters
    pub elevation: Option<f64>,
    /// Remaining layer attributes, one entry per [`StationSchema::attributes`] field
    #[serde(default)]
    pub attributes: Vec<Option<AttributeValue>>,
}

impl Station {
    pub fn new(name: impl Into<String>, easting: f64, northing: f64, elevation: Option<f64>) -> Self {
        Self {
            name: name.into(),
            easting,
            northing,
            elevation,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Option<AttributeValue>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Elevation if present and finite
    pub fn valid_elevation(&self) -> Option<f64> {
        self.elevation.filter(|e| e.is_finite())
    }
}

/// Field layout of the station layer, reproduced in the augmented outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSchema {
    pub name_field: String,
    pub elevation_field: String,
    /// Pass-through attributes in layer order
    pub attributes: Vec<(String, AttributeKind)>,
}

impl Default for StationSchema {
    fn default() -> Self {
        Self {
            name_field: "Name".to_string(),
            elevation_field: "Elevation".to_string(),
            attributes: Vec::new(),
        }
    }
}

/// Stations read from one point layer, together with the layer's CRS
#[derive(Debug, Clone, PartialEq)]
pub struct StationSet {
    pub stations: Vec<Station>,
    pub coordinate_system: CoordinateSystem,
    pub schema: StationSchema,
}

impl StationSet {
    /// Stations without pass-through attributes
    pub fn new(stations: Vec<Station>, coordinate_system: CoordinateSystem) -> Self {
        Self {
            stations,
            coordinate_system,
            schema: StationSchema::default(),
        }
    }
}

/// One Hammer ring (zone): an annulus split into equal compartments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    pub inner_radius: f64,      // meters
    pub outer_radius: f64,      // meters
    pub num_compartments: usize,
}

impl RingSpec {
    /// Create a validated ring
    pub fn new(inner_radius: f64, outer_radius: f64, num_compartments: usize) -> HammerResult<Self> {
        let ring = Self {
            inner_radius,
            outer_radius,
            num_compartments,
        };
        ring.validate()?;
        Ok(ring)
    }

    pub fn validate(&self) -> HammerResult<()> {
        if !self.inner_radius.is_finite() || !self.outer_radius.is_finite() {
            return Err(HammerError::InvalidParameter(format!(
                "ring radii must be finite (inner={}, outer={})",
                self.inner_radius, self.outer_radius
            )));
        }
        if self.inner_radius < 0.0 {
            return Err(HammerError::InvalidParameter(format!(
                "inner radius must be >= 0, got {}",
                self.inner_radius
            )));
        }
        if self.outer_radius <= self.inner_radius {
            return Err(HammerError::InvalidParameter(format!(
                "outer radius ({}) must exceed inner radius ({})",
                self.outer_radius, self.inner_radius
            )));
        }
        if self.num_compartments == 0 {
            return Err(HammerError::InvalidParameter(
                "number of compartments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Angular width of one compartment in degrees
    pub fn sector_span_deg(&self) -> f64 {
        360.0 / self.num_compartments as f64
    }

    /// Start and end angle of a compartment in degrees, counter-clockwise from east.
    ///
    /// Both bounds are computed as `k * span` so neighbouring compartments
    /// share bit-identical edges.
    pub fn angular_bounds(&self, index: usize) -> (f64, f64) {
        let span = self.sector_span_deg();
        let start = index as f64 * span;
        let end = if index + 1 == self.num_compartments {
            360.0
        } else {
            (index + 1) as f64 * span
        };
        (start, end)
    }

    /// Attribute column name for a compartment, e.g. `53_170_6.1`
    pub fn field_name(&self, index: usize) -> String {
        format!(
            "{:.0}_{:.0}_{}.{}",
            self.inner_radius,
            self.outer_radius,
            self.num_compartments,
            index + 1
        )
    }

    /// Output layer name, e.g. `Rings_53_170`
    pub fn layer_name(&self) -> String {
        format!("Rings_{:.0}_{:.0}", self.inner_radius, self.outer_radius)
    }
}

impl std::fmt::Display for RingSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} m / {} compartments",
            self.inner_radius, self.outer_radius, self.num_compartments
        )
    }
}

/// Axis-aligned extent in projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Geospatial transformation parameters (GDAL affine order)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Raster axes aligned with the map axes
    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }

    /// Map coordinates of the centre of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.top_left_x + (col as f64 + 0.5) * self.pixel_width,
            self.top_left_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a map coordinate
    pub fn map_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.top_left_x) / self.pixel_width,
            (y - self.top_left_y) / self.pixel_height,
        )
    }

    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }
}

/// Elevation raster held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct DemRaster {
    pub name: String,
    /// Elevations, (rows, cols)
    pub data: Array2<f32>,
    pub transform: GeoTransform,
    pub nodata: Option<f32>,
    pub coordinate_system: CoordinateSystem,
}

impl DemRaster {
    pub fn new(
        name: impl Into<String>,
        data: Array2<f32>,
        transform: GeoTransform,
        nodata: Option<f32>,
        coordinate_system: CoordinateSystem,
    ) -> Self {
        Self {
            name: name.into(),
            data,
            transform,
            nodata,
            coordinate_system,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Map extent covered by the raster cells
    pub fn extent(&self) -> Extent {
        let (rows, cols) = self.data.dim();
        let t = &self.transform;
        let x0 = t.top_left_x;
        let x1 = t.top_left_x + cols as f64 * t.pixel_width;
        let y0 = t.top_left_y;
        let y1 = t.top_left_y + rows as f64 * t.pixel_height;
        Extent {
            min_x: x0.min(x1),
            max_x: x0.max(x1),
            min_y: y0.min(y1),
            max_y: y0.max(y1),
        }
    }

    /// Cell value that counts as an elevation
    pub fn is_valid(&self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.nodata {
            Some(nodata) => value != nodata,
            None => true,
        }
    }

    /// Elevation of the cell containing (x, y), if any
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.map_to_pixel(x, y);
        let (rows, cols) = self.data.dim();
        if col < 0.0 || row < 0.0 || col >= cols as f64 || row >= rows as f64 {
            return None;
        }
        let value = self.data[[row.floor() as usize, col.floor() as usize]];
        if self.is_valid(value) {
            Some(value as f64)
        } else {
            None
        }
    }
}

/// Error types for terrain-correction processing
#[derive(Debug, thiserror::Error)]
pub enum HammerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No DEM layers available: {0}")]
    MissingDem(String),

    #[error("No stations available: {0}")]
    NoStations(String),

    #[error("Coordinate system error: {0}")]
    CoordinateSystem(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for terrain-correction operations
pub type HammerResult<T> = Result<T, HammerError>;
