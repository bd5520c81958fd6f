use crate::types::{Extent, HammerError, HammerResult, RingSpec, Station};

/// Default angular step between arc vertices (degrees)
pub const DEFAULT_ARC_STEP_DEG: f64 = 1.0;

/// Annular wedge polygon for one compartment of a ring
#[derive(Debug, Clone, PartialEq)]
pub struct SectorPolygon {
    /// Compartment index in `[0, num_compartments)`
    pub index: usize,
    /// Station position (easting, northing)
    pub center: (f64, f64),
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Angular bounds in degrees, counter-clockwise from east
    pub start_deg: f64,
    pub end_deg: f64,
    /// Open vertex ring: outer arc start→end, then inner arc end→start
    pub vertices: Vec<(f64, f64)>,
}

/// Build the wedge polygon for compartment `index` of `ring` around `station`.
///
/// Arc vertices are spaced at most `arc_step_deg` apart, with the two
/// bounding angles always present as exact vertices.
pub fn generate_sector_polygon(
    station: &Station,
    ring: &RingSpec,
    index: usize,
    arc_step_deg: f64,
) -> HammerResult<SectorPolygon> {
    ring.validate()?;
    if index >= ring.num_compartments {
        return Err(HammerError::InvalidParameter(format!(
            "compartment index {} out of range for ring with {} compartments",
            index, ring.num_compartments
        )));
    }
    if !(arc_step_deg > 0.0 && arc_step_deg <= 90.0) {
        return Err(HammerError::InvalidParameter(format!(
            "arc step must be in (0, 90] degrees, got {}",
            arc_step_deg
        )));
    }

    let (start_deg, end_deg) = ring.angular_bounds(index);
    let steps = ((end_deg - start_deg) / arc_step_deg).ceil().max(1.0) as usize;
    let angles: Vec<f64> = (0..=steps)
        .map(|k| {
            if k == steps {
                end_deg
            } else {
                start_deg + (end_deg - start_deg) * k as f64 / steps as f64
            }
        })
        .collect();

    let (cx, cy) = (station.easting, station.northing);
    // 360 maps onto 0 so the last and first compartments share an edge exactly
    let arc_point = |radius: f64, angle_deg: f64| {
        let theta = (angle_deg % 360.0).to_radians();
        (cx + radius * theta.cos(), cy + radius * theta.sin())
    };

    let mut vertices = Vec::with_capacity(2 * angles.len());
    vertices.extend(angles.iter().map(|&a| arc_point(ring.outer_radius, a)));
    if ring.inner_radius > 0.0 {
        vertices.extend(angles.iter().rev().map(|&a| arc_point(ring.inner_radius, a)));
    } else {
        vertices.push((cx, cy));
    }

    Ok(SectorPolygon {
        index,
        center: (cx, cy),
        inner_radius: ring.inner_radius,
        outer_radius: ring.outer_radius,
        start_deg,
        end_deg,
        vertices,
    })
}

/// All compartments of a ring around a station, in index order
pub fn generate_ring_sectors(
    station: &Station,
    ring: &RingSpec,
    arc_step_deg: f64,
) -> HammerResult<Vec<SectorPolygon>> {
    (0..ring.num_compartments)
        .map(|i| generate_sector_polygon(station, ring, i, arc_step_deg))
        .collect()
}

impl SectorPolygon {
    pub fn bounding_box(&self) -> Extent {
        let mut extent = Extent {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &(x, y) in &self.vertices {
            extent.min_x = extent.min_x.min(x);
            extent.max_x = extent.max_x.max(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_y = extent.max_y.max(y);
        }
        extent
    }

    /// Even-odd point-in-polygon test.
    ///
    /// Edges are evaluated with their endpoints ordered by `y`, so two
    /// sectors sharing a radial edge agree on every point lying on it and
    /// such a point belongs to exactly one of them.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        let mut inside = false;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let (lo, hi) = if a.1 <= b.1 { (a, b) } else { (b, a) };
            // Half-open in y: [lo.y, hi.y)
            if y < lo.1 || y >= hi.1 {
                continue;
            }
            let x_cross = lo.0 + (y - lo.1) * (hi.0 - lo.0) / (hi.1 - lo.1);
            if x < x_cross {
                inside = !inside;
            }
        }
        inside
    }

    /// Signed shoelace area (positive for counter-clockwise vertices)
    fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let (ox, oy) = self.center;
        let mut acc = 0.0;
        for i in 0..n {
            let (x0, y0) = self.vertices[i];
            let (x1, y1) = self.vertices[(i + 1) % n];
            acc += (x0 - ox) * (y1 - oy) - (x1 - ox) * (y0 - oy);
        }
        acc / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Area-weighted centroid of the polygon
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.vertices.len();
        let (ox, oy) = self.center;
        let area = self.signed_area();
        if area == 0.0 {
            return self.center;
        }
        let (mut sx, mut sy) = (0.0, 0.0);
        for i in 0..n {
            let (x0, y0) = (self.vertices[i].0 - ox, self.vertices[i].1 - oy);
            let (x1, y1) = (
                self.vertices[(i + 1) % n].0 - ox,
                self.vertices[(i + 1) % n].1 - oy,
            );
            let cross = x0 * y1 - x1 * y0;
            sx += (x0 + x1) * cross;
            sy += (y0 + y1) * cross;
        }
        (ox + sx / (6.0 * area), oy + sy / (6.0 * area))
    }

    /// Closed polygon in WKT, as consumed by OGR
    pub fn to_wkt(&self) -> String {
        let mut coords: Vec<String> = self
            .vertices
            .iter()
            .map(|(x, y)| format!("{} {}", x, y))
            .collect();
        if let Some(&(x, y)) = self.vertices.first() {
            coords.push(format!("{} {}", x, y));
        }
        format!("POLYGON (({}))", coords.join(", "))
    }
}
