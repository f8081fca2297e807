//! Area of interest and its measured area.
//!
//! Input geometries are geographic (longitude, latitude on WGS84). Areas are
//! measured in a local Albers equal-area conic centred on the geometry's
//! centroid with standard parallels two degrees either side of it, so the
//! result does not depend on where on the globe the geometry sits.
//!
//! Edges are straight lines in longitude/latitude (RFC 7946). A polygon that
//! crosses the antimeridian arrives as a MultiPolygon split at ±180°.

use geo::sweep::{Cross, Intersections, LineOrPoint};
use geo::{
    Area, Centroid, Contains, Coord, Line, LineIntersection, LineString, MapCoords, MultiPolygon,
    Polygon,
};
use geojson::{GeoJson, Geometry, Value};
use std::str::FromStr;
use tracing::debug;

use crate::error::{PricingError, PricingResult};

const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Offset of the standard parallels from the centroid latitude
const STANDARD_PARALLEL_OFFSET_DEG: f64 = 2.0;
const MAX_PARALLEL_DEG: f64 = 89.9;

/// Below this the cone flattens into a cylinder
const CONE_EPSILON: f64 = 1e-7;

/// Validated polygonal geometry in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    geometry: MultiPolygon<f64>,
}

impl AreaOfInterest {
    pub fn new(geometry: MultiPolygon<f64>) -> PricingResult<Self> {
        validate_geometry(&geometry)?;
        Ok(Self { geometry })
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> PricingResult<Self> {
        Self::new(MultiPolygon::new(vec![polygon]))
    }

    /// Rectangle drawn on a map, as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn from_bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> PricingResult<Self> {
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(PricingError::Geometry(format!(
                "bounding box [{min_lon}, {min_lat}, {max_lon}, {max_lat}] has no extent"
            )));
        }
        let ring = LineString::from(vec![
            (min_lon, min_lat),
            (max_lon, min_lat),
            (max_lon, max_lat),
            (min_lon, max_lat),
            (min_lon, min_lat),
        ]);
        Self::from_polygon(Polygon::new(ring, vec![]))
    }

    /// Accepts a Geometry, a Feature, or a FeatureCollection. Every polygonal
    /// feature of a collection becomes part of the area; other features are
    /// skipped.
    pub fn from_geojson(geojson: &GeoJson) -> PricingResult<Self> {
        let mut polygons = Vec::new();
        match geojson {
            GeoJson::Geometry(geometry) => collect_polygons(geometry, &mut polygons)?,
            GeoJson::Feature(feature) => {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .ok_or_else(|| PricingError::Geometry("feature has no geometry".to_string()))?;
                collect_polygons(geometry, &mut polygons)?;
            }
            GeoJson::FeatureCollection(collection) => {
                for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
                    if is_polygonal(&geometry.value) {
                        collect_polygons(geometry, &mut polygons)?;
                    }
                }
            }
        }

        if polygons.is_empty() {
            return Err(PricingError::Geometry(
                "no polygon found in GeoJSON".to_string(),
            ));
        }
        Self::new(MultiPolygon::new(polygons))
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn area_square_meters(&self) -> PricingResult<f64> {
        compute_area_square_meters(self)
    }
}

impl FromStr for AreaOfInterest {
    type Err = PricingError;

    /// Parse GeoJSON text
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| PricingError::Geometry(format!("invalid GeoJSON: {e}")))?;
        Self::from_geojson(&geojson)
    }
}

/// Area of the geometry in square meters.
pub fn compute_area_square_meters(area_of_interest: &AreaOfInterest) -> PricingResult<f64> {
    let geometry = area_of_interest.geometry();
    let centroid = geometry
        .centroid()
        .ok_or_else(|| PricingError::Geometry("empty or degenerate geometry".to_string()))?;

    let projection = LocalEqualArea::centered_on(centroid.x(), centroid.y());
    let projected = geometry.map_coords(|c| projection.project(c));
    let area = projected.unsigned_area();

    debug!(
        centroid_lon = centroid.x(),
        centroid_lat = centroid.y(),
        polygons = geometry.0.len(),
        area_m2 = area,
        "Measured area of interest"
    );

    if !area.is_finite() || area <= 0.0 {
        return Err(PricingError::Geometry(
            "empty or degenerate geometry".to_string(),
        ));
    }
    Ok(area)
}

/// Albers equal-area conic on the WGS84 ellipsoid (Snyder, ch. 14).
///
/// When the standard parallels straddle the equator symmetrically the cone
/// constant is zero and the projection is replaced by its limit, the
/// cylindrical equal-area projection.
#[derive(Debug, Clone, Copy)]
struct LocalEqualArea {
    central_meridian_deg: f64,
    eccentricity: f64,
    surface: Surface,
}

#[derive(Debug, Clone, Copy)]
enum Surface {
    /// `s0 = sqrt(c - n * q0)`, so that `rho0 = a * s0 / n`
    Conic { n: f64, c: f64, q0: f64, s0: f64 },
    Cylindrical { k0: f64 },
}

impl LocalEqualArea {
    fn centered_on(lon_deg: f64, lat_deg: f64) -> Self {
        let eccentricity = (WGS84_FLATTENING * (2.0 - WGS84_FLATTENING)).sqrt();
        let lat1 = (lat_deg - STANDARD_PARALLEL_OFFSET_DEG)
            .clamp(-MAX_PARALLEL_DEG, MAX_PARALLEL_DEG)
            .to_radians();
        let lat2 = (lat_deg + STANDARD_PARALLEL_OFFSET_DEG)
            .clamp(-MAX_PARALLEL_DEG, MAX_PARALLEL_DEG)
            .to_radians();
        let lat0 = lat_deg.to_radians();

        let m1 = m(lat1, eccentricity);
        let m2 = m(lat2, eccentricity);
        let q0 = q(lat0, eccentricity);
        let q1 = q(lat1, eccentricity);
        let q2 = q(lat2, eccentricity);

        let n = if (lat1 - lat2).abs() < f64::EPSILON {
            lat1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };

        let surface = if n.abs() < CONE_EPSILON {
            Surface::Cylindrical { k0: m1 }
        } else {
            let c = m1 * m1 + n * q1;
            let s0 = (c - n * q0).max(0.0).sqrt();
            Surface::Conic { n, c, q0, s0 }
        };

        Self {
            central_meridian_deg: lon_deg,
            eccentricity,
            surface,
        }
    }

    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let dlon = (coord.x - self.central_meridian_deg).to_radians();
        let q = q(coord.y.to_radians(), self.eccentricity);

        match self.surface {
            Surface::Conic { n, c, q0, s0 } => {
                let s = (c - n * q).max(0.0).sqrt();
                let rho = WGS84_SEMI_MAJOR_AXIS * s / n;
                let theta = n * dlon;
                let half = (theta / 2.0).sin();
                // rho0 - rho * cos(theta), rearranged so no two ~a/n terms
                // are subtracted when the cone is nearly flat
                Coord {
                    x: rho * theta.sin(),
                    y: WGS84_SEMI_MAJOR_AXIS * (q - q0) / (s0 + s) + 2.0 * rho * half * half,
                }
            }
            Surface::Cylindrical { k0 } => Coord {
                x: WGS84_SEMI_MAJOR_AXIS * k0 * dlon,
                y: WGS84_SEMI_MAJOR_AXIS * q / (2.0 * k0),
            },
        }
    }
}

fn m(lat: f64, e: f64) -> f64 {
    let sin = lat.sin();
    lat.cos() / (1.0 - e * e * sin * sin).sqrt()
}

fn q(lat: f64, e: f64) -> f64 {
    let sin = lat.sin();
    let e_sin = e * sin;
    (1.0 - e * e)
        * (sin / (1.0 - e_sin * e_sin) - (1.0 / (2.0 * e)) * ((1.0 - e_sin) / (1.0 + e_sin)).ln())
}

fn is_polygonal(value: &Value) -> bool {
    match value {
        Value::Polygon(_) | Value::MultiPolygon(_) => true,
        Value::GeometryCollection(geometries) => geometries.iter().any(|g| is_polygonal(&g.value)),
        _ => false,
    }
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon<f64>>) -> PricingResult<()> {
    match &geometry.value {
        Value::Polygon(rings) => out.push(polygon_from_rings(rings)?),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(polygon_from_rings(rings)?);
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries.iter().filter(|g| is_polygonal(&g.value)) {
                collect_polygons(geometry, out)?;
            }
        }
        _ => {
            return Err(PricingError::Geometry(
                "only Polygon and MultiPolygon geometries describe an area".to_string(),
            ));
        }
    }
    Ok(())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> PricingResult<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| PricingError::Geometry("polygon has no rings".to_string()))?;

    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<PricingResult<Vec<_>>>()?;
    Ok(Polygon::new(ring_from_positions(exterior)?, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> PricingResult<LineString<f64>> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok(Coord { x: *lon, y: *lat }),
            _ => Err(PricingError::Geometry(
                "position needs a longitude and a latitude".to_string(),
            )),
        })
        .collect::<PricingResult<Vec<_>>>()
        .map(LineString::new)
}

fn validate_geometry(geometry: &MultiPolygon<f64>) -> PricingResult<()> {
    if geometry.0.is_empty() {
        return Err(PricingError::Geometry(
            "empty or degenerate geometry".to_string(),
        ));
    }

    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            validate_ring(ring)?;
        }

        if !polygon.interiors().is_empty() {
            let shell = Polygon::new(polygon.exterior().clone(), vec![]);
            if !polygon.interiors().iter().all(|hole| shell.contains(hole)) {
                return Err(PricingError::Geometry(
                    "hole lies outside its exterior ring".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_ring(ring: &LineString<f64>) -> PricingResult<()> {
    for coord in ring.coords() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(PricingError::Geometry(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&coord.x) || !(-90.0..=90.0).contains(&coord.y) {
            return Err(PricingError::Geometry(format!(
                "coordinate ({}, {}) is outside longitude/latitude range",
                coord.x, coord.y
            )));
        }
    }

    let vertices = distinct_vertices(ring);
    if vertices.len() < 3 {
        return Err(PricingError::Geometry(
            "empty or degenerate geometry".to_string(),
        ));
    }
    if is_self_intersecting(&vertices) {
        return Err(PricingError::Geometry(
            "ring intersects itself".to_string(),
        ));
    }
    if shoelace(&vertices) == 0.0 {
        return Err(PricingError::Geometry(
            "empty or degenerate geometry".to_string(),
        ));
    }
    Ok(())
}

/// Ring vertices without consecutive duplicates and without the closing point
fn distinct_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for coord in ring.coords() {
        if vertices.last() != Some(coord) {
            vertices.push(*coord);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Twice the signed planar area of a closed vertex loop
fn shoelace(vertices: &[Coord<f64>]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Ring edge tagged with its position, so neighbours can be told apart
#[derive(Debug, Clone, Copy)]
struct RingEdge {
    index: usize,
    line: Line<f64>,
}

impl Cross for RingEdge {
    type Scalar = f64;

    fn line(&self) -> LineOrPoint<f64> {
        self.line.into()
    }
}

/// Sweep-line check for edges that touch or cross anywhere other than the
/// vertex shared by neighbouring edges.
fn is_self_intersecting(vertices: &[Coord<f64>]) -> bool {
    let n = vertices.len();
    let edges = (0..n).map(|index| RingEdge {
        index,
        line: Line::new(vertices[index], vertices[(index + 1) % n]),
    });

    Intersections::<_>::from_iter(edges).any(|(a, b, intersection)| {
        let gap = a.index.abs_diff(b.index);
        let neighbours = gap == 1 || gap == n - 1;
        !neighbours || matches!(intersection, LineIntersection::Collinear { .. })
    })
}
