//! Location model: coordinates, optional areas and the points sampled to cover them

use serde::{Deserialize, Serialize};

/// Mean earth radius used for great-circle geometry, in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of points placed on the ring of a circular area
const RING_POINTS: usize = 8;

/// Maximum number of polygon vertices sampled in addition to the centroid
const MAX_POLYGON_VERTICES: usize = 12;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees (-90..=90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180..=180)
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside their valid ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format coordinate as "lat, lon" string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates to a fixed number of decimals
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Great-circle distance to another coordinate in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Kilometers,
        )
    }

    /// Point reached by travelling `distance_km` along the given bearing
    #[must_use]
    pub fn destination(&self, bearing_deg: f64, distance_km: f64) -> Coordinate {
        let angular = distance_km / EARTH_RADIUS_KM;
        let bearing = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        let mut longitude = lon2.to_degrees();
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }

        Coordinate {
            latitude: lat2.to_degrees().clamp(-90.0, 90.0),
            longitude,
        }
    }
}

/// Area averaged over instead of a single point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AreaSpec {
    /// Circle of the given radius around the target coordinate
    Radius { radius_km: f64 },
    /// Closed polygon with at least three vertices
    Polygon { vertices: Vec<Coordinate> },
}

/// What an analysis is run for: a coordinate plus an optional area around it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Target {
    pub center: Coordinate,
    pub area: Option<AreaSpec>,
}

impl Target {
    /// Target for a single point
    #[must_use]
    pub fn point(center: Coordinate) -> Self {
        Self { center, area: None }
    }

    /// Target for a circle around `center`
    #[must_use]
    pub fn circle(center: Coordinate, radius_km: f64) -> Self {
        Self {
            center,
            area: Some(AreaSpec::Radius { radius_km }),
        }
    }

    /// Target for a polygon; the center is the vertex mean
    #[must_use]
    pub fn polygon(vertices: Vec<Coordinate>) -> Self {
        Self {
            center: centroid(&vertices),
            area: Some(AreaSpec::Polygon { vertices }),
        }
    }

    /// Representative points sampled for this target.
    ///
    /// A point target yields only its center. A circle yields the center and
    /// a ring of points at the radius; a polygon yields its centroid and (up
    /// to a fixed number of) its vertices.
    #[must_use]
    pub fn sample_points(&self) -> Vec<Coordinate> {
        match &self.area {
            None => vec![self.center],
            Some(AreaSpec::Radius { radius_km }) if *radius_km <= 0.0 => vec![self.center],
            Some(AreaSpec::Radius { radius_km }) => {
                let step = 360.0 / RING_POINTS as f64;
                std::iter::once(self.center)
                    .chain((0..RING_POINTS).map(|i| self.center.destination(step * i as f64, *radius_km)))
                    .collect()
            }
            Some(AreaSpec::Polygon { vertices }) => {
                let mut points = vec![centroid(vertices)];
                points.extend(subsample(vertices, MAX_POLYGON_VERTICES));
                points
            }
        }
    }

    /// Largest distance from the center to any sampled point, in kilometers
    #[must_use]
    pub fn extent_km(&self) -> f64 {
        self.sample_points()
            .iter()
            .map(|p| self.center.distance_km(p))
            .fold(0.0, f64::max)
    }
}

fn centroid(vertices: &[Coordinate]) -> Coordinate {
    if vertices.is_empty() {
        return Coordinate::new(0.0, 0.0);
    }
    let n = vertices.len() as f64;
    let latitude = vertices.iter().map(|v| v.latitude).sum::<f64>() / n;
    let longitude = vertices.iter().map(|v| v.longitude).sum::<f64>() / n;
    Coordinate::new(latitude, longitude)
}

fn subsample(vertices: &[Coordinate], max: usize) -> Vec<Coordinate> {
    if vertices.len() <= max {
        return vertices.to_vec();
    }
    let stride = vertices.len() as f64 / max as f64;
    (0..max)
        .map(|i| vertices[(i as f64 * stride).floor() as usize])
        .collect()
}
