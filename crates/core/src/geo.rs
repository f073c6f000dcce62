//! Coordinates, street locations and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Radius of the "stores near me" query, in meters.
pub const NEARBY_RADIUS_M: f64 = 10_000.0;

/// Maximum number of stores returned by the nearby query.
pub const NEARBY_LIMIT: usize = 10;

/// Which half of a coordinate pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Longitude => "longitude",
            Self::Latitude => "latitude",
        })
    }
}

/// Errors for malformed coordinates.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("{0} is required")]
    Missing(Axis),
    #[error("{axis} must be a number, got {input:?}")]
    NotANumber { axis: Axis, input: String },
    #[error("{axis} {value} is out of range")]
    OutOfRange { axis: Axis, value: f64 },
}

/// A WGS84 point stored as `(longitude, latitude)`, matching `GeoJSON`
/// coordinate order.
///
/// Serializes as a two-element `[lng, lat]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", try_from = "[f64; 2]")]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::OutOfRange`] if longitude is outside [-180, 180]
    /// or latitude outside [-90, 90].
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::OutOfRange {
                axis: Axis::Longitude,
                value: lng,
            });
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::OutOfRange {
                axis: Axis::Latitude,
                value: lat,
            });
        }
        Ok(Self { lng, lat })
    }

    /// Parse a point from raw query/form strings.
    ///
    /// # Errors
    ///
    /// Returns a [`GeoError`] for missing, non-numeric or out-of-range input.
    pub fn parse(lng: Option<&str>, lat: Option<&str>) -> Result<Self, GeoError> {
        let lng = parse_axis(lng, Axis::Longitude)?;
        let lat = parse_axis(lat, Axis::Latitude)?;
        Self::new(lng, lat)
    }

    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Haversine distance to `other`, in meters.
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lng, p.lat]
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = GeoError;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lng, lat)
    }
}

fn parse_axis(raw: Option<&str>, axis: Axis) -> Result<f64, GeoError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(GeoError::Missing(axis))?;
    raw.parse::<f64>().map_err(|_| GeoError::NotANumber {
        axis,
        input: raw.to_owned(),
    })
}

/// A store's street address and its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: GeoPoint,
    pub address: String,
}

/// Items within `radius_m` of `center`, nearest first, at most `limit`.
///
/// Each result carries its distance in meters. Equal distances keep input
/// order.
pub fn nearest_within<T, F>(
    items: impl IntoIterator<Item = T>,
    center: &GeoPoint,
    radius_m: f64,
    limit: usize,
    point_of: F,
) -> Vec<(T, f64)>
where
    F: Fn(&T) -> GeoPoint,
{
    let mut hits: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let d = center.distance_m(&point_of(&item));
            (d <= radius_m).then_some((item, d))
        })
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Point `meters` due north of `origin`.
    fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
        let d_lat = (meters / EARTH_RADIUS_M).to_degrees();
        GeoPoint::new(origin.lng(), origin.lat() + d_lat).unwrap()
    }

    #[test]
    fn test_parse_rejects_bad_input_before_range_checks() {
        assert_eq!(
            GeoPoint::parse(None, Some("43.6")),
            Err(GeoError::Missing(Axis::Longitude))
        );
        assert!(matches!(
            GeoPoint::parse(Some("-79.4"), Some("north")),
            Err(GeoError::NotANumber {
                axis: Axis::Latitude,
                ..
            })
        ));
        assert!(matches!(
            GeoPoint::parse(Some("NaN"), Some("1")),
            Err(GeoError::OutOfRange { .. })
        ));
        assert!(matches!(
            GeoPoint::parse(Some("200"), Some("1")),
            Err(GeoError::OutOfRange {
                axis: Axis::Longitude,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_accepts_padded_numbers() {
        let p = GeoPoint::parse(Some(" -79.38 "), Some("43.65")).unwrap();
        assert!((p.lng() + 79.38).abs() < f64::EPSILON);
        assert!((p.lat() - 43.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        let d = a.distance_m(&b);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn test_nearest_within_radius_keeps_only_close_store() {
        let center = GeoPoint::new(-79.3832, 43.6532).unwrap();
        let stores = vec![
            ("far", north_of(center, 15_000.0)),
            ("near", north_of(center, 1_000.0)),
        ];

        let hits = nearest_within(stores, &center, NEARBY_RADIUS_M, NEARBY_LIMIT, |s| s.1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.0, "near");
        assert!((hits[0].1 - 1_000.0).abs() < 1.0);
    }

    #[test]
    fn test_nearest_within_orders_and_limits() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let stores: Vec<(usize, GeoPoint)> = (0..15)
            .rev()
            .map(|i| (i, north_of(center, 100.0 * (i as f64 + 1.0))))
            .collect();

        let hits = nearest_within(stores, &center, NEARBY_RADIUS_M, NEARBY_LIMIT, |s| s.1);
        let order: Vec<usize> = hits.iter().map(|(s, _)| s.0).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_geo_point_serializes_as_lng_lat_pair() {
        let p = GeoPoint::new(-79.5, 43.5).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "[-79.5,43.5]");
        let back: GeoPoint = serde_json::from_str("[-79.5,43.5]").unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<GeoPoint>("[500.0,0.0]").is_err());
    }
}
