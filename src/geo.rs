// Coordinate reprojection for the heatmap view.
//
// Accident locations are stored in the Slovene national grid D96/TM
// (EPSG:3794): a transverse Mercator projection on the GRS80 ellipsoid,
// central meridian 15°E, scale 0.9999, false easting 500 000 m, false
// northing -5 000 000 m. D96 is an ETRS89 realization, so geographic
// coordinates out of the inverse projection can be used as WGS84 directly.
//
// The inverse uses the standard series expansion (footpoint latitude from
// the meridian arc, then latitude/longitude from the footpoint), which is
// accurate to well under a metre inside the projection's validity area.
use crate::types::{AccidentRecord, GeoPointRow};
use log::debug;

const A: f64 = 6_378_137.0; // GRS80 semi-major axis, metres
const F: f64 = 1.0 / 298.257_222_101; // GRS80 flattening
const K0: f64 = 0.9999;
const LON0_DEG: f64 = 15.0;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING: f64 = -5_000_000.0;

// Validity envelope for the covered territory. Reprojected points outside
// this box are excluded from spatial output, not treated as errors.
pub const LAT_MIN: f64 = 45.4;
pub const LAT_MAX: f64 = 47.1;
pub const LON_MIN: f64 = 13.3;
pub const LON_MAX: f64 = 16.6;

/// Inverse D96/TM: projected (easting, northing) in metres to geographic
/// (latitude, longitude) in degrees.
pub fn d96tm_to_wgs84(easting: f64, northing: f64) -> (f64, f64) {
    let e2 = F * (2.0 - F);
    let ep2 = e2 / (1.0 - e2);
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let x = easting - FALSE_EASTING;
    // Latitude of origin is the equator, so the meridian arc at the origin
    // is zero and the arc length follows from the northing alone.
    let m = (northing - FALSE_NORTHING) / K0;
    let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();

    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let n1 = A / (1.0 - e2 * sin1 * sin1).sqrt();
    let r1 = A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = LON0_DEG.to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

    (lat.to_degrees(), lon.to_degrees())
}

pub fn in_envelope(lat: f64, lon: f64) -> bool {
    (LAT_MIN..=LAT_MAX).contains(&lat) && (LON_MIN..=LON_MAX).contains(&lon)
}

/// Reproject every located record and keep the points inside the validity
/// envelope. Records without coordinates simply don't contribute.
pub fn heatmap_points(rows: &[&AccidentRecord]) -> Vec<GeoPointRow> {
    let mut points = Vec::new();
    let mut out_of_bounds = 0usize;
    for r in rows {
        let (Some(easting), Some(northing)) = (r.easting, r.northing) else {
            continue;
        };
        let (lat, lon) = d96tm_to_wgs84(easting, northing);
        if in_envelope(lat, lon) {
            points.push(GeoPointRow { lat, lon });
        } else {
            out_of_bounds += 1;
        }
    }
    if out_of_bounds > 0 {
        debug!("{} located rows fell outside the validity envelope", out_of_bounds);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticipantRole, SeatbeltUse};

    // On the central meridian the easting is exactly the false easting and
    // the northing is k0 * meridian-arc + false northing; for 46°N on GRS80
    // the arc is 5 096 086 m, giving a northing of 95 576.3 m.
    #[test]
    fn inverse_projection_recovers_central_meridian_point() {
        let (lat, lon) = d96tm_to_wgs84(500_000.0, 95_576.3);
        assert!((lon - 15.0).abs() < 1e-6, "lon was {}", lon);
        assert!((lat - 46.0).abs() < 1e-4, "lat was {}", lat);
    }

    #[test]
    fn inverse_projection_hits_ljubljana() {
        // Grid coordinates near the Ljubljana ring road.
        let (lat, lon) = d96tm_to_wgs84(462_000.0, 101_000.0);
        assert!((45.95..=46.15).contains(&lat), "lat was {}", lat);
        assert!((14.4..=14.6).contains(&lon), "lon was {}", lon);
    }

    fn located(easting: f64, northing: f64) -> AccidentRecord {
        AccidentRecord {
            accident_id: "1".to_string(),
            year: 2020,
            date: None,
            admin_unit: String::new(),
            road_name: String::new(),
            segment_name: String::new(),
            accident_type: String::new(),
            cause: String::new(),
            role: ParticipantRole::Participant,
            gender: None,
            age: None,
            injury: None,
            seatbelt: SeatbeltUse::Unknown,
            alcohol: 0.0,
            easting: Some(easting),
            northing: Some(northing),
        }
    }

    #[test]
    fn out_of_envelope_points_are_dropped() {
        let inside = located(462_000.0, 101_000.0);
        // A northing far south of the national grid reprojects outside the
        // envelope and must be excluded, not reported as an error.
        let outside = located(462_000.0, -900_000.0);
        let mut missing = located(0.0, 0.0);
        missing.easting = None;
        missing.northing = None;

        let rows = vec![&inside, &outside, &missing];
        let points = heatmap_points(&rows);
        assert_eq!(points.len(), 1);
        assert!(in_envelope(points[0].lat, points[0].lon));
    }
}
