use serde_json::Value;

use crate::models::coordinate::Coordinate;

/// Extracts a coordinate from the heterogeneous payloads the location channel
/// delivers. Shapes are tried in a fixed priority order and the first one
/// yielding two finite numbers wins:
///
/// 1. flat `{latitude, longitude}`
/// 2. abbreviated `{lat, lng}`
/// 3. nested `{location: {...}}`
/// 4. nested `{coords: {...}}`
///
/// Numeric strings are accepted; anything non-finite or missing counts as no
/// match for that shape.
pub fn normalize_payload(payload: &Value) -> Option<Coordinate> {
    let obj = payload.as_object()?;

    if let Some(coord) = field_pair(payload, "latitude", "longitude") {
        return Some(coord);
    }
    if let Some(coord) = field_pair(payload, "lat", "lng") {
        return Some(coord);
    }
    if let Some(nested) = obj.get("location") {
        if let Some(coord) = nested_pair(nested) {
            return Some(coord);
        }
    }
    if let Some(nested) = obj.get("coords") {
        if let Some(coord) = nested_pair(nested) {
            return Some(coord);
        }
    }

    None
}

fn nested_pair(value: &Value) -> Option<Coordinate> {
    field_pair(value, "latitude", "longitude").or_else(|| field_pair(value, "lat", "lng"))
}

fn field_pair(value: &Value, lat_key: &str, lng_key: &str) -> Option<Coordinate> {
    let lat = coerce_f64(value.get(lat_key)?)?;
    let lng = coerce_f64(value.get(lng_key)?)?;
    Coordinate::new(lat, lng)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::normalize_payload;

    #[test]
    fn flat_shape_wins_over_abbreviated() {
        let payload = json!({
            "latitude": 17.4,
            "longitude": 78.4,
            "lat": 1.0,
            "lng": 2.0
        });

        let coord = normalize_payload(&payload).unwrap();
        assert_eq!(coord.latitude, 17.4);
        assert_eq!(coord.longitude, 78.4);
    }

    #[test]
    fn abbreviated_shape_is_accepted() {
        let payload = json!({ "lat": 17.4, "lng": 78.4 });

        let coord = normalize_payload(&payload).unwrap();
        assert_eq!(coord.latitude, 17.4);
    }

    #[test]
    fn nested_location_before_nested_coords() {
        let payload = json!({
            "location": { "lat": 17.4, "lng": 78.4 },
            "coords": { "lat": 1.0, "lng": 2.0 }
        });

        let coord = normalize_payload(&payload).unwrap();
        assert_eq!(coord.latitude, 17.4);
    }

    #[test]
    fn nested_coords_as_last_resort() {
        let payload = json!({ "coords": { "latitude": 17.4, "longitude": 78.4 } });

        assert!(normalize_payload(&payload).is_some());
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let payload = json!({ "latitude": "17.4", "longitude": "78.4" });

        let coord = normalize_payload(&payload).unwrap();
        assert_eq!(coord.longitude, 78.4);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let payload = json!({ "latitude": "NaN", "longitude": 78.4 });

        assert!(normalize_payload(&payload).is_none());
    }

    #[test]
    fn null_and_empty_payloads_yield_nothing() {
        assert!(normalize_payload(&serde_json::Value::Null).is_none());
        assert!(normalize_payload(&serde_json::json!({})).is_none());
    }
}
