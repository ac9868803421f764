use crate::models::coordinate::Coordinate;

/// Decodes a Google encoded polyline (precision 1e-5) into coordinates.
/// Malformed trailing input ends the decode early rather than erroring; the
/// directions service is external and a truncated overlay beats none.
pub fn decode(encoded: &str) -> Vec<Coordinate> {
    let mut coordinates = Vec::new();
    let mut bytes = encoded.bytes();
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    loop {
        let Some(delta_lat) = next_varint(&mut bytes) else {
            break;
        };
        let Some(delta_lng) = next_varint(&mut bytes) else {
            break;
        };

        lat += delta_lat;
        lng += delta_lng;

        if let Some(coord) = Coordinate::new(lat as f64 * 1e-5, lng as f64 * 1e-5) {
            coordinates.push(coord);
        }
    }

    coordinates
}

fn next_varint(bytes: &mut impl Iterator<Item = u8>) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0u32;

    loop {
        let byte = bytes.next()?.checked_sub(63)? as i64;
        result |= (byte & 0x1f) << shift;
        shift += 5;

        if byte < 0x20 {
            break;
        }
    }

    // Zigzag: lowest bit carries the sign.
    if result & 1 != 0 {
        Some(!(result >> 1))
    } else {
        Some(result >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn decodes_reference_polyline() {
        // Worked example from the encoded polyline format documentation.
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@");

        assert_eq!(points.len(), 3);
        assert!((points[0].latitude - 38.5).abs() < 1e-5);
        assert!((points[0].longitude - -120.2).abs() < 1e-5);
        assert!((points[1].latitude - 40.7).abs() < 1e-5);
        assert!((points[2].longitude - -126.453).abs() < 1e-5);
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        assert!(decode("").is_empty());
    }

    #[test]
    fn truncated_input_keeps_complete_points() {
        let full = decode("_p~iF~ps|U_ulLnnqC");
        assert_eq!(full.len(), 2);

        // Drop the tail mid-point; the first pair must survive.
        let truncated = decode("_p~iF~ps|U_ulL");
        assert_eq!(truncated.len(), 1);
    }
}
