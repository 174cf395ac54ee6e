//! Conversion between Unix-epoch microseconds and the wire's day-fraction
//! double (days since 1899-12-30, the OLE Automation date epoch the Console
//! reader expects).

const MICROS_PER_DAY: i64 = 86_400_000_000;
const OLE_EPOCH_OFFSET_DAYS: f64 = 25569.0;

/// Encodes microseconds since the Unix epoch (UTC) as the `f64` the wire
/// format carries. See §4.5 and the open question in §9: the source
/// (and this port) records timestamps as UTC microseconds and applies this
/// fixed epoch shift; no local-timezone adjustment is performed here.
#[must_use]
pub fn encode_timestamp(micros_since_epoch: i64) -> f64 {
    let days_value = micros_since_epoch.div_euclid(MICROS_PER_DAY) as f64 + OLE_EPOCH_OFFSET_DAYS;
    let fraction_value =
        micros_since_epoch.rem_euclid(MICROS_PER_DAY) as f64 / MICROS_PER_DAY as f64;
    days_value + fraction_value
}

/// Inverse of [`encode_timestamp`], recovering whole microseconds.
#[must_use]
pub fn decode_timestamp(wire_value: f64) -> i64 {
    let days = (wire_value - OLE_EPOCH_OFFSET_DAYS).floor();
    let fraction = wire_value - OLE_EPOCH_OFFSET_DAYS - days;
    (days * MICROS_PER_DAY as f64).round() as i64 + (fraction * MICROS_PER_DAY as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_encodes_to_25569() {
        assert!((encode_timestamp(0) - 25569.0).abs() < 1e-9);
    }

    #[test]
    fn one_day_later_encodes_to_25570() {
        assert!((encode_timestamp(86_400_000_000) - 25570.0).abs() < 1e-9);
    }

    #[test]
    fn round_trips_whole_microseconds() {
        for micros in [0_i64, 1, 999_999, 86_400_000_000, 123_456_789_000] {
            let wire = encode_timestamp(micros);
            assert_eq!(decode_timestamp(wire), micros, "micros={micros}");
        }
    }
}
