//! Time formatting helpers.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render a span of seconds as its two most significant units, dropping a
/// zero second unit: `90` → `1m 30s`, `86400` → `1d`, `0` → `0s`.
pub fn format_duration(secs: u64) -> String {
    let Some(idx) = UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0s".to_string();
    };

    let (major, major_suffix) = UNITS[idx];
    let mut out = format!("{}{}", secs / major, major_suffix);
    if let Some((minor, minor_suffix)) = UNITS.get(idx + 1) {
        let rest = (secs % major) / minor;
        if rest > 0 {
            out.push_str(&format!(" {rest}{minor_suffix}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3_600), "1h");
        assert_eq!(format_duration(86_399), "23h 59m");
        assert_eq!(format_duration(86_400), "1d");
        assert_eq!(format_duration(90_000), "1d 1h");
    }

    proptest! {
        #[test]
        fn at_most_two_parts(secs in any::<u64>()) {
            let s = format_duration(secs);
            prop_assert!(s.chars().next().is_some_and(|c| c.is_ascii_digit()));
            prop_assert!(s.split(' ').count() <= 2);
        }
    }
}
