/// Converts an engine duration string to milliseconds.
///
/// Accepts single values such as `4.573ms`, `2s`, `1.5µs`, `1500ns` as well as
/// composite forms such as `1m2.5s` or `1h0m3s`. Anything that does not parse
/// becomes `0.0`.
pub fn normalize_to_ms(raw: &str) -> f64 {
    parse_segments(raw.trim()).unwrap_or(0.0)
}

fn parse_segments(input: &str) -> Option<f64> {
    if input.is_empty() {
        return None;
    }
    if input == "0" {
        return Some(0.0);
    }

    let mut total = 0.0;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        total += to_millis(value, unit)?;
    }
    Some(total)
}

// Sub-millisecond units divide so that exact decimal inputs stay exact.
fn to_millis(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "ms" => Some(value),
        "µs" | "μs" | "us" | "µ" | "μ" | "u" => Some(value / 1_000.0),
        "ns" => Some(value / 1_000_000.0),
        "s" => Some(value * 1_000.0),
        "m" => Some(value * 60_000.0),
        "h" => Some(value * 3_600_000.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4.573ms", 4.573)]
    #[case("2s", 2000.0)]
    #[case("1500ns", 0.0015)]
    #[case("1.5µs", 0.0015)]
    #[case("250us", 0.25)]
    #[case("1m2.5s", 62500.0)]
    #[case("1h0m3s", 3_603_000.0)]
    #[case(" 12ms ", 12.0)]
    #[case("0", 0.0)]
    #[case("0s", 0.0)]
    fn test_normalize_to_ms(#[case] raw: &str, #[case] expected: f64) {
        assert!(
            (normalize_to_ms(raw) - expected).abs() < 1e-9,
            "{raw} -> {}",
            normalize_to_ms(raw)
        );
    }

    #[test]
    fn test_exact_values() {
        assert_eq!(normalize_to_ms("4.573ms"), 4.573);
        assert_eq!(normalize_to_ms("2s"), 2000.0);
        assert_eq!(normalize_to_ms("1500ns"), 0.0015);
    }

    #[rstest]
    #[case("")]
    #[case("fast")]
    #[case("12")]
    #[case("12 parsecs")]
    #[case("ms")]
    #[case("1.2.3ms")]
    fn test_invalid_is_zero(#[case] raw: &str) {
        assert_eq!(normalize_to_ms(raw), 0.0);
    }
}
