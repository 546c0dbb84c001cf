pub mod geo;

/// Rounds to one decimal place, the precision used in records and alerts.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[test]
fn test_round1() {
    assert_eq!(round1(12.34), 12.3);
    assert_eq!(round1(12.36), 12.4);
    assert_eq!(round1(0.0), 0.0);
}
