use super::frequency::{Frequency, FrequencyUnit};
use crate::engine::errors::ReduceError;

#[test]
fn parses_pandas_style_aliases() {
    assert_eq!(
        Frequency::parse("1T").unwrap(),
        Frequency::new(1, FrequencyUnit::Minute)
    );
    assert_eq!(
        Frequency::parse("15min").unwrap(),
        Frequency::new(15, FrequencyUnit::Minute)
    );
    assert_eq!(
        Frequency::parse("30S").unwrap(),
        Frequency::new(30, FrequencyUnit::Second)
    );
    assert_eq!(
        Frequency::parse("2H").unwrap(),
        Frequency::new(2, FrequencyUnit::Hour)
    );
    assert_eq!(
        Frequency::parse("1D").unwrap(),
        Frequency::new(1, FrequencyUnit::Day)
    );
}

#[test]
fn accepts_spelled_out_units_and_whitespace() {
    assert_eq!(
        Frequency::parse(" 2 hours ").unwrap(),
        Frequency::new(2, FrequencyUnit::Hour)
    );
    assert_eq!(
        Frequency::parse("10 seconds").unwrap(),
        Frequency::new(10, FrequencyUnit::Second)
    );
}

#[test]
fn magnitude_defaults_to_one() {
    assert_eq!(
        Frequency::parse("T").unwrap(),
        Frequency::new(1, FrequencyUnit::Minute)
    );
    assert_eq!(
        Frequency::parse("h").unwrap().width_millis(),
        3_600_000
    );
}

#[test]
fn rejects_zero_unknown_and_empty() {
    for bad in ["0T", "5x", "", "min5", "-1T", "1.5H"] {
        assert_eq!(
            Frequency::parse(bad),
            Err(ReduceError::InvalidFrequency(bad.to_string())),
            "input {bad:?}"
        );
    }
}

#[test]
fn width_and_display() {
    let freq: Frequency = "15min".parse().unwrap();
    assert_eq!(freq.width_millis(), 900_000);
    assert_eq!(freq.to_string(), "15min");
    assert_eq!(Frequency::default().to_string(), "1min");
}
