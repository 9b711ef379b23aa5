//! Conversion engine
//!
//! Haltech protocol documents describe scaling as small textual formulas
//! ("x / 10", "(x / 10) - 101.3"). These are classified once at load time into
//! a closed set of transforms; the decode path only interprets the tag.
//!
//! The classifier is a pattern match over the known vocabulary, not an
//! expression evaluator. Unrecognised formulas fall back to
//! [`ConversionType::Identity`].

use serde::{Deserialize, Serialize};

use crate::types::UNIT_CELSIUS;

/// Offset to convert Kelvin to Celsius
pub const KELVIN_TO_CELSIUS_OFFSET: f64 = 273.15;

/// Standard atmospheric pressure in kPa
pub const ATMOSPHERIC_PRESSURE_KPA: f64 = 101.325;

/// Scale for 0.1 resolution values (temperatures, pressures)
const SCALE_DIVIDE_BY_10: f64 = 10.0;

/// Scale for 0.001 resolution values
const SCALE_DIVIDE_BY_1000: f64 = 1000.0;

/// Input unit that forces Kelvin-to-Celsius conversion
const UNIT_KELVIN: &str = "K";

/// Numeric transform applied to a raw integer field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    /// "x" - raw value unchanged
    #[default]
    Identity,
    /// "x / 10"
    DivideBy10,
    /// "x / 1000"
    DivideBy1000,
    /// "(x / 10) - 101.3" - absolute to gauge pressure
    GaugePressure,
    /// Kelvin * 10 to Celsius: (x / 10) - 273.15
    KelvinToCelsius,
}

impl ConversionType {
    /// Apply this conversion to a raw value
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            ConversionType::Identity => raw,
            ConversionType::DivideBy10 => raw / SCALE_DIVIDE_BY_10,
            ConversionType::DivideBy1000 => raw / SCALE_DIVIDE_BY_1000,
            ConversionType::GaugePressure => raw / SCALE_DIVIDE_BY_10 - ATMOSPHERIC_PRESSURE_KPA,
            ConversionType::KelvinToCelsius => {
                raw / SCALE_DIVIDE_BY_10 - KELVIN_TO_CELSIUS_OFFSET
            }
        }
    }

    /// Unit emitted for a channel whose definition declares `input_units`
    pub fn output_unit(self, input_units: &str) -> &str {
        match self {
            ConversionType::KelvinToCelsius => UNIT_CELSIUS,
            _ => input_units,
        }
    }
}

impl std::fmt::Display for ConversionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversionType::Identity => "x",
            ConversionType::DivideBy10 => "x / 10",
            ConversionType::DivideBy1000 => "x / 1000",
            ConversionType::GaugePressure => "(x / 10) - 101.325",
            ConversionType::KelvinToCelsius => "(x / 10) - 273.15",
        };
        f.write_str(s)
    }
}

/// Classify a textual conversion formula
pub fn parse_conversion(formula: &str) -> ConversionType {
    let normalized = formula
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    match normalized.as_str() {
        "" | "x" => ConversionType::Identity,
        "x / 10" => ConversionType::DivideBy10,
        "x / 1000" => ConversionType::DivideBy1000,
        // "101.3" also covers "101.325"
        s if s.contains("101.3") => ConversionType::GaugePressure,
        s if s.contains("/ 10") => ConversionType::DivideBy10,
        _ => ConversionType::Identity,
    }
}

/// Apply a conversion to a raw value
pub fn apply_conversion(conversion: ConversionType, raw: f64) -> f64 {
    conversion.apply(raw)
}

/// Resolve the conversion for a channel at load time
///
/// A channel in Kelvin always converts to Celsius, whatever its formula says.
pub fn resolve_conversion(units: &str, formula: &str) -> ConversionType {
    if units == UNIT_KELVIN {
        ConversionType::KelvinToCelsius
    } else {
        parse_conversion(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", ConversionType::Identity)]
    #[case("x", ConversionType::Identity)]
    #[case("  X  ", ConversionType::Identity)]
    #[case("x / 10", ConversionType::DivideBy10)]
    #[case("x  /  10", ConversionType::DivideBy10)]
    #[case("x / 1000", ConversionType::DivideBy1000)]
    #[case("(x / 10) - 101.3", ConversionType::GaugePressure)]
    #[case("(x / 10) - 101.325", ConversionType::GaugePressure)]
    #[case("(x / 10) + 5", ConversionType::DivideBy10)]
    #[case("x * 0.5", ConversionType::Identity)]
    #[case("x / 100", ConversionType::DivideBy10)]
    fn test_parse_conversion(#[case] formula: &str, #[case] expected: ConversionType) {
        assert_eq!(parse_conversion(formula), expected);
    }

    #[test]
    fn test_apply_conversion() {
        assert_eq!(apply_conversion(ConversionType::Identity, 100.0), 100.0);
        assert_eq!(apply_conversion(ConversionType::DivideBy10, 1000.0), 100.0);
        assert_eq!(apply_conversion(ConversionType::DivideBy1000, 1000.0), 1.0);

        // 2013 raw = 201.3 kPa absolute = ~100.0 kPa gauge
        let gauge = apply_conversion(ConversionType::GaugePressure, 2013.0);
        assert!((gauge - 100.0).abs() < 0.1, "gauge = {gauge}");

        // 3632 raw = 363.2 K = 90.05 °C
        let celsius = apply_conversion(ConversionType::KelvinToCelsius, 3632.0);
        assert!((celsius - 90.05).abs() < 1e-9, "celsius = {celsius}");
    }

    #[test]
    fn test_negative_raw_values() {
        assert_eq!(apply_conversion(ConversionType::DivideBy10, -25.0), -2.5);
        assert_eq!(apply_conversion(ConversionType::Identity, -1.0), -1.0);
    }

    #[test]
    fn test_kelvin_override() {
        assert_eq!(resolve_conversion("K", "x"), ConversionType::KelvinToCelsius);
        assert_eq!(
            resolve_conversion("K", "x / 1000"),
            ConversionType::KelvinToCelsius
        );
        assert_eq!(resolve_conversion("kPa", "x / 10"), ConversionType::DivideBy10);
        // Lowercase "k" is not Kelvin
        assert_eq!(resolve_conversion("k", "x"), ConversionType::Identity);
    }

    #[test]
    fn test_output_unit() {
        assert_eq!(ConversionType::KelvinToCelsius.output_unit("K"), "°C");
        assert_eq!(ConversionType::GaugePressure.output_unit("kPa"), "kPa");
        assert_eq!(ConversionType::Identity.output_unit(""), "");
    }

    #[test]
    fn test_display_round_trips_through_classifier() {
        for conv in [
            ConversionType::Identity,
            ConversionType::DivideBy10,
            ConversionType::DivideBy1000,
            ConversionType::GaugePressure,
        ] {
            assert_eq!(parse_conversion(&conv.to_string()), conv);
        }
    }
}
