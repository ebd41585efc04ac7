//! Textual raster properties and locale-aware decimal parsing
//!
//! Raster summaries are reported as text formatted with the decimal
//! separator of the active numeric locale. Consumers must normalize the
//! separator before parsing, which is what [`parse_decimal`] does.

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal separator convention used when formatting numbers as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericLocale {
    /// `0.412`
    #[default]
    Dot,
    /// `0,412`
    Comma,
}

/// Languages whose numeric convention uses a decimal comma
const COMMA_LANGUAGES: &[&str] = &[
    "es", "pt", "fr", "de", "it", "nl", "ru", "pl", "cs", "sv", "da", "fi", "nb", "tr",
];

impl NumericLocale {
    /// Detect the convention from `LC_ALL`, `LC_NUMERIC` and `LANG`, in
    /// POSIX precedence order. Unset or `C`/`POSIX` locales use a dot.
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_NUMERIC", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty())
            .map(|value| Self::from_locale_name(&value))
            .unwrap_or_default()
    }

    /// Classify a locale name such as `es_CL.UTF-8`
    pub fn from_locale_name(name: &str) -> Self {
        let language = name
            .split(['_', '.', '@', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if COMMA_LANGUAGES.contains(&language.as_str()) {
            NumericLocale::Comma
        } else {
            NumericLocale::Dot
        }
    }

    /// The decimal separator character
    pub fn separator(self) -> char {
        match self {
            NumericLocale::Dot => '.',
            NumericLocale::Comma => ',',
        }
    }

    /// Format a value with this locale's separator
    pub fn format(self, value: f64) -> String {
        let text = value.to_string();
        match self {
            NumericLocale::Dot => text,
            NumericLocale::Comma => text.replace('.', ","),
        }
    }
}

impl FromStr for NumericLocale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "." => Ok(NumericLocale::Dot),
            "comma" | "," => Ok(NumericLocale::Comma),
            other => Err(Error::InvalidParameter {
                name: "numeric_locale",
                value: other.to_string(),
                reason: "expected 'dot' or 'comma'".into(),
            }),
        }
    }
}

/// Summary properties a raster can report as text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterProperty {
    Minimum,
    Maximum,
    Mean,
    CellSize,
    RowCount,
    ColumnCount,
}

impl fmt::Display for RasterProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RasterProperty::Minimum => "MINIMUM",
            RasterProperty::Maximum => "MAXIMUM",
            RasterProperty::Mean => "MEAN",
            RasterProperty::CellSize => "CELLSIZEX",
            RasterProperty::RowCount => "ROWCOUNT",
            RasterProperty::ColumnCount => "COLUMNCOUNT",
        };
        f.write_str(name)
    }
}

impl<T: RasterElement> Raster<T> {
    /// Report a summary property as text in the given numeric locale.
    ///
    /// Statistics are computed over valid cells only; a raster without any
    /// valid cell has no minimum, maximum or mean.
    pub fn property_text(&self, property: RasterProperty, locale: NumericLocale) -> Result<String> {
        let value = match property {
            RasterProperty::RowCount => return Ok(self.rows().to_string()),
            RasterProperty::ColumnCount => return Ok(self.cols().to_string()),
            RasterProperty::CellSize => self.cell_size(),
            RasterProperty::Minimum | RasterProperty::Maximum | RasterProperty::Mean => {
                let stats = self.statistics();
                let value = match property {
                    RasterProperty::Minimum => stats.min.and_then(|v| v.to_f64()),
                    RasterProperty::Maximum => stats.max.and_then(|v| v.to_f64()),
                    _ => stats.mean,
                };
                value.ok_or(Error::EmptyStatistics)?
            }
        };
        Ok(locale.format(value))
    }
}

/// Parse a decimal number written with either `.` or `,` as separator.
///
/// Surrounding whitespace is ignored. Thousands separators are not
/// supported.
pub fn parse_decimal(text: &str) -> Result<f64> {
    let normalized = text.trim().replace(',', ".");
    normalized.parse::<f64>().map_err(|_| Error::ParseNumber {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_decimal_both_separators() {
        assert_relative_eq!(parse_decimal("0,412").unwrap(), 0.412);
        assert_relative_eq!(parse_decimal("0.412").unwrap(), 0.412);
        assert_relative_eq!(parse_decimal(" -0,05 ").unwrap(), -0.05);
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("").is_err());
    }

    #[test]
    fn test_locale_names() {
        assert_eq!(NumericLocale::from_locale_name("es_CL.UTF-8"), NumericLocale::Comma);
        assert_eq!(NumericLocale::from_locale_name("de_DE"), NumericLocale::Comma);
        assert_eq!(NumericLocale::from_locale_name("en_US.UTF-8"), NumericLocale::Dot);
        assert_eq!(NumericLocale::from_locale_name("C"), NumericLocale::Dot);
        assert_eq!(NumericLocale::from_locale_name("POSIX"), NumericLocale::Dot);
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("comma".parse::<NumericLocale>().unwrap(), NumericLocale::Comma);
        assert_eq!("DOT".parse::<NumericLocale>().unwrap(), NumericLocale::Dot);
        assert!("semicolon".parse::<NumericLocale>().is_err());
    }

    #[test]
    fn test_property_text_comma_locale() {
        let raster = Raster::from_vec(vec![0.25, 0.5, 0.75, f64::NAN], 2, 2).unwrap();

        let min = raster
            .property_text(RasterProperty::Minimum, NumericLocale::Comma)
            .unwrap();
        assert_eq!(min, "0,25");
        let mean = raster
            .property_text(RasterProperty::Mean, NumericLocale::Dot)
            .unwrap();
        assert_eq!(mean, "0.5");
        assert_relative_eq!(parse_decimal(&min).unwrap(), 0.25);

        let rows = raster
            .property_text(RasterProperty::RowCount, NumericLocale::Comma)
            .unwrap();
        assert_eq!(rows, "2");
    }

    #[test]
    fn test_property_text_empty_raster() {
        let raster: Raster<f64> = Raster::filled(2, 2, f64::NAN);
        assert!(matches!(
            raster.property_text(RasterProperty::Maximum, NumericLocale::Dot),
            Err(Error::EmptyStatistics)
        ));
    }
}
