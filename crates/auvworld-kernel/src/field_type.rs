//! Temporal-resolution classes and spatial domain tags.
//!
//! Remote datasets carry both in their identifiers
//! (`cmems_mod_nws_phy-uv_anfc_0.027deg-3D_PT1H-i`); local files only hint
//! at them in attribute text and coordinate spans.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Degrees of slack allowed when deciding a grid spans the whole globe.
pub const GLOBAL_SPAN_TOLERANCE_DEG: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    QuarterHourlyInstantaneous,
    HourlyInstantaneous,
    HourlyMean,
    SixHourlyInstantaneous,
    DailyMean,
    MonthlyMean,
    Unspecified,
}

impl FieldType {
    /// Lower is preferred.
    pub fn rank(self) -> u32 {
        match self {
            Self::QuarterHourlyInstantaneous => 1,
            Self::HourlyInstantaneous => 2,
            Self::HourlyMean => 3,
            Self::SixHourlyInstantaneous => 4,
            Self::DailyMean => 5,
            Self::MonthlyMean => 6,
            Self::Unspecified => 100,
        }
    }

    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Self::QuarterHourlyInstantaneous => Some("PT15M-i"),
            Self::HourlyInstantaneous => Some("PT1H-i"),
            Self::HourlyMean => Some("PT1H-m"),
            Self::SixHourlyInstantaneous => Some("PT6H-i"),
            Self::DailyMean => Some("P1D-m"),
            Self::MonthlyMean => Some("P1M-m"),
            Self::Unspecified => None,
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        [
            Self::QuarterHourlyInstantaneous,
            Self::HourlyInstantaneous,
            Self::HourlyMean,
            Self::SixHourlyInstantaneous,
            Self::DailyMean,
            Self::MonthlyMean,
        ]
        .into_iter()
        .find(|field_type| field_type.suffix() == Some(suffix))
    }

    /// The better (lower-rank) of two field types.
    pub fn best(self, other: Self) -> Self {
        if other.rank() < self.rank() { other } else { self }
    }

    /// Guess a field type from free attribute text (titles, resolution tags).
    pub fn infer_from_text(text: &str) -> Self {
        field_type_patterns()
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, field_type)| *field_type)
            .unwrap_or(Self::Unspecified)
    }
}

fn field_type_patterns() -> &'static [(Regex, FieldType)] {
    static PATTERNS: OnceLock<Vec<(Regex, FieldType)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)\bPT15M\b|15[- ]?min", FieldType::QuarterHourlyInstantaneous),
            (r"(?i)\bPT6H\b|6[- ]?hour", FieldType::SixHourlyInstantaneous),
            (
                r"(?i)(\bPT1H\b|hourly).*\bmean\b|\bmean\b.*(\bPT1H\b|hourly)",
                FieldType::HourlyMean,
            ),
            (r"(?i)\bPT1H\b|hourly", FieldType::HourlyInstantaneous),
            (r"(?i)\bP1D\b|daily", FieldType::DailyMean),
            (r"(?i)\bP1M\b|monthly", FieldType::MonthlyMean),
        ]
        .into_iter()
        .map(|(pattern, field_type)| {
            let regex = Regex::new(pattern).expect("field-type regex must compile");
            (regex, field_type)
        })
        .collect()
    })
}

fn resolution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?(?:deg|km))(?:-.*)?$").expect("resolution regex must compile")
    })
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix() {
            Some(suffix) => f.write_str(suffix),
            None => f.write_str("unspecified"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    Global,
    Regional,
}

impl DomainType {
    pub fn from_area_tag(tag: &str) -> Option<Self> {
        match tag {
            "glo" => Some(Self::Global),
            "arc" | "bal" | "blk" | "ibi" | "med" | "nws" => Some(Self::Regional),
            _ => None,
        }
    }

    /// Global iff the grid spans ~180° of latitude and ~360° of longitude.
    pub fn from_span(lat_span: f64, lon_span: f64) -> Self {
        if lat_span >= 180.0 - GLOBAL_SPAN_TOLERANCE_DEG
            && lon_span >= 360.0 - GLOBAL_SPAN_TOLERANCE_DEG
        {
            Self::Global
        } else {
            Self::Regional
        }
    }
}

/// Tags recovered from a remote dataset identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTags {
    pub field_type: FieldType,
    pub domain: DomainType,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetTagError {
    #[error("dataset id {0:?} does not follow the <org>_<kind>_<area>_..._<field type> layout")]
    Layout(String),
    #[error("dataset id {id:?} has unrecognized area tag {tag:?}")]
    Area { id: String, tag: String },
    #[error("dataset id {id:?} has unrecognized field-type tag {tag:?}")]
    FieldType { id: String, tag: String },
}

/// Parse area, resolution and field-type tags from a dataset id.
pub fn parse_dataset_tags(dataset_id: &str) -> Result<DatasetTags, DatasetTagError> {
    let segments: Vec<&str> = dataset_id.split('_').collect();
    if segments.len() < 4 {
        return Err(DatasetTagError::Layout(dataset_id.to_string()));
    }
    let area = segments[2];
    let domain = DomainType::from_area_tag(area).ok_or_else(|| DatasetTagError::Area {
        id: dataset_id.to_string(),
        tag: area.to_string(),
    })?;
    let tail = segments[segments.len() - 1];
    let field_type = FieldType::from_suffix(tail).ok_or_else(|| DatasetTagError::FieldType {
        id: dataset_id.to_string(),
        tag: tail.to_string(),
    })?;
    let resolution = segments[3..segments.len() - 1].iter().find_map(|segment| {
        resolution_re()
            .captures(segment)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    });
    Ok(DatasetTags {
        field_type,
        domain,
        resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_copernicus_style_ids() {
        let tags = parse_dataset_tags("cmems_mod_nws_phy-uv_anfc_0.027deg-3D_PT1H-i")
            .expect("nws id should parse");
        assert_eq!(tags.field_type, FieldType::HourlyInstantaneous);
        assert_eq!(tags.domain, DomainType::Regional);
        assert_eq!(tags.resolution.as_deref(), Some("0.027deg"));

        let tags = parse_dataset_tags("cmems_mod_glo_phy-cur_anfc_0.083deg_P1D-m")
            .expect("glo id should parse");
        assert_eq!(tags.field_type, FieldType::DailyMean);
        assert_eq!(tags.domain, DomainType::Global);
        assert_eq!(tags.resolution.as_deref(), Some("0.083deg"));
    }

    #[test]
    fn rejects_unrecognized_tags() {
        assert!(matches!(
            parse_dataset_tags("cmems_mod_glo_phy_anfc_0.083deg_static"),
            Err(DatasetTagError::FieldType { .. })
        ));
        assert!(matches!(
            parse_dataset_tags("cmems_mod_xyz_phy_anfc_0.083deg_P1D-m"),
            Err(DatasetTagError::Area { .. })
        ));
        assert!(matches!(
            parse_dataset_tags("global-analysis-forecast-phy-001-024"),
            Err(DatasetTagError::Layout(_))
        ));
    }

    #[test]
    fn lower_rank_is_better() {
        assert_eq!(
            FieldType::DailyMean.best(FieldType::HourlyInstantaneous),
            FieldType::HourlyInstantaneous
        );
        assert_eq!(
            FieldType::HourlyMean.best(FieldType::MonthlyMean),
            FieldType::HourlyMean
        );
        assert!(FieldType::Unspecified.rank() > FieldType::MonthlyMean.rank());
    }

    #[test]
    fn infers_field_type_from_attribute_text() {
        assert_eq!(
            FieldType::infer_from_text("Daily mean fields from NWS model"),
            FieldType::DailyMean
        );
        assert_eq!(FieldType::infer_from_text("PT1H"), FieldType::HourlyInstantaneous);
        assert_eq!(
            FieldType::infer_from_text("hourly mean currents"),
            FieldType::HourlyMean
        );
        assert_eq!(
            FieldType::infer_from_text("6-hourly snapshots"),
            FieldType::SixHourlyInstantaneous
        );
        assert_eq!(FieldType::infer_from_text("climatology"), FieldType::Unspecified);
    }

    #[test]
    fn domain_from_span() {
        assert_eq!(DomainType::from_span(179.5, 359.9), DomainType::Global);
        assert_eq!(DomainType::from_span(2.0, 1.0), DomainType::Regional);
        assert_eq!(DomainType::from_span(180.0, 200.0), DomainType::Regional);
    }
}
