// Region value object
// Storage paths group events by coarse region derived from the country code.

use serde::{Deserialize, Serialize};

const JAPAN: &[&str] = &["JP"];
const OTHER_ASIA: &[&str] = &["CN", "KR", "IN", "SG", "TH", "MY", "PH", "VN", "ID"];
const EUROPE: &[&str] = &["FR", "DE", "GB", "IT", "ES", "RU", "NL", "SE", "CH", "BE"];
const NORTH_AMERICA: &[&str] = &["US", "CA", "DO", "MX"];
const SOUTH_AMERICA: &[&str] = &["BR", "AR", "CL", "CO", "PE", "VE", "UY", "EC", "BO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Japan")]
    Japan,
    #[serde(rename = "Other Asia")]
    OtherAsia,
    #[serde(rename = "Europe")]
    Europe,
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "South America")]
    SouthAmerica,
    #[serde(rename = "Other")]
    Other,
}

impl Region {
    pub fn from_country_code(code: Option<&str>) -> Self {
        let Some(code) = code.map(|value| value.trim().to_uppercase()) else {
            return Region::Other;
        };
        let code = code.as_str();
        if JAPAN.contains(&code) {
            Region::Japan
        } else if OTHER_ASIA.contains(&code) {
            Region::OtherAsia
        } else if EUROPE.contains(&code) {
            Region::Europe
        } else if NORTH_AMERICA.contains(&code) {
            Region::NorthAmerica
        } else if SOUTH_AMERICA.contains(&code) {
            Region::SouthAmerica
        } else {
            Region::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Japan => "Japan",
            Region::OtherAsia => "Other Asia",
            Region::Europe => "Europe",
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Other => "Other",
        }
    }
}
