//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

const WGS84_GEOGCS: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Attach an EPSG code to a WKT-defined CRS
    pub fn with_epsg(mut self, code: u32) -> Self {
        self.epsg = Some(code);
        self
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// WGS84 / UTM zone and hemisphere for EPSG 326zz / 327zz
    fn utm_zone(&self) -> Option<(u32, bool)> {
        match self.epsg? {
            code @ 32601..=32660 => Some((code - 32600, true)),
            code @ 32701..=32760 => Some((code - 32700, false)),
            _ => None,
        }
    }

    /// Whether coordinates are angular (degrees), so planar areas are not
    /// in square metres. `None` when it cannot be told.
    pub fn is_geographic(&self) -> Option<bool> {
        if let Some(wkt) = &self.wkt {
            let head = wkt.trim_start().to_ascii_uppercase();
            if head.starts_with("GEOGCS") || head.starts_with("GEOGCRS") {
                return Some(true);
            }
            if head.starts_with("PROJCS") || head.starts_with("PROJCRS") {
                return Some(false);
            }
        }
        match self.epsg? {
            4326 | 4269 | 4258 | 4674 => Some(true),
            _ if self.utm_zone().is_some() => Some(false),
            _ => None,
        }
    }

    /// ESRI-flavoured WKT suitable for a shapefile `.prj`.
    ///
    /// Uses the stored WKT when present, otherwise generates it for WGS84
    /// and the WGS84 / UTM zones.
    pub fn prj_wkt(&self) -> Option<String> {
        if let Some(wkt) = &self.wkt {
            return Some(wkt.clone());
        }
        if self.epsg == Some(4326) {
            return Some(WGS84_GEOGCS.to_string());
        }
        let (zone, north) = self.utm_zone()?;
        let hemisphere = if north { 'N' } else { 'S' };
        let false_northing = if north { 0.0 } else { 10_000_000.0 };
        let central_meridian = -183.0 + 6.0 * zone as f64;
        Some(format!(
            "PROJCS[\"WGS_1984_UTM_Zone_{zone}{hemisphere}\",{WGS84_GEOGCS},\
PROJECTION[\"Transverse_Mercator\"],PARAMETER[\"False_Easting\",500000.0],\
PARAMETER[\"False_Northing\",{false_northing:.1}],\
PARAMETER[\"Central_Meridian\",{central_meridian:.1}],\
PARAMETER[\"Scale_Factor\",0.9996],PARAMETER[\"Latitude_Of_Origin\",0.0],\
UNIT[\"Meter\",1.0]]"
        ))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            // Return first 50 chars of WKT
            let cut = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..cut]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32719);
        assert_eq!(crs.epsg(), Some(32719));
        assert_eq!(crs.identifier(), "EPSG:32719");
    }

    #[test]
    fn test_is_geographic() {
        assert_eq!(CRS::wgs84().is_geographic(), Some(true));
        assert_eq!(CRS::from_epsg(32719).is_geographic(), Some(false));
        assert_eq!(CRS::from_wkt("PROJCS[\"x\"]").is_geographic(), Some(false));
        assert_eq!(CRS::from_wkt("GEOGCRS[\"x\"]").is_geographic(), Some(true));
        assert_eq!(CRS::from_epsg(2154).is_geographic(), None);
    }

    #[test]
    fn test_utm_prj() {
        let prj = CRS::from_epsg(32719).prj_wkt().unwrap();
        assert!(prj.starts_with("PROJCS[\"WGS_1984_UTM_Zone_19S\""));
        assert!(prj.contains("PARAMETER[\"Central_Meridian\",-69.0]"));
        assert!(prj.contains("PARAMETER[\"False_Northing\",10000000.0]"));
        assert!(CRS::from_epsg(2154).prj_wkt().is_none());
    }
}
