//! Catalog of supported satellite analyses.
//!
//! Each kind names the dataset, bands, reduction and styling the analysis
//! service should use. The computation itself runs remotely.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::AnalysisError;

/// Date window used by collection-based analyses.
const YEAR_2024: DateWindow = DateWindow {
    start: "2024-01-01",
    end: "2024-12-31",
};

/// Dashboard area an analysis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisCategory {
    Environmental,
    Crop,
}

/// A supported analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Deforestation,
    WaterQuality,
    AirQuality,
    LandUse,
    Vegetation,
    Rainfall,
    Temperature,
    Ndvi,
    SoilMoisture,
    CropTemperature,
    Precipitation,
    CropHealth,
}

/// How an image collection is collapsed to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Median,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: &'static str,
    pub end: &'static str,
}

/// Rendering parameters for the computed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Visualization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub palette: &'static [&'static str],
}

/// Everything the analysis service needs to compute a kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSpec {
    pub dataset: &'static str,
    /// `true` for image collections, `false` for single images.
    pub collection: bool,
    pub bands: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<Reducer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateWindow>,
    /// Maximum cloud cover for optical collections, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cloud_percent: Option<u8>,
    /// Band math applied after reduction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<&'static str>,
    pub visualization: Visualization,
}

const WATER_PALETTE: &[&str] = &["white", "lightblue", "blue", "darkblue"];
const RAIN_PALETTE: &[&str] = &["white", "lightblue", "blue", "darkblue", "purple"];
const TEMPERATURE_PALETTE: &[&str] = &["blue", "cyan", "green", "yellow", "orange", "red"];
const LAND_COVER_PALETTE: &[&str] = &[
    "006400", "ffbb22", "ffff4c", "f096ff", "fa0000", "b4b4b4", "f0f0f0", "0064c8", "0096a0",
    "00cf75", "fae6a0",
];
const MODIS_NDVI_PALETTE: &[&str] = &[
    "FFFFFF", "CE7E45", "DF923D", "F1B555", "FCD163", "99B718", "74A901", "66A000", "529400",
    "3E8601", "207401", "056201", "004C00", "023B01", "012E01", "011D01", "011301",
];

const LST_SPEC: AnalysisSpec = AnalysisSpec {
    dataset: "MODIS/061/MOD11A2",
    collection: true,
    bands: &["LST_Day_1km"],
    reducer: Some(Reducer::Mean),
    date_range: Some(YEAR_2024),
    max_cloud_percent: None,
    expression: Some("b(0) * 0.02 - 273.15"),
    visualization: Visualization {
        min: Some(0.0),
        max: Some(50.0),
        palette: TEMPERATURE_PALETTE,
    },
};

impl AnalysisKind {
    pub fn all() -> &'static [AnalysisKind] {
        use AnalysisKind::*;
        &[
            Deforestation,
            WaterQuality,
            AirQuality,
            LandUse,
            Vegetation,
            Rainfall,
            Temperature,
            Ndvi,
            SoilMoisture,
            CropTemperature,
            Precipitation,
            CropHealth,
        ]
    }

    /// Stable identifier, also used as the overlay name.
    pub fn id(&self) -> &'static str {
        use AnalysisKind::*;
        match self {
            Deforestation => "deforestation",
            WaterQuality => "water_quality",
            AirQuality => "air_quality",
            LandUse => "land_use",
            Vegetation => "vegetation",
            Rainfall => "rainfall",
            Temperature => "temperature",
            Ndvi => "ndvi",
            SoilMoisture => "soil_moisture",
            CropTemperature => "crop_temperature",
            Precipitation => "precipitation",
            CropHealth => "crop_health",
        }
    }

    pub fn category(&self) -> AnalysisCategory {
        use AnalysisKind::*;
        match self {
            Ndvi | SoilMoisture | CropTemperature | Precipitation | CropHealth => {
                AnalysisCategory::Crop
            }
            _ => AnalysisCategory::Environmental,
        }
    }

    pub fn description(&self) -> &'static str {
        use AnalysisKind::*;
        match self {
            Deforestation => "Forest loss since 2020 (Hansen Global Forest Change)",
            WaterQuality => "Surface water occurrence (JRC Global Surface Water)",
            AirQuality => "Mean tropospheric NO2 (Sentinel-5P)",
            LandUse => "Land cover classes (ESA WorldCover)",
            Vegetation => "Mean NDVI (MODIS)",
            Rainfall => "Mean daily precipitation (CHIRPS)",
            Temperature => "Mean daytime land surface temperature (MODIS)",
            Ndvi => "Cloud-filtered NDVI (Sentinel-2)",
            SoilMoisture => "Surface soil moisture (SMAP)",
            CropTemperature => "Daytime land surface temperature over cropland (MODIS)",
            Precipitation => "Total annual precipitation (CHIRPS)",
            CropHealth => "Enhanced Vegetation Index (Sentinel-2)",
        }
    }

    /// Dataset, reduction and styling for this kind.
    pub fn spec(&self) -> AnalysisSpec {
        use AnalysisKind::*;
        match self {
            Deforestation => AnalysisSpec {
                dataset: "UMD/hansen/global_forest_change_2022_v1_10",
                collection: false,
                bands: &["lossyear"],
                reducer: None,
                date_range: None,
                max_cloud_percent: None,
                expression: Some("b(0) >= 20"),
                visualization: Visualization {
                    min: None,
                    max: None,
                    palette: &["red"],
                },
            },
            WaterQuality => AnalysisSpec {
                dataset: "JRC/GSW1_4/GlobalSurfaceWater",
                collection: false,
                bands: &["occurrence"],
                reducer: None,
                date_range: None,
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(100.0),
                    palette: WATER_PALETTE,
                },
            },
            AirQuality => AnalysisSpec {
                dataset: "COPERNICUS/S5P/NRTI/L3_NO2",
                collection: true,
                bands: &["NO2_column_number_density"],
                reducer: Some(Reducer::Mean),
                date_range: Some(YEAR_2024),
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(0.0002),
                    palette: &["blue", "green", "yellow", "orange", "red"],
                },
            },
            LandUse => AnalysisSpec {
                dataset: "ESA/WorldCover/v200/2021",
                collection: false,
                bands: &["Map"],
                reducer: None,
                date_range: None,
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(10.0),
                    max: Some(95.0),
                    palette: LAND_COVER_PALETTE,
                },
            },
            Vegetation => AnalysisSpec {
                dataset: "MODIS/061/MOD13A2",
                collection: true,
                bands: &["NDVI"],
                reducer: Some(Reducer::Mean),
                date_range: Some(YEAR_2024),
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(9000.0),
                    palette: MODIS_NDVI_PALETTE,
                },
            },
            Rainfall => AnalysisSpec {
                dataset: "UCSB-CHG/CHIRPS/DAILY",
                collection: true,
                bands: &["precipitation"],
                reducer: Some(Reducer::Mean),
                date_range: Some(YEAR_2024),
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(50.0),
                    palette: RAIN_PALETTE,
                },
            },
            Temperature | CropTemperature => LST_SPEC,
            Ndvi => AnalysisSpec {
                dataset: "COPERNICUS/S2_SR_HARMONIZED",
                collection: true,
                bands: &["B8", "B4"],
                reducer: Some(Reducer::Median),
                date_range: Some(YEAR_2024),
                max_cloud_percent: Some(20),
                expression: Some("(B8 - B4) / (B8 + B4)"),
                visualization: Visualization {
                    min: Some(-1.0),
                    max: Some(1.0),
                    palette: &["red", "yellow", "green"],
                },
            },
            SoilMoisture => AnalysisSpec {
                dataset: "NASA_USDA/HSL/SMAP10KM_soil_moisture",
                collection: true,
                bands: &["ssm"],
                reducer: Some(Reducer::Mean),
                date_range: Some(YEAR_2024),
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(0.5),
                    palette: &["brown", "yellow", "lightgreen", "green", "blue"],
                },
            },
            Precipitation => AnalysisSpec {
                dataset: "UCSB-CHG/CHIRPS/DAILY",
                collection: true,
                bands: &["precipitation"],
                reducer: Some(Reducer::Sum),
                date_range: Some(YEAR_2024),
                max_cloud_percent: None,
                expression: None,
                visualization: Visualization {
                    min: Some(0.0),
                    max: Some(2000.0),
                    palette: RAIN_PALETTE,
                },
            },
            CropHealth => AnalysisSpec {
                dataset: "COPERNICUS/S2_SR_HARMONIZED",
                collection: true,
                bands: &["B8", "B4", "B2"],
                reducer: Some(Reducer::Median),
                date_range: Some(YEAR_2024),
                max_cloud_percent: Some(20),
                expression: Some("2.5 * ((B8 - B4) / (B8 + 6 * B4 - 7.5 * B2 + 1))"),
                visualization: Visualization {
                    min: Some(-1.0),
                    max: Some(1.0),
                    palette: &["red", "orange", "yellow", "lightgreen", "green", "darkgreen"],
                },
            },
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AnalysisKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        AnalysisKind::all()
            .iter()
            .copied()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| AnalysisError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for kind in AnalysisKind::all() {
            assert_eq!(kind.id().parse::<AnalysisKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!(
            "Water-Quality".parse::<AnalysisKind>().unwrap(),
            AnalysisKind::WaterQuality
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = "night_lights".parse::<AnalysisKind>().unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownKind(ref k) if k == "night_lights"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(AnalysisKind::Ndvi.category(), AnalysisCategory::Crop);
        assert_eq!(AnalysisKind::CropTemperature.category(), AnalysisCategory::Crop);
        assert_eq!(
            AnalysisKind::Temperature.category(),
            AnalysisCategory::Environmental
        );
        let crops = AnalysisKind::all()
            .iter()
            .filter(|k| k.category() == AnalysisCategory::Crop)
            .count();
        assert_eq!(crops, 5);
    }

    #[test]
    fn test_collection_specs_have_reducer_and_window() {
        for kind in AnalysisKind::all() {
            let spec = kind.spec();
            assert!(!spec.bands.is_empty(), "{kind} has no bands");
            assert!(!spec.visualization.palette.is_empty(), "{kind} has no palette");
            if spec.collection {
                assert!(spec.reducer.is_some(), "{kind} collection without reducer");
                assert!(spec.date_range.is_some(), "{kind} collection without dates");
            }
        }
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let json = serde_json::to_value(AnalysisKind::Ndvi.spec()).unwrap();
        assert_eq!(json["dataset"], "COPERNICUS/S2_SR_HARMONIZED");
        assert_eq!(json["reducer"], "median");
        assert_eq!(json["maxCloudPercent"], 20);
        assert_eq!(json["dateRange"]["start"], "2024-01-01");
    }
}
