// src/domain/listing.rs

use serde::{Deserialize, Serialize};

/// Column order of the batch file. `ListingRecord` serializes in exactly this order.
pub const BATCH_COLUMNS: [&str; 18] = [
    "price",
    "rent",
    "area",
    "extras",
    "price_per_sq_m",
    "no_rooms",
    "market_type",
    "building_type",
    "no_floor",
    "building_floors_num",
    "windows_type",
    "construction_status",
    "building_ownership",
    "lat",
    "long",
    "district",
    "built_year",
    "url",
];

/// Bounding box of the Warsaw metro area: (min_lat, max_lat, min_lon, max_lon).
pub const METRO_BOUNDS: (f64, f64, f64, f64) = (52.05, 52.40, 20.75, 21.30);

const PRICE_PER_AREA_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Primary,
    Secondary,
}

impl MarketType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Primary => "primary",
            MarketType::Secondary => "secondary",
        }
    }
}

/// One offer observation, flattened. Field names double as batch-file column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub price: Option<f64>,
    pub rent: Option<f64>,
    pub area: Option<f64>,
    pub extras: Option<String>,
    pub price_per_sq_m: Option<f64>,
    pub no_rooms: Option<i64>,
    pub market_type: Option<MarketType>,
    pub building_type: Option<String>,
    pub no_floor: Option<i64>,
    pub building_floors_num: Option<i64>,
    pub windows_type: Option<String>,
    pub construction_status: Option<String>,
    pub building_ownership: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub district: String,
    pub built_year: Option<i64>,
    pub url: String,
}

impl ListingRecord {
    /// An empty observation for `url` in `district`.
    pub fn new(district: &str, url: &str) -> Self {
        Self {
            price: None,
            rent: None,
            area: None,
            extras: None,
            price_per_sq_m: None,
            no_rooms: None,
            market_type: None,
            building_type: None,
            no_floor: None,
            building_floors_num: None,
            windows_type: None,
            construction_status: None,
            building_ownership: None,
            lat: None,
            long: None,
            district: district.to_string(),
            built_year: None,
            url: url.to_string(),
        }
    }

    pub fn features(&self) -> FeatureFlags {
        FeatureFlags::from_extras(self.extras.as_deref())
    }

    /// Soft invariants that do not hold for this record.
    pub fn quality_issues(&self) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        if let (Some(price), Some(area), Some(ppa)) = (self.price, self.area, self.price_per_sq_m) {
            if area > 0.0 {
                let expected = price / area;
                if expected > 0.0 && ((ppa - expected) / expected).abs() > PRICE_PER_AREA_TOLERANCE {
                    issues.push(QualityIssue::PricePerAreaMismatch { expected, actual: ppa });
                }
            }
        }

        if let (Some(floor), Some(floors)) = (self.no_floor, self.building_floors_num) {
            if floor > floors {
                issues.push(QualityIssue::FloorAboveBuilding { floor, floors });
            }
        }

        if let (Some(lat), Some(lon)) = (self.lat, self.long) {
            let (min_lat, max_lat, min_lon, max_lon) = METRO_BOUNDS;
            if !(min_lat..=max_lat).contains(&lat) || !(min_lon..=max_lon).contains(&lon) {
                issues.push(QualityIssue::OutsideMetroArea { lat, lon });
            }
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QualityIssue {
    PricePerAreaMismatch { expected: f64, actual: f64 },
    FloorAboveBuilding { floor: i64, floors: i64 },
    OutsideMetroArea { lat: f64, lon: f64 },
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityIssue::PricePerAreaMismatch { expected, actual } => {
                write!(f, "price per m² {actual:.0} differs from price/area {expected:.0}")
            }
            QualityIssue::FloorAboveBuilding { floor, floors } => {
                write!(f, "floor {floor} above building height {floors}")
            }
            QualityIssue::OutsideMetroArea { lat, lon } => {
                write!(f, "coordinates ({lat}, {lon}) outside metro area")
            }
        }
    }
}

/// Apartment features the site lists under "extras".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Lift,
    Balcony,
    Garage,
    Basement,
    SeparateKitchen,
    UsableRoom,
    AirConditioning,
    Terrace,
    Garden,
    TwoStorey,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::Lift,
        Feature::Balcony,
        Feature::Garage,
        Feature::Basement,
        Feature::SeparateKitchen,
        Feature::UsableRoom,
        Feature::AirConditioning,
        Feature::Terrace,
        Feature::Garden,
        Feature::TwoStorey,
    ];

    /// Token used by the site and column name in the `flats` table.
    pub fn column(&self) -> &'static str {
        match self {
            Feature::Lift => "lift",
            Feature::Balcony => "balcony",
            Feature::Garage => "garage",
            Feature::Basement => "basement",
            Feature::SeparateKitchen => "separate_kitchen",
            Feature::UsableRoom => "usable_room",
            Feature::AirConditioning => "air_conditioning",
            Feature::Terrace => "terrace",
            Feature::Garden => "garden",
            Feature::TwoStorey => "two_storey",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feature::Lift => "Lift",
            Feature::Balcony => "Balcony",
            Feature::Garage => "Garage",
            Feature::Basement => "Basement",
            Feature::SeparateKitchen => "Separate kitchen",
            Feature::UsableRoom => "Usable room",
            Feature::AirConditioning => "A/C",
            Feature::Terrace => "Terrace",
            Feature::Garden => "Garden",
            Feature::TwoStorey => "Two-storey",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Feature::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// Tri-state flags: `None` when the listing did not publish an extras list at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags([Option<bool>; 10]);

impl FeatureFlags {
    pub fn from_extras(extras: Option<&str>) -> Self {
        let Some(extras) = extras else {
            return Self::default();
        };

        let tokens: Vec<&str> = extras.split(',').map(str::trim).collect();
        let mut flags = [None; 10];
        for (slot, feature) in flags.iter_mut().zip(Feature::ALL) {
            *slot = Some(tokens.contains(&feature.column()));
        }
        Self(flags)
    }

    pub fn get(&self, feature: Feature) -> Option<bool> {
        Feature::ALL
            .iter()
            .position(|f| *f == feature)
            .and_then(|i| self.0[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, Option<bool>)> + '_ {
        Feature::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// Floor values come as `floor_3`, `ground_floor`, `cellar`, ... on the site.
pub fn parse_floor(raw: &str) -> Option<i64> {
    let raw = raw.trim().to_ascii_lowercase();
    match raw.as_str() {
        "ground_floor" => Some(0),
        "cellar" => Some(-1),
        _ => raw
            .strip_prefix("floor_")
            .unwrap_or(raw.as_str())
            .parse::<i64>()
            .ok(),
    }
}
