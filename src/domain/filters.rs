// src/domain/filters.rs

use crate::domain::listing::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketFilter {
    #[default]
    All,
    Primary,
    Secondary,
}

impl MarketFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketFilter::All => "all",
            MarketFilter::Primary => "primary",
            MarketFilter::Secondary => "secondary",
        }
    }
}

/// Column the top deals tables are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Price,
    PricePerSqM,
    Area,
}

impl SortColumn {
    pub const ALL: [SortColumn; 3] = [SortColumn::Price, SortColumn::PricePerSqM, SortColumn::Area];

    pub fn column(&self) -> &'static str {
        match self {
            SortColumn::Price => "price",
            SortColumn::PricePerSqM => "price_per_sq_m",
            SortColumn::Area => "area",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Price => "total price",
            SortColumn::PricePerSqM => "price per m²",
            SortColumn::Area => "area",
        }
    }

    pub fn from_column(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.column() == value)
    }
}

/// Allowed sizes of the top deals tables.
pub const TOP_CHOICES: [usize; 4] = [5, 10, 25, 50];
pub const DEFAULT_TOP: usize = 10;

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filter over stored flats. Empty lists and open ranges match everything.
///
/// `floor` and `built_year` keep rows where the value is unknown, the other
/// ranges drop them. `top` and `sort` only shape the top deals tables.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFilter {
    pub districts: Vec<String>,
    pub market: MarketFilter,
    pub price: Range,
    pub price_per_sq_m: Range,
    pub area: Range,
    pub floor: Range,
    pub built_year: Range,
    pub ownership: Vec<String>,
    pub construction_status: Vec<String>,
    pub features: Vec<Feature>,
    pub top: usize,
    pub sort: SortColumn,
}

impl Default for FlatFilter {
    fn default() -> Self {
        FlatFilter {
            districts: Vec::new(),
            market: MarketFilter::All,
            price: Range::default(),
            price_per_sq_m: Range::default(),
            area: Range::default(),
            floor: Range::default(),
            built_year: Range::default(),
            ownership: Vec::new(),
            construction_status: Vec::new(),
            features: Vec::new(),
            top: DEFAULT_TOP,
            sort: SortColumn::default(),
        }
    }
}

impl FlatFilter {
    /// Parse from a URL query string (`district=wola&district=ochota&min_price=500000`).
    pub fn from_query(query: &str) -> Result<Self, String> {
        let mut filter = FlatFilter::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_ref() {
                "district" => filter.districts.push(value.to_string()),
                "ownership" => filter.ownership.push(value.to_string()),
                "construction_status" => filter.construction_status.push(value.to_string()),
                "feature" => match Feature::from_column(value) {
                    Some(f) if !filter.features.contains(&f) => filter.features.push(f),
                    Some(_) => {}
                    None => return Err(format!("unknown feature '{value}'")),
                },
                "market" => {
                    filter.market = match value {
                        "all" => MarketFilter::All,
                        "primary" => MarketFilter::Primary,
                        "secondary" => MarketFilter::Secondary,
                        other => return Err(format!("unknown market '{other}'")),
                    }
                }
                "top" => {
                    filter.top = value
                        .parse::<usize>()
                        .ok()
                        .filter(|n| TOP_CHOICES.contains(n))
                        .ok_or_else(|| format!("top must be one of {TOP_CHOICES:?}, got '{value}'"))?
                }
                "sort" => {
                    filter.sort = SortColumn::from_column(value)
                        .ok_or_else(|| format!("unknown sort column '{value}'"))?
                }
                "min_price" => filter.price.min = Some(number(&key, value)?),
                "max_price" => filter.price.max = Some(number(&key, value)?),
                "min_price_per_sq_m" => filter.price_per_sq_m.min = Some(number(&key, value)?),
                "max_price_per_sq_m" => filter.price_per_sq_m.max = Some(number(&key, value)?),
                "min_area" => filter.area.min = Some(number(&key, value)?),
                "max_area" => filter.area.max = Some(number(&key, value)?),
                "min_floor" => filter.floor.min = Some(number(&key, value)?),
                "max_floor" => filter.floor.max = Some(number(&key, value)?),
                "min_built_year" => filter.built_year.min = Some(number(&key, value)?),
                "max_built_year" => filter.built_year.max = Some(number(&key, value)?),
                _ => {}
            }
        }

        for (name, range) in [
            ("price", filter.price),
            ("price per m²", filter.price_per_sq_m),
            ("area", filter.area),
            ("floor", filter.floor),
            ("built year", filter.built_year),
        ] {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(format!("minimum {name} can't be higher than maximum"));
                }
            }
        }

        Ok(filter)
    }
}

fn number(key: &str, value: &str) -> Result<f64, String> {
    value
        .replace(' ', "")
        .parse::<f64>()
        .map_err(|_| format!("'{value}' is not a number for {key}"))
}
