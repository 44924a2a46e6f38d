// src/domain/stats.rs

use std::collections::BTreeMap;

/// A stored flat as the market view needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSummary {
    pub id: i64,
    pub district: String,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub price_per_sq_m: Option<f64>,
    pub no_rooms: Option<i64>,
    pub no_floor: Option<i64>,
    pub built_year: Option<i64>,
    pub is_primary: Option<bool>,
    pub date_scraped: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketKpis {
    pub offers: usize,
    pub median_price: Option<f64>,
    pub median_price_per_sq_m: Option<f64>,
    pub median_area: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictStat {
    pub district: String,
    pub offers: usize,
    pub median_price_per_sq_m: f64,
}

pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.total_cmp(b));

    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

pub fn kpis(flats: &[FlatSummary]) -> MarketKpis {
    MarketKpis {
        offers: flats.len(),
        median_price: median(flats.iter().filter_map(|f| f.price)),
        median_price_per_sq_m: median(flats.iter().filter_map(|f| f.price_per_sq_m)),
        median_area: median(flats.iter().filter_map(|f| f.area)),
    }
}

/// Districts ranked by median price per m², cheapest first. Districts without
/// any priced offer are left out.
pub fn district_ranking(flats: &[FlatSummary]) -> Vec<DistrictStat> {
    let mut by_district: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for flat in flats {
        if let Some(ppa) = flat.price_per_sq_m {
            by_district.entry(flat.district.as_str()).or_default().push(ppa);
        }
    }

    let mut ranking: Vec<DistrictStat> = by_district
        .into_iter()
        .filter_map(|(district, values)| {
            let offers = values.len();
            median(values).map(|m| DistrictStat {
                district: district.to_string(),
                offers,
                median_price_per_sq_m: m,
            })
        })
        .collect();

    ranking.sort_by(|a, b| a.median_price_per_sq_m.total_cmp(&b.median_price_per_sq_m));
    ranking
}

/// `1234567.8` -> `"1 234 568"`
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }

    if rounded < 0 {
        format!("-{out}")
    } else {
        out
    }
}
