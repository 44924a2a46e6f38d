// extractor.rs
use crate::domain::listing::{parse_floor, ListingRecord, MarketType};
use crate::scraper::models::{Ad, Characteristic, NextData};
use crate::scraper::ParseError;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Turns a detail payload into a record. `None` means "unparseable page": the
/// caller skips it and carries on.
pub trait Extractor {
    fn extract(&self, payload: &str, district: &str, url: &str) -> Option<ListingRecord>;
}

/// Reads the `__NEXT_DATA__` script embedded in every detail page.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextDataExtractor;

impl Extractor for NextDataExtractor {
    fn extract(&self, payload: &str, district: &str, url: &str) -> Option<ListingRecord> {
        match Self::parse(payload, district, url) {
            Ok(record) => {
                for issue in record.quality_issues() {
                    warn!(%url, %issue, "data quality");
                }
                Some(record)
            }
            Err(e) => {
                warn!(%url, error = %e, "skipping unparseable detail page");
                None
            }
        }
    }
}

impl NextDataExtractor {
    pub fn parse(payload: &str, district: &str, url: &str) -> Result<ListingRecord, ParseError> {
        let data = Self::extract_next_data(payload)?;

        let ad = data
            .props
            .and_then(|p| p.page_props)
            .and_then(|p| p.ad)
            .ok_or_else(|| ParseError::UnexpectedShape("props.pageProps.ad missing".into()))?;

        Ok(project(ad, district, url))
    }

    fn extract_next_data(html: &str) -> Result<NextData, ParseError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(r#"script[id="__NEXT_DATA__"]"#)
            .map_err(|e| ParseError::Selector(e.to_string()))?;

        let element = document
            .select(&selector)
            .next()
            .ok_or(ParseError::MissingNextData)?;

        let json_text: String = element.text().collect();
        if json_text.trim().is_empty() {
            return Err(ParseError::MissingNextData);
        }

        Ok(serde_json::from_str(&json_text)?)
    }
}

fn project(ad: Ad, district: &str, url: &str) -> ListingRecord {
    let chars: HashMap<String, String> = ad
        .characteristics
        .unwrap_or_default()
        .iter()
        .filter_map(|c: &Characteristic| Some((c.key.clone()?, c.text()?)))
        .collect();

    let add_info: HashMap<String, Vec<String>> = ad
        .additional_information
        .unwrap_or_default()
        .into_iter()
        .filter_map(|i| Some((i.label?, i.values.unwrap_or_default())))
        .collect();

    let extras = ad
        .target
        .and_then(|t| t.extras_types)
        .filter(|list| !list.is_empty())
        .map(|list| list.join(", "));

    let coordinates = ad.location.and_then(|l| l.coordinates);

    let text = |key: &str| chars.get(key).cloned();
    let decimal = |key: &str| chars.get(key).and_then(|v| parse_decimal(v));
    let integer = |key: &str| chars.get(key).and_then(|v| parse_integer(v));

    let built_year = add_info
        .get("build_year")
        .and_then(|values| values.first())
        .and_then(|v| parse_integer(v));

    debug!(%url, characteristics = chars.len(), "projected detail page");

    ListingRecord {
        price: decimal("price"),
        rent: decimal("rent"),
        area: decimal("m"),
        extras,
        price_per_sq_m: decimal("price_per_m"),
        no_rooms: integer("rooms_num"),
        market_type: chars.get("market").and_then(|v| MarketType::parse(v)),
        building_type: text("building_type"),
        no_floor: chars.get("floor_no").and_then(|v| parse_floor(v)),
        building_floors_num: integer("building_floors_num"),
        windows_type: text("windows_type"),
        construction_status: text("construction_status"),
        building_ownership: text("building_ownership"),
        lat: coordinates.as_ref().and_then(|c| c.latitude),
        long: coordinates.as_ref().and_then(|c| c.longitude),
        district: district.to_string(),
        built_year,
        url: url.to_string(),
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| parse_decimal(raw).filter(|v| v.fract() == 0.0).map(|v| v as i64))
}
