use serde::Deserialize;
use serde_json::Value;

// __NEXT_DATA__
//  └── props
//       └── pageProps
//            └── ad
//                 ├── target
//                 │    └── Extras_types  [..]
//                 ├── additionalInformation  [{ label, values: [..] }]
//                 ├── characteristics       [{ key, value }]
//                 └── location
//                      └── coordinates
//                           ├── latitude
//                           └── longitude
//
// Every level is optional: the page format changes without notice and a
// missing branch must only blank the fields below it.

#[derive(Debug, Deserialize)]
pub struct NextData {
    pub props: Option<Props>,
}

#[derive(Debug, Deserialize)]
pub struct Props {
    #[serde(rename = "pageProps")]
    pub page_props: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
pub struct PageProps {
    pub ad: Option<Ad>,
}

#[derive(Debug, Deserialize)]
pub struct Ad {
    pub target: Option<Target>,
    #[serde(rename = "additionalInformation")]
    pub additional_information: Option<Vec<AdditionalInformation>>,
    pub characteristics: Option<Vec<Characteristic>>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct Target {
    #[serde(rename = "Extras_types")]
    pub extras_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AdditionalInformation {
    pub label: Option<String>,
    pub values: Option<Vec<String>>,
}

/// `value` is a string on most pages but numbers have been seen too.
#[derive(Debug, Deserialize)]
pub struct Characteristic {
    pub key: Option<String>,
    pub value: Option<Value>,
}

impl Characteristic {
    pub fn text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
