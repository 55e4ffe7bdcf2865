//! Serializable snapshot of a finished session, for `--json` output.

use crate::business::{Business, Source};
use crate::session::SearchState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub pincode: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub area: String,
    pub generated_at: DateTime<Utc>,
    pub businesses: Vec<Business>,
    pub sources: Vec<Source>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl From<&SearchState> for SearchReport {
    fn from(state: &SearchState) -> Self {
        Self {
            pincode: state.pincode.clone(),
            area: state.area.clone(),
            generated_at: Utc::now(),
            businesses: state.businesses.clone(),
            sources: state.sources.clone(),
            has_more: state.has_more,
            error: state.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_empty_area_and_error() {
        let state = SearchState {
            pincode: "110001".into(),
            has_searched: true,
            businesses: vec![Business::new("A", "1 Rd")],
            sources: vec![Source::new("https://a.example", "A")],
            ..Default::default()
        };

        let json = serde_json::to_value(SearchReport::from(&state)).unwrap();
        assert_eq!(json["pincode"], "110001");
        assert_eq!(json["businesses"][0]["name"], "A");
        assert_eq!(json["sources"][0]["uri"], "https://a.example");
        assert_eq!(json["has_more"], false);
        assert!(json.get("area").is_none());
        assert!(json.get("error").is_none());
        assert!(json["generated_at"].is_string());
    }
}
