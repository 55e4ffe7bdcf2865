//! Search input and prompt composition.

use crate::business::BusinessList;
use crate::session::SearchError;

/// Number of characters in an Indian postal pincode
pub const PINCODE_LEN: usize = 6;

/// Check that a pincode is exactly six ASCII digits.
///
/// Stricter than a plain length check: six letters are rejected too,
/// matching the "6-digit" wording of the validation message.
pub fn validate_pincode(pincode: &str) -> Result<(), SearchError> {
    if pincode.len() == PINCODE_LEN && pincode.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(SearchError::Validation)
    }
}

/// What to look for in one finder call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessQuery {
    pub pincode: String,
    /// Optional locality name; empty means "anywhere in the pincode"
    pub area: String,
    /// Names already shown to the user that the model should skip
    pub exclude: Vec<String>,
}

impl BusinessQuery {
    pub fn new(pincode: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            pincode: pincode.into(),
            area: area.into(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, names: Vec<String>) -> Self {
        self.exclude = names;
        self
    }

    /// Human readable location, e.g. "Connaught Place, pincode 110001, India"
    pub fn location(&self, country: &str) -> String {
        let area = self.area.trim();
        if area.is_empty() {
            format!("pincode {}, {}", self.pincode, country)
        } else {
            format!("{}, pincode {}, {}", area, self.pincode, country)
        }
    }

    /// Build the full prompt including persona, schema and exclusions
    pub fn prompt(&self, persona: &str, country: &str, page_size: usize) -> String {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(BusinessList))
            .unwrap_or_default();

        let exclusions = if self.exclude.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = self.exclude.iter().map(|n| format!("- {}", n)).collect();
            format!(
                "\nThe user has already seen the following businesses. Do NOT include any of them again:\n{}\n",
                names.join("\n")
            )
        };

        format!(
            r#"{persona}

Use Google Search to find up to {page_size} distinct local businesses physically located in {location}.
Cover a mix of categories (shops, restaurants, clinics, services, and so on).
For each business give its name, full address, phone number if available, and category.
{exclusions}
You MUST respond with a JSON object matching this JSON schema:
{schema}

Do not include any markdown formatting, code blocks, or explanations. Only output the raw JSON object."#,
            persona = persona,
            page_size = page_size,
            location = self.location(country),
            exclusions = exclusions,
            schema = schema,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_pincodes() {
        assert!(validate_pincode("110001").is_ok());
        assert!(validate_pincode("560034").is_ok());
    }

    #[test]
    fn rejects_wrong_length_or_non_digits() {
        for bad in ["", "11000", "1100011", "11000a", "abcdef", " 11000", "११०००१"] {
            assert!(
                matches!(validate_pincode(bad), Err(SearchError::Validation)),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn location_includes_area_only_when_present() {
        assert_eq!(
            BusinessQuery::new("110001", "").location("India"),
            "pincode 110001, India"
        );
        assert_eq!(
            BusinessQuery::new("110001", "  Connaught Place ").location("India"),
            "Connaught Place, pincode 110001, India"
        );
    }

    #[test]
    fn prompt_lists_exclusions() {
        let query = BusinessQuery::new("110001", "")
            .excluding(vec!["Alpha Traders".into(), "Beta Bakery".into()]);
        let prompt = query.prompt("persona", "India", 30);

        assert!(prompt.starts_with("persona"));
        assert!(prompt.contains("up to 30 distinct"));
        assert!(prompt.contains("Do NOT include"));
        assert!(prompt.contains("- Alpha Traders"));
        assert!(prompt.contains("- Beta Bakery"));
    }

    #[test]
    fn prompt_without_exclusions_has_no_exclusion_block() {
        let prompt = BusinessQuery::new("110001", "").prompt("persona", "India", 30);
        assert!(!prompt.contains("Do NOT include"));
        assert!(prompt.contains("\"businesses\""));
    }
}
