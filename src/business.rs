//! Business and Source records - the structured output of the finder agent.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A local business returned by the LLM.
///
/// Two businesses are the same business when their `name` matches exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Business {
    /// Trading name of the business
    pub name: String,
    /// Street address, as complete as the model can give it
    #[serde(default)]
    pub address: String,
    /// Contact phone number, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Kind of business (e.g. "Pharmacy", "Restaurant")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Business {
    /// Create a business with only a name and address
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone: None,
            category: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A citation backing the generated list. Identified by `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

impl Source {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }
}

/// The JSON object the model is asked to produce.
///
/// This schema is embedded in the prompt so the model knows the exact shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BusinessList {
    /// Businesses located in the requested pincode
    pub businesses: Vec<Business>,
}

/// One page of results from a single finder call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessPage {
    pub businesses: Vec<Business>,
    pub sources: Vec<Source>,
}

impl BusinessPage {
    pub fn new(businesses: Vec<Business>, sources: Vec<Source>) -> Self {
        Self {
            businesses,
            sources,
        }
    }

    /// Check if the page carries any businesses
    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_when_missing() {
        let business: Business = serde_json::from_str(r#"{"name": "Ravi Stores"}"#).unwrap();
        assert_eq!(business, Business::new("Ravi Stores", ""));
    }

    #[test]
    fn optional_fields_are_omitted_when_serialized() {
        let json = serde_json::to_value(Business::new("A", "1 Main Rd")).unwrap();
        assert!(json.get("phone").is_none());
        assert!(json.get("category").is_none());

        let json = serde_json::to_value(
            Business::new("A", "1 Main Rd")
                .with_phone("011-2345")
                .with_category("Bakery"),
        )
        .unwrap();
        assert_eq!(json["phone"], "011-2345");
        assert_eq!(json["category"], "Bakery");
    }

    #[test]
    fn list_schema_names_business_fields() {
        let schema = serde_json::to_string(&schemars::schema_for!(BusinessList)).unwrap();
        for field in ["businesses", "name", "address", "phone", "category"] {
            assert!(schema.contains(field), "schema missing {field}");
        }
    }
}
