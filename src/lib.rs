//! # Pinscout
//!
//! Find local businesses by postal pincode using a search-grounded LLM.
//!
//! ## Features
//!
//! - **Grounded Results**: Gemini with Google Search returns typed `Business` records and citation `Source`s
//! - **Deduplicated Pagination**: "load more" asks for unseen businesses and merges them by name
//! - **Observable State**: a single controller publishes its state over a watch channel

pub mod agent;
pub mod business;
pub mod config;
pub mod query;
pub mod report;
pub mod session;
pub mod ui;

pub use agent::{AgentError, BusinessFinder, GeminiFinder};
pub use business::{Business, BusinessPage, Source};
pub use config::Config;
pub use query::BusinessQuery;
pub use session::{Phase, SearchController, SearchError, SearchState};
