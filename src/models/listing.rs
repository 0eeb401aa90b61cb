use serde::{Deserialize, Serialize};

/// One scraped result. Both fields hold the page text as found, unparsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub price: String,
}

impl Listing {
    pub fn new(title: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
        }
    }

    /// `"{title} - {price}"`, the line format used in notification bodies.
    pub fn summary_line(&self) -> String {
        format!("{} - {}", self.title, self.price)
    }
}
