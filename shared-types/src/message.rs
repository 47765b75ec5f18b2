use serde::{Deserialize, Serialize};

/// A search hit returned by a mail source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Raw mail content handed to the pipeline. Read-only once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: Option<String>,

    /// Raw `From` header, e.g. `Airbnb <automated@airbnb.com>`
    pub from: String,
    pub subject: String,

    /// Plain text body, or the HTML part when no text part exists
    pub body: String,

    /// Raw `Date` header (RFC 2822 or RFC 3339)
    pub date: Option<String>,
}

impl RawMessage {
    /// Lower-cased bare address from the `From` header.
    pub fn sender_address(&self) -> String {
        let from = self.from.trim();
        let address = match (from.rfind('<'), from.rfind('>')) {
            (Some(start), Some(end)) if start < end => &from[start + 1..end],
            _ => from,
        };
        address.trim().trim_matches('"').to_lowercase()
    }

    /// Domain part of the sender address, if any.
    pub fn sender_domain(&self) -> Option<String> {
        let address = self.sender_address();
        address
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .filter(|d| !d.is_empty())
    }
}
