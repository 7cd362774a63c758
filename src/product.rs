use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt::Display, hash::Hash};

/// Catalog product id. The backend sends string ids; numeric ids are
/// accepted on input and kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductId(String);

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ProductId(text),
            RawId::Unsigned(num) => ProductId(num.to_string()),
            RawId::Signed(num) => ProductId(num.to_string()),
        })
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(fr: &str) -> Self {
        ProductId(fr.to_string())
    }
}

impl From<String> for ProductId {
    fn from(fr: String) -> Self {
        ProductId(fr)
    }
}

impl From<u64> for ProductId {
    fn from(fr: u64) -> Self {
        ProductId(fr.to_string())
    }
}

/// Product snapshot as returned by the search backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl Default for ProductId {
    fn default() -> Self {
        ProductId(String::new())
    }
}

impl Hash for Product {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

/// Case-insensitive equality for optional catalog labels.
pub fn same_label(a: Option<&str>, b: &str) -> bool {
    a.map(|a| a.trim().eq_ignore_ascii_case(b.trim()))
        .unwrap_or(false)
}
