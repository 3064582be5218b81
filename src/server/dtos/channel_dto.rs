use serde::{Deserialize, Serialize};

/// one upstream channel as we expose it. Identity is `id`, the name may have
/// gone through the correction table before landing here
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub logo: String,
}
