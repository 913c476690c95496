use serde::{Deserialize, Serialize};

/// A planned task that can seed a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BacklogTask {
    pub id: String,
    pub name: String,
    pub minutes: u32,
}
