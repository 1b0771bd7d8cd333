use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference data for one yam species. `scientific_name` is unique and is the
/// vocabulary used by the history species filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub image_url: String,
    pub common_name: String,
    pub local_name: String,
    pub scientific_name: String,
    pub family_name: String,
    pub description: String,
    pub propagation: String,
    #[serde(rename = "plantingseason")]
    pub planting_season: String,
    #[serde(rename = "harvestingseason")]
    pub harvesting_season: String,
    pub utilization: String,
    pub status: String,
    #[serde(rename = "surveysite")]
    pub survey_site: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text fields of a species form. Every field is optional on update; the
/// create path checks the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesFields {
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub local_name: String,
    #[serde(default)]
    pub scientific_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub propagation: String,
    #[serde(default, rename = "plantingseason")]
    pub planting_season: String,
    #[serde(default, rename = "harvestingseason")]
    pub harvesting_season: String,
    #[serde(default)]
    pub utilization: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "surveysite")]
    pub survey_site: String,
}

impl SpeciesFields {
    /// Names of required fields that are blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("commonName", &self.common_name),
            ("localName", &self.local_name),
            ("scientificName", &self.scientific_name),
            ("familyName", &self.family_name),
            ("description", &self.description),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesPage {
    pub total_species: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
    pub species: Vec<SpeciesRecord>,
}
