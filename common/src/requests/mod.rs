use serde::{Deserialize, Serialize};

/// Botanical descriptors chosen by the user for one image. They narrow the
/// predictor's candidate species; blank values are ignored upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationAttributes {
    #[serde(default, rename = "Petiole_color")]
    pub petiole_color: String,
    #[serde(default, rename = "Aerial_Tuber")]
    pub aerial_tuber: String,
    #[serde(default, rename = "Petiolar_base_color")]
    pub petiolar_base_color: String,
    #[serde(default, rename = "Stem_Type")]
    pub stem_type: String,
    #[serde(default, rename = "Thorns")]
    pub thorns: String,
    #[serde(default, rename = "Stem_Color")]
    pub stem_color: String,
    #[serde(default, rename = "Phyllotaxy")]
    pub phyllotaxy: String,
    #[serde(default, rename = "Color_leaf_base")]
    pub color_leaf_base: String,
    #[serde(default, rename = "Petiole_apex_color")]
    pub petiole_apex_color: String,
}

/// Submitter plus attributes for one image.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmissionMetadata {
    #[serde(default, rename = "userId")]
    pub user_id: String,
    #[serde(default, rename = "userName")]
    pub user_name: String,
    #[serde(flatten)]
    pub attributes: ClassificationAttributes,
}

/// Query string of `GET /history/get-history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub name: Option<String>,
    /// Comma-joined labels, or `All`.
    pub species: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatQuery {
    pub range: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeolocationUpdate {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSelectionRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesListQuery {
    #[serde(rename = "local_Name")]
    pub local_name: Option<String>,
    pub page: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesSearchQuery {
    #[serde(rename = "scientific_Name")]
    pub scientific_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub name: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Parses a 1-based page number; anything that is not a positive integer is
/// treated as the first page.
pub fn parse_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}
