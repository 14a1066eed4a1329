use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Name substituted when the profile carries no usable name.
pub const DEFAULT_USER_NAME: &str = "User";

// ============ Assessment Models ============

/// Profile captured by the conversational assessment.
///
/// Every field is optional; consumers work from [`ReportUserData`], which has the
/// defaults applied. A field of the wrong type reads as absent instead of rejecting
/// the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whole years. Numeric strings are accepted and fractions are truncated.
    #[serde(default, deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

fn lenient_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserProfile, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_age<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let years = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(years
        .filter(|y| y.is_finite() && *y >= 0.0 && *y <= f64::from(u32::MAX))
        .map(|y| y.trunc() as u32))
}

/// Constitution axis.
///
/// Declaration order (Vata, Pitta, Kapha) is also the tie-break order used when
/// picking the dominant and secondary dosha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dosha {
    #[serde(alias = "vata", alias = "VATA")]
    Vata,
    #[serde(alias = "pitta", alias = "PITTA")]
    Pitta,
    #[serde(alias = "kapha", alias = "KAPHA")]
    Kapha,
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dosha::Vata => "Vata",
            Dosha::Pitta => "Pitta",
            Dosha::Kapha => "Kapha",
        };
        f.write_str(name)
    }
}

/// Mapping from axis to its share of the user's constitution.
///
/// Shares may arrive as fractions (`0.5`) or percentages (`50.0`); the display layer
/// works with each axis' share of the total so both forms render the same.
///
/// Two wire shapes are accepted: a flat `{"Vata": 0.5, ...}` map, or the scoring
/// service's `{"percentages": {"vata": 50, ...}, "dominant_dosha": ..}` envelope. An
/// envelope is forwarded to the report service exactly as received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoshaResult {
    pub shares: BTreeMap<Dosha, f64>,
    envelope: Option<serde_json::Map<String, Value>>,
}

impl Serialize for DoshaResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.envelope {
            Some(envelope) => envelope.serialize(serializer),
            None => self.shares.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DoshaResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            Value::Object(envelope) if envelope.contains_key("percentages") => {
                let shares = serde_json::from_value(envelope["percentages"].clone())
                    .map_err(|e| D::Error::custom(format!("invalid percentages: {}", e)))?;
                Ok(Self {
                    shares,
                    envelope: Some(envelope),
                })
            }
            flat => Ok(Self {
                shares: serde_json::from_value(flat).map_err(D::Error::custom)?,
                envelope: None,
            }),
        }
    }
}

impl DoshaResult {
    pub fn new(shares: impl IntoIterator<Item = (Dosha, f64)>) -> Self {
        Self {
            shares: shares.into_iter().collect(),
            envelope: None,
        }
    }

    /// Checks that at least one axis is present and every share is finite and non-negative.
    pub fn validate(&self) -> Result<(), String> {
        if self.shares.is_empty() {
            return Err("dosha_results must contain at least one axis".to_string());
        }
        for (dosha, share) in &self.shares {
            if !share.is_finite() || *share < 0.0 {
                return Err(format!(
                    "share for {} must be a finite, non-negative number (got {})",
                    dosha, share
                ));
            }
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }

    /// Axes ordered by share, highest first. Equal shares keep Vata, Pitta, Kapha order.
    pub fn ranked(&self) -> Vec<(Dosha, f64)> {
        let mut ranked: Vec<(Dosha, f64)> = self.shares.iter().map(|(d, s)| (*d, *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// One recommended Panchakarma therapy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Therapy {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precautions: Option<String>,
    /// Fields this client does not interpret, forwarded to the report service as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Dietary guidance (Ahara).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dietary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favor: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid: Option<Vec<String>>,
}

/// Lifestyle guidance (Vihara).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yoga: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pranayama: Option<String>,
}

/// Therapy, dietary and lifestyle recommendations produced by the scoring service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanchakarmaRecommendation {
    /// Display order only.
    #[serde(
        default,
        alias = "therapyDetails",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub therapy_details: Vec<Therapy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<Dietary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifestyle: Option<Lifestyle>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The three-part unit written by the assessment producer.
///
/// Always replaced as a whole; see [`crate::store::AssessmentStore::replace`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    #[serde(default, alias = "userProfile", deserialize_with = "lenient_profile")]
    pub user_profile: UserProfile,
    #[serde(default, alias = "doshaResults", skip_serializing_if = "Option::is_none")]
    pub dosha_results: Option<DoshaResult>,
    #[serde(
        default,
        alias = "panchakarmaRecs",
        skip_serializing_if = "Option::is_none"
    )]
    pub panchakarma_recs: Option<PanchakarmaRecommendation>,
}

// ============ Report Exchange Models ============

/// Profile block of a report request, with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportUserData {
    pub name: String,
    pub email: String,
    /// Serialized as a number when known, otherwise as an empty string.
    #[serde(serialize_with = "serialize_age")]
    pub age: Option<u32>,
    pub gender: String,
}

fn serialize_age<S: Serializer>(age: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match age {
        Some(years) => serializer.serialize_u32(*years),
        None => serializer.serialize_str(""),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl From<&UserProfile> for ReportUserData {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: non_blank(&profile.name).unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            email: non_blank(&profile.email).unwrap_or_default(),
            age: profile.age,
            gender: non_blank(&profile.gender).unwrap_or_default(),
        }
    }
}

/// Body POSTed to the report service. Built fresh for every attempt, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub user_data: ReportUserData,
    pub dosha_results: DoshaResult,
    pub panchakarma_recs: PanchakarmaRecommendation,
}

/// Binary report returned by the service, before it is saved.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where and what was written by the save step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedReport {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 of the saved bytes (hex encoded).
    pub checksum: String,
    pub saved_at: DateTime<Utc>,
}

/// Lifecycle of a report download. Owned by [`crate::controller::ReportController`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    Idle,
    InFlight {
        attempt_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        attempt_id: Uuid,
        report: SavedReport,
    },
    Failed {
        attempt_id: Uuid,
        reason: String,
    },
}

impl DownloadState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, DownloadState::InFlight { .. })
    }

    /// Reason to show in the error banner, if the last attempt failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DownloadState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn attempt_id(&self) -> Option<Uuid> {
        match self {
            DownloadState::Idle => None,
            DownloadState::InFlight { attempt_id, .. }
            | DownloadState::Succeeded { attempt_id, .. }
            | DownloadState::Failed { attempt_id, .. } => Some(*attempt_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_data_defaults() {
        let data = ReportUserData::from(&UserProfile::default());
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"name": "User", "email": "", "age": "", "gender": ""})
        );
    }

    #[test]
    fn test_user_data_blank_name_falls_back() {
        let profile = UserProfile {
            name: Some("   ".to_string()),
            age: Some(34),
            ..Default::default()
        };
        let value = serde_json::to_value(ReportUserData::from(&profile)).unwrap();
        assert_eq!(value["name"], "User");
        assert_eq!(value["age"], 34);
    }

    #[test]
    fn test_dosha_result_accepts_lowercase_axes() {
        let result: DoshaResult =
            serde_json::from_value(json!({"vata": 50.0, "pitta": 30.0, "kapha": 20.0})).unwrap();
        assert_eq!(result.shares.len(), 3);
        assert_eq!(result.shares[&Dosha::Vata], 50.0);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"Vata": 50.0, "Pitta": 30.0, "Kapha": 20.0})
        );
    }

    #[test]
    fn test_profile_age_read_leniently() {
        let ages = [
            (json!("34"), Some(34)),
            (json!(34.5), Some(34)),
            (json!(" 41 "), Some(41)),
            (json!(""), None),
            (json!("thirty"), None),
            (json!(-3), None),
            (json!(null), None),
        ];
        for (age, expected) in ages {
            let profile: UserProfile =
                serde_json::from_value(json!({"name": "Asha", "age": age.clone()})).unwrap();
            assert_eq!(profile.age, expected, "age {}", age);
            assert_eq!(profile.name.as_deref(), Some("Asha"));
        }
    }

    #[test]
    fn test_wrong_typed_profile_fields_read_as_absent() {
        let snapshot: AssessmentSnapshot = serde_json::from_value(json!({
            "user_profile": {"name": 42, "email": ["a@b.c"], "gender": {"x": 1}},
            "dosha_results": {"Vata": 1.0}
        }))
        .unwrap();
        assert_eq!(snapshot.user_profile, UserProfile::default());

        let snapshot: AssessmentSnapshot = serde_json::from_value(json!({
            "user_profile": "Asha",
            "dosha_results": {"Vata": 1.0}
        }))
        .unwrap();
        assert_eq!(snapshot.user_profile, UserProfile::default());
    }

    #[test]
    fn test_dosha_result_accepts_percentages_envelope() {
        let input = json!({
            "percentages": {"vata": 45.5, "pitta": 30.0, "kapha": 24.5},
            "dominant_dosha": "vata",
            "secondary_dosha": "pitta"
        });
        let result: DoshaResult = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(result.shares[&Dosha::Vata], 45.5);
        assert_eq!(result.shares[&Dosha::Kapha], 24.5);
        assert_eq!(serde_json::to_value(&result).unwrap(), input);
    }

    #[test]
    fn test_percentages_envelope_with_unknown_axis_is_rejected() {
        let result: Result<DoshaResult, _> =
            serde_json::from_value(json!({"percentages": {"ether": 10.0}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_therapy_without_name_is_accepted() {
        let recs: PanchakarmaRecommendation = serde_json::from_value(json!({
            "therapy_details": [{"description": "Oil massage"}, {"name": "Basti"}]
        }))
        .unwrap();
        assert_eq!(recs.therapy_details.len(), 2);
        assert!(recs.therapy_details[0].name.is_empty());
    }

    #[test]
    fn test_dosha_result_rejects_unknown_axis() {
        let result: Result<DoshaResult, _> = serde_json::from_value(json!({"Ether": 1.0}));
        assert!(result.is_err());
    }

    #[test]
    fn test_dosha_validation() {
        assert!(DoshaResult::new([(Dosha::Vata, 0.4)]).validate().is_ok());
        assert!(DoshaResult::default().validate().is_err());
        assert!(DoshaResult::new([(Dosha::Kapha, -0.1)]).validate().is_err());
        assert!(DoshaResult::new([(Dosha::Pitta, f64::NAN)]).validate().is_err());
    }

    #[test]
    fn test_ranked_breaks_ties_in_axis_order() {
        let result = DoshaResult::new([(Dosha::Kapha, 0.4), (Dosha::Pitta, 0.4), (Dosha::Vata, 0.2)]);
        let ranked: Vec<Dosha> = result.ranked().into_iter().map(|(d, _)| d).collect();
        assert_eq!(ranked, vec![Dosha::Pitta, Dosha::Kapha, Dosha::Vata]);
    }

    #[test]
    fn test_recommendation_preserves_unknown_fields() {
        let input = json!({
            "therapy_details": [{"name": "Basti", "description": "Medicated enema", "code": 7}],
            "primary": ["Basti", "Nasya"]
        });
        let recs: PanchakarmaRecommendation = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(recs.therapy_details[0].extra["code"], 7);
        assert_eq!(serde_json::to_value(&recs).unwrap(), input);
    }

    #[test]
    fn test_download_state_serialization() {
        let state = DownloadState::Failed {
            attempt_id: Uuid::nil(),
            reason: "Failed to generate PDF".to_string(),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["reason"], "Failed to generate PDF");
        assert_eq!(serde_json::to_value(DownloadState::Idle).unwrap(), json!({"state": "idle"}));
    }
}
