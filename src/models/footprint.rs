use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::KG_CO2_PER_REWARD_POINT;

/// Footprint record stored in redb
/// Uses Unix timestamps for compact storage with bincode; the footprint
/// id is the table key and is not duplicated inside the record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintRecord {
    /// Owner of the entry (opaque, no referential integrity)
    pub user_id: String,
    /// Free-form activity description
    pub activity: String,
    /// Kilograms of CO2-equivalent, may be fractional
    pub carbon_emissions: f64,
    /// Derived from carbon_emissions, never caller-supplied
    pub reward_points: i64,
    /// When the entry was created (Unix timestamp)
    pub created_at: i64,
    /// When the entry was last updated; None until the first update
    pub updated_at: Option<i64>,
}

/// Footprint model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub activity: String,
    #[serde(rename = "carbonEmissions")]
    pub carbon_emissions: f64,
    #[serde(rename = "rewardPoints")]
    pub reward_points: i64,
    /// RFC 3339 creation time
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// RFC 3339 last-update time, absent until the first update
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Payload for creating a footprint
///
/// Only these fields are accepted; anything else in the request body
/// (including a caller-supplied id, reward points or timestamps) is
/// dropped by typed deserialization.
#[derive(Debug, Deserialize)]
pub struct NewFootprint {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub activity: String,
    #[serde(rename = "carbonEmissions")]
    pub carbon_emissions: f64,
}

/// Partial update for a footprint; omitted fields keep their stored value
#[derive(Debug, Default, Deserialize)]
pub struct FootprintPatch {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub activity: Option<String>,
    #[serde(rename = "carbonEmissions")]
    pub carbon_emissions: Option<f64>,
}

impl FootprintRecord {
    /// Reward points for an emissions value: one point per 10 kg CO2, floor-rounded
    pub fn reward_points(carbon_emissions: f64) -> i64 {
        (carbon_emissions / KG_CO2_PER_REWARD_POINT).floor() as i64
    }

    /// Merge a patch over this record, field by field
    ///
    /// Patch fields win; omitted fields are left unchanged. Reward points
    /// are recomputed from the merged emissions value, so a patch that
    /// omits emissions never zeroes the derived field.
    pub fn apply_patch(&mut self, patch: FootprintPatch) {
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(activity) = patch.activity {
            self.activity = activity;
        }
        if let Some(carbon_emissions) = patch.carbon_emissions {
            self.carbon_emissions = carbon_emissions;
        }
        self.reward_points = Self::reward_points(self.carbon_emissions);
    }
}

impl Footprint {
    /// Build the API model from a table key and its stored record
    pub fn from_record(id: String, record: FootprintRecord) -> Self {
        Self {
            id,
            user_id: record.user_id,
            activity: record.activity,
            carbon_emissions: record.carbon_emissions,
            reward_points: record.reward_points,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: record.updated_at.map(timestamp_to_rfc3339),
        }
    }
}

/// Convert Unix timestamp to RFC3339 string, defaulting to now if invalid
fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FootprintRecord {
        FootprintRecord {
            user_id: "u1".to_string(),
            activity: "bike".to_string(),
            carbon_emissions: 25.0,
            reward_points: 2,
            created_at: 1733788800,
            updated_at: None,
        }
    }

    #[test]
    fn test_reward_points_floor() {
        assert_eq!(FootprintRecord::reward_points(25.0), 2);
        assert_eq!(FootprintRecord::reward_points(47.0), 4);
        assert_eq!(FootprintRecord::reward_points(9.9), 0);
        assert_eq!(FootprintRecord::reward_points(10.0), 1);
        assert_eq!(FootprintRecord::reward_points(0.0), 0);
    }

    #[test]
    fn test_reward_points_negative_emissions() {
        // No lower bound is enforced on emissions; floor truncates toward
        // negative infinity, so negative emissions yield negative points
        assert_eq!(FootprintRecord::reward_points(-25.0), -3);
        assert_eq!(FootprintRecord::reward_points(-10.0), -1);
    }

    #[test]
    fn test_apply_patch_merges_supplied_fields() {
        let mut record = sample_record();
        record.apply_patch(FootprintPatch {
            user_id: None,
            activity: Some("train".to_string()),
            carbon_emissions: Some(47.0),
        });

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.activity, "train");
        assert_eq!(record.carbon_emissions, 47.0);
        assert_eq!(record.reward_points, 4);
    }

    #[test]
    fn test_apply_patch_without_emissions_keeps_points() {
        let mut record = sample_record();
        record.apply_patch(FootprintPatch {
            activity: Some("bus".to_string()),
            ..Default::default()
        });

        assert_eq!(record.carbon_emissions, 25.0);
        assert_eq!(record.reward_points, 2);
    }

    #[test]
    fn test_record_serialization() {
        let record = sample_record();

        // Verify bincode serialization works
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&record, config).unwrap();
        let (deserialized, _): (FootprintRecord, usize) =
            bincode::serde::decode_from_slice(&bytes, config).unwrap();

        assert_eq!(record.user_id, deserialized.user_id);
        assert_eq!(record.activity, deserialized.activity);
        assert_eq!(record.carbon_emissions, deserialized.carbon_emissions);
        assert_eq!(record.reward_points, deserialized.reward_points);
        assert_eq!(record.created_at, deserialized.created_at);
        assert_eq!(record.updated_at, deserialized.updated_at);
    }

    #[test]
    fn test_patch_deserializes_with_missing_fields() {
        let patch: FootprintPatch = serde_json::from_str(r#"{"activity":"bus"}"#).unwrap();
        assert!(patch.user_id.is_none());
        assert_eq!(patch.activity.as_deref(), Some("bus"));
        assert!(patch.carbon_emissions.is_none());
    }
}
