//! Tree entry domain types

use chrono::{DateTime, NaiveDate, Utc};

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

// == Tree Fields ==
/// The owner-editable content of a tree entry, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeFields {
    pub species: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date_planted: NaiveDate,
    pub photo: Option<String>,
}

impl TreeFields {
    /// True when both entries collide on the per-owner uniqueness tuple.
    pub fn same_planting(&self, other: &TreeFields) -> bool {
        self.species == other.species
            && self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.date_planted == other.date_planted
    }
}

// == Tree Entry ==
/// A persisted tree-planting record.
///
/// `owner_username` is resolved by the store at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub id: u64,
    pub owner_id: u64,
    pub owner_username: String,
    pub fields: TreeFields,
    pub created_at: DateTime<Utc>,
}

impl TreeEntry {
    pub fn is_owned_by(&self, user_id: u64) -> bool {
        self.owner_id == user_id
    }

    /// Human readable summary, used as the GeoJSON feature description.
    pub fn describe(&self) -> String {
        format!(
            "{} planted by {} at ({}, {})",
            self.fields.species, self.owner_username, self.fields.latitude, self.fields.longitude
        )
    }

    /// Coordinates are usable for map output only when both are finite.
    pub fn has_coordinates(&self) -> bool {
        self.fields.latitude.is_finite() && self.fields.longitude.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(species: &str, lat: f64, lon: f64) -> TreeFields {
        TreeFields {
            species: species.to_string(),
            latitude: lat,
            longitude: lon,
            date_planted: NaiveDate::from_ymd_opt(2025, 6, 28).unwrap(),
            photo: None,
        }
    }

    #[test]
    fn test_same_planting_ignores_photo() {
        let a = fields("Oak", 1.0, 2.0);
        let mut b = a.clone();
        b.photo = Some("tree_photos/oak.jpg".to_string());
        assert!(a.same_planting(&b));
    }

    #[test]
    fn test_same_planting_differs_on_any_tuple_field() {
        let a = fields("Oak", 1.0, 2.0);
        assert!(!a.same_planting(&fields("Maple", 1.0, 2.0)));
        assert!(!a.same_planting(&fields("Oak", 1.5, 2.0)));
        assert!(!a.same_planting(&fields("Oak", 1.0, 2.5)));

        let mut later = a.clone();
        later.date_planted = NaiveDate::from_ymd_opt(2025, 6, 29).unwrap();
        assert!(!a.same_planting(&later));
    }

    #[test]
    fn test_describe() {
        let entry = TreeEntry {
            id: 1,
            owner_id: 7,
            owner_username: "alice".to_string(),
            fields: fields("Oak", 45.0, -75.5),
            created_at: Utc::now(),
        };
        assert_eq!(entry.describe(), "Oak planted by alice at (45, -75.5)");
        assert!(entry.is_owned_by(7));
        assert!(!entry.is_owned_by(8));
    }
}
