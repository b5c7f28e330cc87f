//! Trip preferences collected from the planning form

use std::fmt;

use chrono::{NaiveDate, TimeDelta, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::GolfTripError;

/// Allowed trip length in days
pub const DAYS_RANGE: std::ops::RangeInclusive<u8> = 2..=7;
/// Allowed group size
pub const GOLFERS_RANGE: std::ops::RangeInclusive<u8> = 1..=32;

/// Destination region for the trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Region {
    #[serde(rename = "Mesquite, NV")]
    Mesquite,
    #[serde(rename = "St. George, UT")]
    StGeorge,
    #[serde(rename = "Las Vegas, NV")]
    LasVegas,
    #[serde(rename = "Scottsdale, AZ")]
    Scottsdale,
    #[serde(rename = "Palm Springs, CA")]
    PalmSprings,
}

/// Green fee tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum GolfBudget {
    Value,
    #[serde(rename = "Mid-Range")]
    MidRange,
    Luxury,
}

/// Lodging tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum LodgingBudget {
    #[serde(rename = "Casino/Value")]
    CasinoValue,
    #[serde(rename = "Condo/Mid-Range")]
    CondoMidRange,
    #[serde(rename = "Resort/Luxury")]
    ResortLuxury,
}

/// Dining style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum DiningPreference {
    #[serde(rename = "Casual/Pub")]
    CasualPub,
    Mix,
    #[serde(rename = "Fine Dining")]
    FineDining,
}

/// How the group moves between courses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum TransportType {
    #[serde(rename = "Self-Drive")]
    SelfDrive,
    #[serde(rename = "Private Shuttle/SUV")]
    PrivateShuttle,
    #[serde(rename = "Luxury Coach")]
    LuxuryCoach,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Mesquite,
        Region::StGeorge,
        Region::LasVegas,
        Region::Scottsdale,
        Region::PalmSprings,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Region::Mesquite => "Mesquite, NV",
            Region::StGeorge => "St. George, UT",
            Region::LasVegas => "Las Vegas, NV",
            Region::Scottsdale => "Scottsdale, AZ",
            Region::PalmSprings => "Palm Springs, CA",
        }
    }
}

impl GolfBudget {
    pub const ALL: [GolfBudget; 3] = [GolfBudget::Value, GolfBudget::MidRange, GolfBudget::Luxury];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GolfBudget::Value => "Value",
            GolfBudget::MidRange => "Mid-Range",
            GolfBudget::Luxury => "Luxury",
        }
    }
}

impl LodgingBudget {
    pub const ALL: [LodgingBudget; 3] = [
        LodgingBudget::CasinoValue,
        LodgingBudget::CondoMidRange,
        LodgingBudget::ResortLuxury,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            LodgingBudget::CasinoValue => "Casino/Value",
            LodgingBudget::CondoMidRange => "Condo/Mid-Range",
            LodgingBudget::ResortLuxury => "Resort/Luxury",
        }
    }
}

impl DiningPreference {
    pub const ALL: [DiningPreference; 3] = [
        DiningPreference::CasualPub,
        DiningPreference::Mix,
        DiningPreference::FineDining,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DiningPreference::CasualPub => "Casual/Pub",
            DiningPreference::Mix => "Mix",
            DiningPreference::FineDining => "Fine Dining",
        }
    }
}

impl TransportType {
    pub const ALL: [TransportType; 3] = [
        TransportType::SelfDrive,
        TransportType::PrivateShuttle,
        TransportType::LuxuryCoach,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TransportType::SelfDrive => "Self-Drive",
            TransportType::PrivateShuttle => "Private Shuttle/SUV",
            TransportType::LuxuryCoach => "Luxury Coach",
        }
    }
}

macro_rules! display_via_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_via_label!(Region, GolfBudget, LodgingBudget, DiningPreference, TransportType);

/// User-editable trip parameters
///
/// Fields are mutated freely by the form; bounds are only enforced by
/// [`TripPreferences::validate`] when an itinerary is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPreferences {
    /// Trip length in days (2-7)
    pub days: u8,
    /// Number of golfers in the group (1-32)
    pub golfers: u8,
    /// First day of the trip
    pub start_date: NaiveDate,
    pub region: Region,
    pub golf_budget: GolfBudget,
    pub lodging_budget: LodgingBudget,
    pub dining_preference: DiningPreference,
    pub transport_type: TransportType,
}

impl Default for TripPreferences {
    fn default() -> Self {
        Self {
            days: 4,
            golfers: 4,
            start_date: Utc::now().date_naive() + TimeDelta::days(30),
            region: Region::Mesquite,
            golf_budget: GolfBudget::MidRange,
            lodging_budget: LodgingBudget::CondoMidRange,
            dining_preference: DiningPreference::Mix,
            transport_type: TransportType::SelfDrive,
        }
    }
}

impl TripPreferences {
    /// Last day of the trip (inclusive)
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + TimeDelta::days(i64::from(self.days.saturating_sub(1)))
    }

    /// Check the numeric bounds of the form fields
    pub fn validate(&self) -> crate::Result<()> {
        if !DAYS_RANGE.contains(&self.days) {
            return Err(GolfTripError::validation(format!(
                "Trip length must be between {} and {} days, got: {}",
                DAYS_RANGE.start(),
                DAYS_RANGE.end(),
                self.days
            )));
        }

        if !GOLFERS_RANGE.contains(&self.golfers) {
            return Err(GolfTripError::validation(format!(
                "Group size must be between {} and {} golfers, got: {}",
                GOLFERS_RANGE.start(),
                GOLFERS_RANGE.end(),
                self.golfers
            )));
        }

        Ok(())
    }
}

/// Choices offered by the planning form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub min_days: u8,
    pub max_days: u8,
    pub min_golfers: u8,
    pub max_golfers: u8,
    pub regions: Vec<&'static str>,
    pub golf_budgets: Vec<&'static str>,
    pub lodging_budgets: Vec<&'static str>,
    pub dining_preferences: Vec<&'static str>,
    pub transport_types: Vec<&'static str>,
}

impl FormOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_days: *DAYS_RANGE.start(),
            max_days: *DAYS_RANGE.end(),
            min_golfers: *GOLFERS_RANGE.start(),
            max_golfers: *GOLFERS_RANGE.end(),
            regions: Region::ALL.iter().map(|r| r.label()).collect(),
            golf_budgets: GolfBudget::ALL.iter().map(|b| b.label()).collect(),
            lodging_budgets: LodgingBudget::ALL.iter().map(|b| b.label()).collect(),
            dining_preferences: DiningPreference::ALL.iter().map(|d| d.label()).collect(),
            transport_types: TransportType::ALL.iter().map(|t| t.label()).collect(),
        }
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn preferences(days: u8, golfers: u8) -> TripPreferences {
        TripPreferences {
            days,
            golfers,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            ..TripPreferences::default()
        }
    }

    #[rstest]
    #[case(2, 1)]
    #[case(7, 32)]
    #[case(4, 12)]
    fn test_bounds_accepted(#[case] days: u8, #[case] golfers: u8) {
        assert!(preferences(days, golfers).validate().is_ok());
    }

    #[rstest]
    #[case(1, 4, "Trip length")]
    #[case(8, 4, "Trip length")]
    #[case(4, 0, "Group size")]
    #[case(4, 33, "Group size")]
    fn test_bounds_rejected(#[case] days: u8, #[case] golfers: u8, #[case] expected: &str) {
        let err = preferences(days, golfers).validate().unwrap_err();
        assert!(matches!(err, GolfTripError::Validation { .. }));
        assert!(err.to_string().contains(expected));
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let prefs = preferences(3, 4);
        assert_eq!(prefs.end_date(), NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());
    }

    #[test]
    fn test_default_is_valid() {
        let prefs = TripPreferences::default();
        assert!(prefs.validate().is_ok());
        assert!(prefs.start_date > Utc::now().date_naive());
    }

    #[test]
    fn test_json_uses_form_labels() {
        let prefs = preferences(3, 8);
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["startDate"], "2026-03-10");
        assert_eq!(json["region"], "Mesquite, NV");
        assert_eq!(json["golfBudget"], "Mid-Range");
        assert_eq!(json["lodgingBudget"], "Condo/Mid-Range");
        assert_eq!(json["transportType"], "Self-Drive");

        let parsed: TripPreferences = serde_json::from_value(serde_json::json!({
            "days": 5,
            "golfers": 16,
            "startDate": "2026-04-01",
            "region": "Palm Springs, CA",
            "golfBudget": "Luxury",
            "lodgingBudget": "Resort/Luxury",
            "diningPreference": "Fine Dining",
            "transportType": "Luxury Coach"
        }))
        .unwrap();
        assert_eq!(parsed.region, Region::PalmSprings);
        assert_eq!(parsed.dining_preference, DiningPreference::FineDining);
        assert_eq!(parsed.transport_type, TransportType::LuxuryCoach);
    }

    #[test]
    fn test_labels_match_serde_names() {
        for region in Region::ALL {
            assert_eq!(serde_json::to_value(region).unwrap(), region.label());
        }
        for budget in LodgingBudget::ALL {
            assert_eq!(serde_json::to_value(budget).unwrap(), budget.to_string());
        }
    }

    #[test]
    fn test_form_options() {
        let options = FormOptions::new();
        assert_eq!(options.min_days, 2);
        assert_eq!(options.max_golfers, 32);
        assert_eq!(options.golf_budgets, vec!["Value", "Mid-Range", "Luxury"]);
        assert_eq!(options.regions.len(), 5);
    }
}
