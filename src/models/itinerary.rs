//! Generated trip document returned by the itinerary service
//!
//! These types only describe the shape of the generated document. Nothing in
//! them is computed locally apart from the contact link, which is stamped
//! after parsing.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Complete generated trip plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResult {
    pub title: String,
    pub summary: String,
    pub transport_recommendation: String,
    /// One entry per trip day, in order
    pub itinerary: Vec<DayPlan>,
    pub budget: BudgetBreakdown,
    pub upsells: Vec<String>,
    pub weather: WeatherOutlook,
    pub why_this_plan: String,
    /// Booking contact, always replaced with the fixed contact URL
    #[serde(default)]
    pub contact_link: String,
}

/// A single day of the itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    /// Day number, starting at 1
    #[serde(default)]
    pub day: u32,
    pub morning_activity: String,
    pub afternoon_activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub course_amenities: Vec<String>,
    pub lodging: String,
    pub dining: String,
    pub travel_notes: String,
    /// Driving distance for the day in miles
    pub travel_distance_miles: u32,
    /// Driving time for the day in minutes
    pub travel_time_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistics_warning: Option<String>,
}

/// Per-person cost estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBreakdown {
    pub golf_cost: f64,
    pub lodging_cost: f64,
    pub dining_cost: f64,
    pub transport_cost: f64,
    pub total_per_person: f64,
    pub currency: String,
    pub demand_level: DemandLevel,
    pub pricing_rationale: String,
}

/// Seasonal demand used to justify the price estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandLevel {
    Low,
    Moderate,
    High,
    Peak,
}

impl DemandLevel {
    pub const ALL: [DemandLevel; 4] = [
        DemandLevel::Low,
        DemandLevel::Moderate,
        DemandLevel::High,
        DemandLevel::Peak,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DemandLevel::Low => "Low",
            DemandLevel::Moderate => "Moderate",
            DemandLevel::High => "High",
            DemandLevel::Peak => "Peak",
        }
    }
}

/// Expected conditions during the trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherOutlook {
    pub summary: String,
    pub average_temp: String,
    pub precipitation_chance: String,
    pub recommended_gear: Vec<String>,
}

impl DayPlan {
    /// Format the travel leg, e.g. "45 mi / 1h 05m"
    #[must_use]
    pub fn format_travel(&self) -> String {
        let hours = self.travel_time_minutes / 60;
        let minutes = self.travel_time_minutes % 60;
        if hours > 0 {
            format!("{} mi / {}h {:02}m", self.travel_distance_miles, hours, minutes)
        } else {
            format!("{} mi / {}m", self.travel_distance_miles, minutes)
        }
    }
}

impl Display for TripResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "⛳ {}", self.title)?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "🚐 {}", self.transport_recommendation)?;

        for (index, day) in self.itinerary.iter().enumerate() {
            let number = if day.day == 0 { index as u32 + 1 } else { day.day };
            writeln!(f)?;
            writeln!(f, "Day {number}")?;
            writeln!(f, "   🌅 {}", day.morning_activity)?;
            writeln!(f, "   ☀️ {}", day.afternoon_activity)?;
            if let Some(difficulty) = &day.course_difficulty {
                writeln!(f, "   📈 Difficulty: {difficulty}")?;
            }
            writeln!(f, "   🏨 {}", day.lodging)?;
            writeln!(f, "   🍽️ {}", day.dining)?;
            writeln!(f, "   🗺️ {} ({})", day.travel_notes, day.format_travel())?;
            if let Some(warning) = &day.logistics_warning {
                writeln!(f, "   ⚠️ {warning}")?;
            }
        }

        let budget = &self.budget;
        writeln!(f)?;
        writeln!(
            f,
            "💰 {:.0} {} per person (demand: {})",
            budget.total_per_person,
            budget.currency,
            budget.demand_level.as_str()
        )?;
        writeln!(
            f,
            "   golf {:.0} · lodging {:.0} · dining {:.0} · transport {:.0}",
            budget.golf_cost, budget.lodging_cost, budget.dining_cost, budget.transport_cost
        )?;
        writeln!(f, "   {}", budget.pricing_rationale)?;

        writeln!(f)?;
        writeln!(
            f,
            "🌤️ {} ({}, {} chance of rain)",
            self.weather.summary, self.weather.average_temp, self.weather.precipitation_chance
        )?;
        if !self.weather.recommended_gear.is_empty() {
            writeln!(f, "   Pack: {}", self.weather.recommended_gear.join(", "))?;
        }

        if !self.upsells.is_empty() {
            writeln!(f)?;
            writeln!(f, "✨ Add-ons:")?;
            for upsell in &self.upsells {
                writeln!(f, "   - {upsell}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", self.why_this_plan)?;
        write!(f, "📞 Book: {}", self.contact_link)
    }
}
