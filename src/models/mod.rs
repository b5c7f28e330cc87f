//! Data models for the GolfTrip application
//!
//! This module contains the core domain models organized by concern:
//! - Preferences: Form state the user edits before requesting a trip
//! - Itinerary: The generated trip document and its parts

pub mod itinerary;
pub mod preferences;

// Re-export all public types for convenient access
pub use itinerary::{BudgetBreakdown, DayPlan, DemandLevel, TripResult, WeatherOutlook};
pub use preferences::{
    DiningPreference, FormOptions, GolfBudget, LodgingBudget, Region, TransportType,
    TripPreferences,
};
