//! Prompt and response schema sent to the itinerary service

use serde_json::{Value, json};

use crate::generation::GenerationRequest;
use crate::models::{DemandLevel, TripPreferences};

/// Build the generation request for a set of preferences
#[must_use]
pub fn build_request(preferences: &TripPreferences) -> GenerationRequest {
    GenerationRequest::json(build_prompt(preferences), response_schema())
}

/// Natural-language instructions describing the trip to plan
#[must_use]
pub fn build_prompt(preferences: &TripPreferences) -> String {
    let start = preferences.start_date.format("%B %-d, %Y");
    let end = preferences.end_date().format("%B %-d, %Y");

    format!(
        "You are an expert golf travel planner. Create a {days}-day golf trip itinerary \
for a group of {golfers} golfer(s) in {region}, from {start} to {end}.\n\
\n\
Preferences:\n\
- Golf budget: {golf}\n\
- Lodging: {lodging}\n\
- Dining: {dining}\n\
- Transportation: {transport}\n\
\n\
Logistics rules:\n\
- Cluster each day's course, lodging and dining to keep driving short.\n\
- Give realistic driving distance in miles and time in minutes for every day.\n\
- Add a logistics warning when a day needs more than 60 minutes of driving, \
crosses a state or time-zone line, or has a tight tee-time connection.\n\
- Match the transportation style to the group size of {golfers}.\n\
\n\
Pricing rules:\n\
- Estimate per-person costs in USD for golf, lodging, dining and transport.\n\
- Apply dynamic pricing for the travel dates: classify demand as one of {levels} \
and explain the pricing in pricingRationale.\n\
\n\
Also include typical weather for the dates with recommended gear, two to four \
relevant upsells, and a short explanation of why this plan fits the group. \
Return exactly {days} itinerary days.",
        days = preferences.days,
        golfers = preferences.golfers,
        region = preferences.region,
        start = start,
        end = end,
        golf = preferences.golf_budget,
        lodging = preferences.lodging_budget,
        dining = preferences.dining_preference,
        transport = preferences.transport_type,
        levels = DemandLevel::ALL.map(DemandLevel::as_str).join(", "),
    )
}

/// Declared shape of the generated document
#[must_use]
pub fn response_schema() -> Value {
    let text = json!({"type": "STRING"});
    let integer = json!({"type": "INTEGER"});
    let number = json!({"type": "NUMBER"});
    let text_list = json!({"type": "ARRAY", "items": {"type": "STRING"}});

    let day = json!({
        "type": "OBJECT",
        "properties": {
            "day": integer,
            "morningActivity": text,
            "afternoonActivity": text,
            "courseDescription": text,
            "courseBio": text,
            "courseDifficulty": text,
            "courseAmenities": text_list,
            "lodging": text,
            "dining": text,
            "travelNotes": text,
            "travelDistanceMiles": integer,
            "travelTimeMinutes": integer,
            "logisticsWarning": text
        },
        "required": [
            "day", "morningActivity", "afternoonActivity", "lodging", "dining",
            "travelNotes", "travelDistanceMiles", "travelTimeMinutes"
        ]
    });

    let budget = json!({
        "type": "OBJECT",
        "properties": {
            "golfCost": number,
            "lodgingCost": number,
            "diningCost": number,
            "transportCost": number,
            "totalPerPerson": number,
            "currency": text,
            "demandLevel": {
                "type": "STRING",
                "enum": DemandLevel::ALL.map(DemandLevel::as_str)
            },
            "pricingRationale": text
        },
        "required": [
            "golfCost", "lodgingCost", "diningCost", "transportCost",
            "totalPerPerson", "currency", "demandLevel", "pricingRationale"
        ]
    });

    let weather = json!({
        "type": "OBJECT",
        "properties": {
            "summary": text,
            "averageTemp": text,
            "precipitationChance": text,
            "recommendedGear": text_list
        },
        "required": ["summary", "averageTemp", "precipitationChance", "recommendedGear"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "title": text,
            "summary": text,
            "transportRecommendation": text,
            "itinerary": {"type": "ARRAY", "items": day},
            "budget": budget,
            "upsells": text_list,
            "weather": weather,
            "whyThisPlan": text,
            "contactLink": text
        },
        "required": [
            "title", "summary", "transportRecommendation", "itinerary", "budget",
            "upsells", "weather", "whyThisPlan"
        ]
    })
}
