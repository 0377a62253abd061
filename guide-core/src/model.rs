use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A point of interest as shown in the guide list and details view.
///
/// Fields written by hand in the backend are loosely typed: numbers may be
/// stored as strings and text as numbers, so every field decodes leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRecord {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub entry_fee: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub best_time: Option<String>,

    /// Any other document fields, kept as the store returned them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A number, or a string holding one; anything else is absent.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A string, or a scalar rendered as one; anything else is absent.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_string(d)?.unwrap_or_default())
}

const DEFAULT_RECOMMENDATIONS: [&str; 3] =
    ["Explore and enjoy!", "Take photos", "Learn about local culture"];

impl GuideRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn rating_label(&self) -> String {
        self.rating.map_or_else(|| "N/A".to_string(), |r| r.to_string())
    }

    pub fn entry_fee_label(&self) -> &str {
        self.entry_fee.as_deref().unwrap_or("Free")
    }

    pub fn best_time_label(&self) -> &str {
        self.best_time.as_deref().unwrap_or("Anytime")
    }

    /// Link that opens the spot in a web map.
    pub fn maps_url(&self) -> String {
        match self.coordinates() {
            Some((lat, lon)) => {
                format!("https://www.google.com/maps/search/?api=1&query={lat},{lon}")
            }
            None => "https://www.google.com/maps/search/?api=1&query=Bohol,Philippines".to_string(),
        }
    }

    /// Visitor tips for the spot; unknown ids get generic advice.
    pub fn recommendations(&self) -> [&'static str; 3] {
        match self.id.as_str() {
            "1" => [
                "Visit during dry season for best views",
                "Hire a local guide for hiking trails",
                "Try the famous Boholano cuisine nearby",
            ],
            "2" => [
                "Book beachfront resorts in advance",
                "Try water sports and diving",
                "Visit nearby Alona Beach for nightlife",
            ],
            "3" => [
                "Book guided tours in advance",
                "Visit early morning when tarsiers are most active",
                "Support conservation efforts",
            ],
            "4" => [
                "Book cruise tickets online",
                "Try the floating restaurant experience",
                "Enjoy traditional music performances",
            ],
            "5" => [
                "Visit early morning to avoid crowds",
                "Explore the museum inside",
                "Learn about Philippine colonial history",
            ],
            "6" => [
                "Wear comfortable hiking shoes",
                "Visit during wet season for full flow",
                "Swim in the natural pools",
            ],
            "7" => [
                "Learn about Philippine-Spanish history",
                "Visit the nearby museum",
                "Perfect for history enthusiasts",
            ],
            "8" => [
                "Try the organic honey products",
                "Visit the butterfly garden",
                "Educational experience for all ages",
            ],
            "9" => [
                "Relax on the pristine white sands",
                "Explore nearby caves and coves",
                "Enjoy fresh seafood at local eateries",
            ],
            _ => DEFAULT_RECOMMENDATIONS,
        }
    }
}

/// What the caller wants weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates { latitude: f64, longitude: f64 },
    /// `"<city>,<country-code>"`, e.g. `"Tagbilaran,PH"`.
    City(String),
}

/// Current conditions in the one shape every provider is mapped into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub provider: String,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: Option<f64>,
    /// Metres per second, whatever unit the provider reports in.
    pub wind_speed_mps: f64,
    pub location_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> GuideRecord {
        GuideRecord {
            id: id.to_string(),
            title: "Somewhere".to_string(),
            description: String::new(),
            location: "Bohol".to_string(),
            latitude: None,
            longitude: None,
            rating: None,
            entry_fee: None,
            best_time: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn labels_fall_back_to_placeholders() {
        let r = record("42");
        assert_eq!(r.rating_label(), "N/A");
        assert_eq!(r.entry_fee_label(), "Free");
        assert_eq!(r.best_time_label(), "Anytime");
    }

    #[test]
    fn labels_use_present_values() {
        let mut r = record("1");
        r.rating = Some(4.8);
        r.entry_fee = Some("₱150".to_string());
        r.best_time = Some("Dry season".to_string());

        assert_eq!(r.rating_label(), "4.8");
        assert_eq!(r.entry_fee_label(), "₱150");
        assert_eq!(r.best_time_label(), "Dry season");
    }

    #[test]
    fn coordinates_need_both_values() {
        let mut r = record("1");
        r.latitude = Some(9.8297);
        assert_eq!(r.coordinates(), None);
        assert!(r.maps_url().ends_with("query=Bohol,Philippines"));

        r.longitude = Some(124.1397);
        assert_eq!(r.coordinates(), Some((9.8297, 124.1397)));
        assert!(r.maps_url().ends_with("query=9.8297,124.1397"));
    }

    #[test]
    fn unknown_ids_get_generic_recommendations() {
        assert_eq!(record("zzz").recommendations(), DEFAULT_RECOMMENDATIONS);
        assert_eq!(record("3").recommendations()[1], "Visit early morning when tarsiers are most active");
    }

    #[test]
    fn deserializes_camel_case_and_keeps_extra_fields() {
        let json = serde_json::json!({
            "id": "abc",
            "title": "Loboc",
            "location": "Bohol",
            "entryFee": "₱1,200",
            "bestTime": "Lunch time",
            "category": "Adventure"
        });

        let r: GuideRecord = serde_json::from_value(json).expect("valid record");
        assert_eq!(r.entry_fee.as_deref(), Some("₱1,200"));
        assert_eq!(r.best_time.as_deref(), Some("Lunch time"));
        assert_eq!(r.extra.get("category"), Some(&serde_json::json!("Adventure")));
        assert!(r.description.is_empty());
    }

    #[test]
    fn loosely_typed_fields_still_decode() {
        let json = serde_json::json!({
            "id": "odd",
            "title": 42,
            "location": "Bohol",
            "latitude": "9.6268",
            "longitude": 123.8056,
            "rating": "4.8",
            "entryFee": 150,
            "bestTime": null
        });

        let r: GuideRecord = serde_json::from_value(json).expect("lenient record");
        assert_eq!(r.title, "42");
        assert_eq!(r.coordinates(), Some((9.6268, 123.8056)));
        assert_eq!(r.rating, Some(4.8));
        assert_eq!(r.entry_fee.as_deref(), Some("150"));
        assert_eq!(r.best_time, None);
    }

    #[test]
    fn unparseable_numbers_are_absent() {
        let json = serde_json::json!({
            "id": "x",
            "rating": "excellent",
            "latitude": { "lat": 1 },
            "description": ["not", "text"]
        });

        let r: GuideRecord = serde_json::from_value(json).expect("lenient record");
        assert_eq!(r.rating, None);
        assert_eq!(r.rating_label(), "N/A");
        assert_eq!(r.latitude, None);
        assert!(r.description.is_empty());
    }
}
