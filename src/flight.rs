use serde::{Deserialize, Serialize};
use std::path::Path;

const INTERNATIONAL_CITIES: [&str; 10] = [
    "Paris",
    "London",
    "Tokyo",
    "Frankfurt",
    "Amsterdam",
    "Dubai",
    "Madrid",
    "Rome",
    "Barcelona",
    "Munich",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlightRecord {
    pub id: String,
    pub flight_number: String,
    pub airline: String,
    pub departure_city: String,
    pub arrival_city: String,
    #[serde(default)]
    pub departure_airport: String,
    #[serde(default)]
    pub arrival_airport: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub date: String,
    pub price: f64,
    pub aircraft_type: String,
    pub available_seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_estimate: Option<String>,
    #[serde(default = "default_class_options")]
    pub class_options: Vec<String>,
}

fn default_class_options() -> Vec<String> {
    vec!["Economy".to_string()]
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FlightError {
    #[error("flight id is empty")]
    EmptyId,
    #[error("flight {0}: price must be a finite non-negative number")]
    InvalidPrice(String),
}

impl FlightRecord {
    pub fn validate(&self) -> Result<(), FlightError> {
        if self.id.trim().is_empty() {
            return Err(FlightError::EmptyId);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(FlightError::InvalidPrice(self.id.clone()));
        }
        Ok(())
    }

    pub fn route_type(&self) -> &'static str {
        let international = INTERNATIONAL_CITIES
            .iter()
            .any(|c| *c == self.departure_city || *c == self.arrival_city);
        if international {
            "international flight"
        } else {
            "domestic flight"
        }
    }

    pub fn price_category(&self) -> &'static str {
        match self.price {
            p if p < 200.0 => "budget",
            p if p < 500.0 => "economy",
            p if p < 1000.0 => "premium",
            _ => "luxury",
        }
    }

    /// Text indexed for nearest-neighbour retrieval. Phrases mirror the ways
    /// travellers ask for a flight so that queries land close to it.
    pub fn document_text(&self) -> String {
        let from = &self.departure_city;
        let to = &self.arrival_city;
        let duration = self.duration_estimate.as_deref().unwrap_or("N/A");
        let classes = if self.class_options.is_empty() {
            "Economy".to_string()
        } else {
            self.class_options.join(", ")
        };
        let parts = [
            format!("Flight from {from} to {to}"),
            format!("{from} {to} route"),
            format!("{} to {}", self.departure_airport, self.arrival_airport),
            format!("{} flight {}", self.airline, self.flight_number),
            format!("{} service", self.airline),
            format!("{} aircraft", self.aircraft_type),
            format!(
                "Departure {} arrival {}",
                self.departure_time, self.arrival_time
            ),
            format!("Flight on {}", self.date),
            format!("Duration approximately {duration}"),
            format!("Price ${} per person", self.price),
            format!("{} seats available", self.available_seats),
            format!("cheap flights {from} {to}"),
            format!("direct flight {from} to {to}"),
            format!("book flight {from} {to}"),
            self.route_type().to_string(),
            format!("Available classes: {classes}"),
        ];
        parts.join(" | ")
    }

    /// Every record field plus the derived `route_type` and `price_category`.
    pub fn metadata(&self) -> serde_json::Value {
        let mut meta = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = meta.as_object_mut() {
            obj.insert("route_type".into(), self.route_type().into());
            obj.insert("price_category".into(), self.price_category().into());
        }
        meta
    }
}

pub fn load_dataset(path: impl AsRef<Path>) -> anyhow::Result<Vec<FlightRecord>> {
    use anyhow::Context;

    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("read dataset {}", path.display()))?;
    let flights: Vec<FlightRecord> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse dataset {}", path.display()))?;
    Ok(flights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlightRecord {
        FlightRecord {
            id: "flight_001".into(),
            flight_number: "AA100".into(),
            airline: "American Airlines".into(),
            departure_city: "New York".into(),
            arrival_city: "Paris".into(),
            departure_airport: "JFK".into(),
            arrival_airport: "CDG".into(),
            departure_time: "18:30".into(),
            arrival_time: "07:45".into(),
            date: "2025-03-01".into(),
            price: 845.5,
            aircraft_type: "Boeing 777".into(),
            available_seats: 42,
            duration_estimate: Some("7h 15m".into()),
            class_options: vec!["Economy".into(), "Business".into()],
        }
    }

    #[test]
    fn metadata_carries_fields_and_derived_values() {
        let meta = sample().metadata();
        assert_eq!(meta["flight_number"], "AA100");
        assert_eq!(meta["price"], 845.5);
        assert_eq!(meta["available_seats"], 42);
        assert_eq!(meta["route_type"], "international flight");
        assert_eq!(meta["price_category"], "premium");
        assert_eq!(meta["class_options"][1], "Business");
    }

    #[test]
    fn document_text_mentions_route_and_flight_number() {
        let text = sample().document_text();
        assert!(text.contains("Flight from New York to Paris"));
        assert!(text.contains("American Airlines flight AA100"));
        assert!(text.contains("Available classes: Economy, Business"));
    }

    #[test]
    fn validation_rejects_negative_price_and_empty_id() {
        let mut f = sample();
        f.price = -1.0;
        assert_eq!(
            f.validate(),
            Err(FlightError::InvalidPrice("flight_001".into()))
        );
        let mut f = sample();
        f.id = " ".into();
        assert_eq!(f.validate(), Err(FlightError::EmptyId));
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let raw = serde_json::json!({
            "id": "f1", "flight_number": "DL101", "airline": "Delta Air Lines",
            "departure_city": "Boston", "arrival_city": "Miami",
            "departure_time": "08:00", "arrival_time": "11:15", "date": "2025-03-02",
            "price": 199.0, "aircraft_type": "Boeing 737", "available_seats": 10
        });
        let f: FlightRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(f.class_options, vec!["Economy".to_string()]);
        assert_eq!(f.departure_airport, "");
        assert_eq!(f.route_type(), "domestic flight");
        assert_eq!(f.price_category(), "budget");
    }
}
