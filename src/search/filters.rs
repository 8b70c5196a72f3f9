use crate::search::types::SearchResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MINUTES_PER_DAY: i32 = 24 * 60;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericalFilters {
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_duration_hours: Option<f64>,
    #[serde(default)]
    pub min_available_seats: Option<u64>,
    #[serde(default)]
    pub departure_after: Option<String>,
    #[serde(default)]
    pub departure_before: Option<String>,
    #[serde(default)]
    pub arrival_after: Option<String>,
    #[serde(default)]
    pub arrival_before: Option<String>,
}

impl NumericalFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        if self.max_price.is_some() || self.min_price.is_some() {
            let Some(price) = number(metadata.get("price")) else {
                return false;
            };
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
        }

        if let Some(min_seats) = self.min_available_seats {
            match number(metadata.get("available_seats")) {
                Some(seats) if seats >= min_seats as f64 => {}
                _ => return false,
            }
        }

        let departure = metadata
            .get("departure_time")
            .and_then(Value::as_str)
            .and_then(parse_time);
        let arrival = metadata
            .get("arrival_time")
            .and_then(Value::as_str)
            .and_then(parse_time);

        if let Some(minutes) = departure {
            if !within(minutes, &self.departure_after, &self.departure_before) {
                return false;
            }
        }
        if let Some(minutes) = arrival {
            if !within(minutes, &self.arrival_after, &self.arrival_before) {
                return false;
            }
        }

        if let (Some(max_hours), Some(dep), Some(arr)) = (self.max_duration_hours, departure, arrival)
        {
            if duration_hours(dep, arr) > max_hours {
                return false;
            }
        }

        true
    }
}

pub fn apply_numerical_filters(
    results: Vec<SearchResult>,
    filters: &NumericalFilters,
) -> Vec<SearchResult> {
    if filters.is_empty() {
        return results;
    }
    let before = results.len();
    let kept: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| r.metadata.as_object().is_some_and(|m| filters.matches(m)))
        .collect();
    tracing::debug!(before, after = kept.len(), "numerical filters applied");
    kept
}

pub fn filter_metadata(
    flights: &[Map<String, Value>],
    filters: &NumericalFilters,
) -> Vec<Map<String, Value>> {
    flights
        .iter()
        .filter(|m| filters.matches(m))
        .cloned()
        .collect()
}

// HH:MM, HH:MM:SS or H:MM AM/PM
pub fn parse_time(raw: &str) -> Option<i32> {
    let upper = raw.trim().to_ascii_uppercase();
    let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some(true))
    } else if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some(false))
    } else {
        (upper.as_str(), None)
    };

    let mut parts = clock.split(':');
    let mut hour: i32 = parts.next()?.trim().parse().ok()?;
    let minute: i32 = parts.next()?.trim().parse().ok()?;
    if let Some(seconds) = parts.next() {
        let _: u32 = seconds.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }

    match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            if pm && hour != 12 {
                hour += 12;
            } else if !pm && hour == 12 {
                hour = 0;
            }
        }
        None if !(0..24).contains(&hour) => return None,
        None => {}
    }
    if !(0..60).contains(&minute) {
        return None;
    }
    Some(hour * 60 + minute)
}

pub fn duration_hours(departure_minutes: i32, arrival_minutes: i32) -> f64 {
    (arrival_minutes - departure_minutes).rem_euclid(MINUTES_PER_DAY) as f64 / 60.0
}

fn within(minutes: i32, after: &Option<String>, before: &Option<String>) -> bool {
    if let Some(after) = after.as_deref().and_then(parse_time) {
        if minutes < after {
            return false;
        }
    }
    if let Some(before) = before.as_deref().and_then(parse_time) {
        if minutes > before {
            return false;
        }
    }
    true
}

fn number(value: Option<&Value>) -> Option<f64> {
    let n: f64 = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('$').trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flight(price: Value, seats: Value, dep: &str, arr: &str) -> Map<String, Value> {
        json!({
            "price": price,
            "available_seats": seats,
            "departure_time": dep,
            "arrival_time": arr,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn parses_flexible_times() {
        assert_eq!(parse_time("14:30"), Some(870));
        assert_eq!(parse_time("14:30:00"), Some(870));
        assert_eq!(parse_time("2:30 PM"), Some(870));
        assert_eq!(parse_time("2:30pm"), Some(870));
        assert_eq!(parse_time("12:05 AM"), Some(5));
        assert_eq!(parse_time("12:05 PM"), Some(725));
        assert_eq!(parse_time("00:00"), Some(0));
        assert_eq!(parse_time("noon"), None);
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("14"), None);
        assert_eq!(parse_time("13:00 PM"), None);
    }

    #[test]
    fn duration_wraps_overnight() {
        assert_eq!(duration_hours(22 * 60, 2 * 60), 4.0);
        assert_eq!(duration_hours(8 * 60, 9 * 60 + 30), 1.5);
        assert_eq!(duration_hours(600, 600), 0.0);
    }

    #[test]
    fn price_over_max_is_excluded() {
        let f = NumericalFilters {
            max_price: Some(500.0),
            ..Default::default()
        };
        assert!(!f.matches(&flight(json!(600.0), json!(10), "08:00", "10:00")));
        assert!(f.matches(&flight(json!(500.0), json!(10), "08:00", "10:00")));
        assert!(f.matches(&flight(json!("$450"), json!(10), "08:00", "10:00")));
    }

    #[test]
    fn price_and_seats_fail_closed() {
        let f = NumericalFilters {
            min_price: Some(100.0),
            ..Default::default()
        };
        assert!(!f.matches(&flight(json!("n/a"), json!(10), "08:00", "10:00")));
        assert!(!f.matches(&flight(Value::Null, json!(10), "08:00", "10:00")));

        let f = NumericalFilters {
            min_available_seats: Some(5),
            ..Default::default()
        };
        assert!(!f.matches(&flight(json!(100.0), json!("many"), "08:00", "10:00")));
        assert!(!f.matches(&flight(json!(100.0), json!(4), "08:00", "10:00")));
        assert!(f.matches(&flight(json!(100.0), json!(5), "08:00", "10:00")));
    }

    #[test]
    fn unparsable_time_fails_open() {
        let f = NumericalFilters {
            departure_after: Some("12:00".into()),
            max_duration_hours: Some(1.0),
            ..Default::default()
        };
        assert!(f.matches(&flight(json!(100.0), json!(5), "soon", "10:00")));
        let mut no_times = flight(json!(100.0), json!(5), "", "");
        no_times.remove("departure_time");
        assert!(f.matches(&no_times));
    }

    #[test]
    fn time_windows_and_duration_apply() {
        let f = NumericalFilters {
            departure_after: Some("08:00".into()),
            departure_before: Some("6:00 PM".into()),
            arrival_before: Some("23:00".into()),
            max_duration_hours: Some(3.0),
            ..Default::default()
        };
        assert!(f.matches(&flight(json!(1.0), json!(1), "09:15", "11:45")));
        assert!(!f.matches(&flight(json!(1.0), json!(1), "07:59", "09:00")));
        assert!(!f.matches(&flight(json!(1.0), json!(1), "18:01", "19:00")));
        assert!(!f.matches(&flight(json!(1.0), json!(1), "20:00", "23:30")));
        assert!(!f.matches(&flight(json!(1.0), json!(1), "09:00", "12:30")));
    }

    #[test]
    fn unparsable_bound_is_ignored() {
        let f = NumericalFilters {
            departure_after: Some("whenever".into()),
            ..Default::default()
        };
        assert!(f.matches(&flight(json!(1.0), json!(1), "03:00", "04:00")));
    }

    #[test]
    fn filtering_is_idempotent() {
        let flights = vec![
            flight(json!(250.0), json!(3), "06:00", "09:00"),
            flight(json!(650.0), json!(30), "10:00", "12:00"),
            flight(json!(120.0), json!(0), "bad", "12:00"),
            flight(json!(299.99), json!(12), "21:00", "01:00"),
        ];
        let f = NumericalFilters {
            max_price: Some(300.0),
            min_available_seats: Some(1),
            ..Default::default()
        };
        let once = filter_metadata(&flights, &f);
        let twice = filter_metadata(&once, &f);
        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }
}
