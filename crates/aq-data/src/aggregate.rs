//! Per-city summary statistics.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use aq_protocol::json::nullable_float;
use aq_protocol::ALL_CITIES;

use crate::observation::{Observation, POLLUTANT_NAMES};
use crate::store::{Dataset, DatasetStore, StoreError};

/// Directional change of AQI between the chronologically first and last
/// observation of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Worsening,
    Stable,
}

/// Summary statistics for one city (or the `"all"` pseudo-city).
#[derive(Debug, Clone, Serialize)]
pub struct CitySummary {
    #[serde(serialize_with = "nullable_float")]
    pub average_aqi: f64,

    /// Pollutant short name (uppercase) to mean concentration.
    #[serde(serialize_with = "serialize_pollutant_map")]
    pub pollutants: BTreeMap<String, f64>,

    /// The pollutant with the highest mean. Ties go to the earlier entry
    /// of [`POLLUTANT_NAMES`].
    pub primary_pollutant: String,

    pub trend: Trend,
}

/// Serialize a pollutant-mean map, rendering non-finite means as `null`.
pub fn serialize_pollutant_map<S>(
    map: &BTreeMap<String, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (name, mean) in map {
        if mean.is_finite() {
            out.serialize_entry(name, mean)?;
        } else {
            out.serialize_entry(name, &Option::<f64>::None)?;
        }
    }
    out.end()
}

/// Mean over the finite values of an iterator; NaN when none exist.
fn mean_ignoring_nan(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Chronologically first row: earliest timestamp, first-loaded on ties.
fn chronological_first<'a>(rows: &[&'a Observation]) -> Option<&'a Observation> {
    let mut best: Option<&Observation> = None;
    for &obs in rows {
        match best {
            Some(current) if obs.datetime < current.datetime => best = Some(obs),
            None => best = Some(obs),
            _ => {}
        }
    }
    best
}

/// Chronologically last row: latest timestamp, last-loaded on ties.
fn chronological_last<'a>(rows: &[&'a Observation]) -> Option<&'a Observation> {
    let mut best: Option<&Observation> = None;
    for &obs in rows {
        match best {
            Some(current) if obs.datetime >= current.datetime => best = Some(obs),
            None => best = Some(obs),
            _ => {}
        }
    }
    best
}

fn trend_of(rows: &[&Observation]) -> Trend {
    if rows.len() < 2 {
        return Trend::Stable;
    }
    let first = chronological_first(rows).map(|o| o.aqi).unwrap_or(f64::NAN);
    let last = chronological_last(rows).map(|o| o.aqi).unwrap_or(f64::NAN);
    // Strict comparison: equal first/last AQI reads as Improving. Kept
    // intentionally; clients treat the pair as a binary direction.
    if last > first {
        Trend::Worsening
    } else {
        Trend::Improving
    }
}

fn summarize(rows: &[&Observation]) -> CitySummary {
    let mut means = [0.0f64; 8];
    for (i, mean) in means.iter_mut().enumerate() {
        *mean = mean_ignoring_nan(rows.iter().map(|o| o.pollutants()[i]));
    }

    // First-encountered wins ties; NaN never displaces a candidate.
    let mut primary = 0usize;
    for i in 1..POLLUTANT_NAMES.len() {
        if means[i] > means[primary] {
            primary = i;
        }
    }

    let pollutants = POLLUTANT_NAMES
        .iter()
        .zip(means.iter())
        .map(|(name, mean)| (name.to_string(), *mean))
        .collect();

    CitySummary {
        average_aqi: mean_ignoring_nan(rows.iter().map(|o| o.aqi)),
        pollutants,
        primary_pollutant: POLLUTANT_NAMES[primary].to_string(),
        trend: trend_of(rows),
    }
}

/// Summaries for every city plus the `"all"` pseudo-city.
#[derive(Debug, Clone)]
pub struct Aggregates {
    summaries: HashMap<String, CitySummary>,
}

impl Aggregates {
    /// Compute all summaries from a loaded dataset.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut groups: HashMap<&str, Vec<&Observation>> = HashMap::new();
        for obs in dataset.iter() {
            groups.entry(obs.city_name.as_str()).or_default().push(obs);
        }

        let mut summaries = HashMap::with_capacity(groups.len() + 1);
        for (city, rows) in &groups {
            summaries.insert(city.to_string(), summarize(rows));
        }

        let all_rows: Vec<&Observation> = dataset.iter().collect();
        summaries.insert(ALL_CITIES.to_string(), summarize(&all_rows));

        Self { summaries }
    }

    /// Look up one city's summary. `"all"` is always present for a
    /// non-empty dataset.
    pub fn city(&self, name: &str) -> Option<&CitySummary> {
        self.summaries.get(name)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Lazily computed, process-lifetime memoized aggregates.
///
/// Depends entirely on the dataset; a failed dataset load propagates as
/// the same error here. There is no partial or incremental update path.
#[derive(Default)]
pub struct AggregateCache {
    cell: OnceLock<Result<Arc<Aggregates>, StoreError>>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute on first call, return the memoized value afterwards.
    pub fn get(&self, store: &DatasetStore) -> Result<Arc<Aggregates>, StoreError> {
        self.cell
            .get_or_init(|| {
                store
                    .get()
                    .map(|dataset| Arc::new(Aggregates::from_dataset(&dataset)))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::parse_timestamp;

    fn obs(city: &str, when: &str, aqi: f64) -> Observation {
        Observation {
            city_name: city.to_string(),
            datetime: parse_timestamp(when).unwrap(),
            lat: 14.6,
            lon: 120.98,
            aqi,
            co: 300.0,
            no: 0.5,
            no2: 12.0,
            o3: 40.0,
            so2: 5.0,
            pm2_5: 25.0,
            pm10: 40.0,
            nh3: 3.0,
        }
    }

    #[test]
    fn test_manila_worsening_scenario() {
        let dataset = Dataset::new(vec![
            obs("Manila", "2024-05-01", 2.0),
            obs("Manila", "2024-05-10", 4.0),
        ]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().trend, Trend::Worsening);
    }

    #[test]
    fn test_improving_trend() {
        let dataset = Dataset::new(vec![
            obs("Manila", "2024-05-01", 4.0),
            obs("Manila", "2024-05-10", 2.0),
        ]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().trend, Trend::Improving);
    }

    #[test]
    fn test_single_row_is_stable() {
        let dataset = Dataset::new(vec![obs("Manila", "2024-05-01", 2.0)]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().trend, Trend::Stable);
    }

    #[test]
    fn test_equal_endpoints_read_as_improving() {
        let dataset = Dataset::new(vec![
            obs("Manila", "2024-05-01", 3.0),
            obs("Manila", "2024-05-10", 3.0),
        ]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().trend, Trend::Improving);
    }

    #[test]
    fn test_trend_uses_chronological_order_not_load_order() {
        // Later timestamp loaded first.
        let dataset = Dataset::new(vec![
            obs("Manila", "2024-05-10", 4.0),
            obs("Manila", "2024-05-01", 2.0),
        ]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().trend, Trend::Worsening);
    }

    #[test]
    fn test_primary_pollutant_is_highest_mean() {
        let mut a = obs("Manila", "2024-05-01", 2.0);
        a.o3 = 500.0;
        let dataset = Dataset::new(vec![a]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().primary_pollutant, "O3");
    }

    #[test]
    fn test_primary_pollutant_tie_break_is_first_encountered() {
        let mut a = obs("Manila", "2024-05-01", 2.0);
        // NO2 and O3 tied at the top; NO2 comes first in the fixed order.
        a.co = 1.0;
        a.no = 1.0;
        a.no2 = 99.0;
        a.o3 = 99.0;
        a.so2 = 1.0;
        a.pm2_5 = 1.0;
        a.pm10 = 1.0;
        a.nh3 = 1.0;
        let dataset = Dataset::new(vec![a]);
        let aggregates = Aggregates::from_dataset(&dataset);
        assert_eq!(aggregates.city("Manila").unwrap().primary_pollutant, "NO2");
    }

    #[test]
    fn test_all_pseudo_city_covers_union() {
        let dataset = Dataset::new(vec![
            obs("Manila", "2024-05-01", 2.0),
            obs("Quezon City", "2024-05-02", 4.0),
        ]);
        let aggregates = Aggregates::from_dataset(&dataset);

        let all = aggregates.city(ALL_CITIES).unwrap();
        assert!((all.average_aqi - 3.0).abs() < 1e-9);
        // Two cities plus "all".
        assert_eq!(aggregates.len(), 3);
    }

    #[test]
    fn test_pollutant_means_skip_nan() {
        let mut a = obs("Manila", "2024-05-01", 2.0);
        let mut b = obs("Manila", "2024-05-02", 2.0);
        a.pm2_5 = 10.0;
        b.pm2_5 = f64::NAN;
        let dataset = Dataset::new(vec![a, b]);
        let aggregates = Aggregates::from_dataset(&dataset);

        let summary = aggregates.city("Manila").unwrap();
        assert!((summary.pollutants["PM2_5"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pollutant_keys_are_uppercase_short_names() {
        let dataset = Dataset::new(vec![obs("Manila", "2024-05-01", 2.0)]);
        let aggregates = Aggregates::from_dataset(&dataset);
        let summary = aggregates.city("Manila").unwrap();

        for name in POLLUTANT_NAMES {
            assert!(summary.pollutants.contains_key(name), "missing {name}");
        }
        assert_eq!(summary.pollutants.len(), POLLUTANT_NAMES.len());
    }

    #[test]
    fn test_trend_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Trend::Worsening).unwrap(), "\"Worsening\"");
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"Stable\"");
    }

    #[test]
    fn test_all_nan_pollutant_serializes_as_null() {
        let mut a = obs("Manila", "2024-05-01", 2.0);
        a.nh3 = f64::NAN;
        let dataset = Dataset::new(vec![a]);
        let aggregates = Aggregates::from_dataset(&dataset);

        let json = serde_json::to_value(aggregates.city("Manila").unwrap()).unwrap();
        assert!(json["pollutants"]["NH3"].is_null());
        assert_eq!(json["pollutants"]["PM10"], 40.0);
    }
}
