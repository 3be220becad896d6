//! Parameterized queries over the loaded dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use aq_protocol::json::nullable_float;
use aq_protocol::ALL_CITIES;

use crate::observation::Observation;
use crate::store::Dataset;

/// City/month filter shared by the historical queries.
///
/// `city == "all"` and malformed or out-of-range month values mean "no
/// filter", never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalFilter {
    pub city: Option<String>,
    pub month: Option<u32>,
}

impl HistoricalFilter {
    /// Build a filter from raw query-parameter text.
    pub fn from_params(city: Option<&str>, month: Option<&str>) -> Self {
        let city = match city {
            Some(c) if !c.is_empty() && c != ALL_CITIES => Some(c.to_string()),
            _ => None,
        };
        let month = month
            .and_then(|m| m.parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m));
        Self { city, month }
    }

    pub fn city(city: Option<&str>) -> Self {
        Self::from_params(city, None)
    }

    fn matches(&self, obs: &Observation) -> bool {
        if let Some(city) = &self.city {
            if &obs.city_name != city {
                return false;
            }
        }
        if let Some(month) = self.month {
            if obs.datetime.month() != month {
                return false;
            }
        }
        true
    }
}

/// Result of a raw historical query.
#[derive(Debug, Clone)]
pub struct HistoricalSlice {
    pub rows: Vec<Observation>,
    /// Earliest timestamp of the filtered rows; `None` when empty.
    pub start: Option<DateTime<Tz>>,
    /// Latest timestamp of the filtered rows; `None` when empty.
    pub end: Option<DateTime<Tz>>,
}

/// Every observation matching the filter, with the min/max timestamp of
/// the result. An empty match is a valid, empty slice.
pub fn historical(dataset: &Dataset, filter: &HistoricalFilter) -> HistoricalSlice {
    let rows: Vec<Observation> = dataset
        .iter()
        .filter(|obs| filter.matches(obs))
        .cloned()
        .collect();
    let start = rows.iter().map(|o| o.datetime).min();
    let end = rows.iter().map(|o| o.datetime).max();
    HistoricalSlice { rows, start, end }
}

/// One calendar date's averages for the daily rollup.
#[derive(Debug, Clone, Serialize)]
pub struct DailyRollup {
    pub date: NaiveDate,

    #[serde(rename = "main.aqi", serialize_with = "nullable_float")]
    pub aqi: f64,
    #[serde(rename = "components.pm2_5", serialize_with = "nullable_float")]
    pub pm2_5: f64,
    #[serde(rename = "components.pm10", serialize_with = "nullable_float")]
    pub pm10: f64,
    #[serde(rename = "components.o3", serialize_with = "nullable_float")]
    pub o3: f64,
    #[serde(rename = "components.no2", serialize_with = "nullable_float")]
    pub no2: f64,
    #[serde(rename = "components.so2", serialize_with = "nullable_float")]
    pub so2: f64,

    #[serde(serialize_with = "nullable_float")]
    pub lat: f64,
    #[serde(serialize_with = "nullable_float")]
    pub lon: f64,
    pub city_name: String,
}

/// Result of a daily rollup query.
#[derive(Debug, Clone)]
pub struct DailySlice {
    pub rows: Vec<DailyRollup>,
    pub start: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
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

/// Group the filtered observations by calendar date (time-of-day
/// discarded) and average the core pollutants per date. Coordinates and
/// city name are taken from the first-loaded row of each date group.
/// Dates come back in ascending order.
pub fn daily_rollup(dataset: &Dataset, filter: &HistoricalFilter) -> DailySlice {
    let filtered: Vec<&Observation> = dataset.iter().filter(|obs| filter.matches(obs)).collect();

    let mut groups: BTreeMap<NaiveDate, Vec<&Observation>> = BTreeMap::new();
    for &obs in &filtered {
        groups.entry(obs.datetime.date_naive()).or_default().push(obs);
    }

    let rows = groups
        .into_iter()
        .map(|(date, group)| {
            let first = group[0];
            DailyRollup {
                date,
                aqi: mean_of(group.iter().map(|o| o.aqi)),
                pm2_5: mean_of(group.iter().map(|o| o.pm2_5)),
                pm10: mean_of(group.iter().map(|o| o.pm10)),
                o3: mean_of(group.iter().map(|o| o.o3)),
                no2: mean_of(group.iter().map(|o| o.no2)),
                so2: mean_of(group.iter().map(|o| o.so2)),
                lat: first.lat,
                lon: first.lon,
                city_name: first.city_name.clone(),
            }
        })
        .collect();

    DailySlice {
        rows,
        start: filtered.iter().map(|o| o.datetime).min(),
        end: filtered.iter().map(|o| o.datetime).max(),
    }
}

/// One city's cell in the map-overlay rollup.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapCell {
    pub city_name: String,
    #[serde(serialize_with = "nullable_float")]
    pub avg_aqi: f64,
    #[serde(serialize_with = "nullable_float")]
    pub lat: f64,
    #[serde(serialize_with = "nullable_float")]
    pub lon: f64,
    /// Number of observations contributing to this cell.
    pub data_points: usize,
}

/// Group observations by city for map-overlay rendering: mean AQI,
/// first-encountered coordinates and the contributing row count. The
/// optional city filter narrows to one cell; the month filter never
/// applies here. Cities come back in first-encountered order.
pub fn heatmap(dataset: &Dataset, city: Option<&str>) -> Vec<HeatmapCell> {
    let filter = HistoricalFilter::city(city);

    let mut order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for obs in dataset.iter().filter(|obs| filter.matches(obs)) {
        if !groups.contains_key(obs.city_name.as_str()) {
            order.push(obs.city_name.as_str());
        }
        groups.entry(obs.city_name.as_str()).or_default().push(obs);
    }

    order
        .into_iter()
        .map(|city_name| {
            let group = &groups[city_name];
            let first = group[0];
            HeatmapCell {
                city_name: city_name.to_string(),
                avg_aqi: mean_of(group.iter().map(|o| o.aqi)),
                lat: first.lat,
                lon: first.lon,
                data_points: group.len(),
            }
        })
        .collect()
}

/// AQI of the most recent observation matching the optional city filter.
/// Ties on the timestamp resolve to the first-loaded row.
pub fn latest_aqi(dataset: &Dataset, city: Option<&str>) -> Option<f64> {
    let filter = HistoricalFilter::city(city);
    let mut latest: Option<&Observation> = None;
    for obs in dataset.iter().filter(|obs| filter.matches(obs)) {
        match latest {
            Some(current) if obs.datetime > current.datetime => latest = Some(obs),
            None => latest = Some(obs),
            _ => {}
        }
    }
    latest.map(|o| o.aqi)
}
