use api::{BusSummary, StopRef};

/// Cleans a stop name for display: `;` separators become ` / `, whitespace collapses. Returns
/// None for blank names.
pub fn normalize_stop_name(raw: &str) -> Option<String> {
    let replaced = raw.replace(';', " / ");
    let name = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Lowercase, alphanumeric only. "Stop A." and "stop  a" are the same stop.
fn compact_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// An ordered list of stop names that never repeats the same stop twice in a row.
#[derive(Default)]
pub struct StopSequence {
    names: Vec<String>,
    last_key: Option<String>,
}

impl StopSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: &str) {
        let name = match normalize_stop_name(raw) {
            Some(name) => name,
            None => return,
        };
        let key = compact_key(&name);
        // Unnamed stops come back from the backend with this placeholder
        if key == "busstop" {
            return;
        }
        if self.last_key.as_ref() == Some(&key) {
            return;
        }
        self.names.push(name);
        self.last_key = Some(key);
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Stops across a whole multi-leg bus trip.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedStops {
    pub boarding: Option<String>,
    pub alighting: Option<String>,
    /// Everything between boarding and alighting, in order
    pub passing: Vec<String>,
}

/// Joins the boarding stop of the first leg, every leg's intermediate stops, and the alighting
/// stop of the last leg. A stop shared at a leg boundary is listed once.
pub fn combine_stops(summaries: &[&BusSummary]) -> CombinedStops {
    let mut seq = StopSequence::new();
    let name = |stop: Option<&StopRef>| stop.and_then(|s| s.name.clone()).unwrap_or_default();
    if let Some(first) = summaries.first() {
        seq.push(&name(first.start_stop.as_ref()));
    }
    for summary in summaries {
        for stop in &summary.intermediate_stops {
            seq.push(&name(Some(stop)));
        }
    }
    if let Some(last) = summaries.last() {
        seq.push(&name(last.end_stop.as_ref()));
    }

    let mut names = seq.into_names();
    let boarding = if names.is_empty() {
        None
    } else {
        Some(names.remove(0))
    };
    let alighting = names.pop();
    CombinedStops {
        boarding,
        alighting,
        passing: names,
    }
}

/// Times (seconds) and distances (meters) summed over every bus leg.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BusTotals {
    pub walk_to_stop_s: f64,
    pub bus_s: f64,
    pub walk_from_stop_s: f64,
    pub walk_to_stop_m: f64,
    pub bus_m: f64,
    pub walk_from_stop_m: f64,
    pub total_time_s: f64,
    pub car_only_distance_m: f64,
    pub car_only_duration_s: f64,
}

impl BusTotals {
    pub fn from_summaries(summaries: &[&BusSummary]) -> Self {
        let mut totals = Self::default();
        for t in summaries.iter().filter_map(|s| s.times.as_ref()) {
            totals.walk_to_stop_s += t.segments.walk_to_stop_s.unwrap_or(0.0);
            totals.bus_s += t.segments.bus_s.unwrap_or(0.0);
            totals.walk_from_stop_s += t.segments.walk_from_stop_s.unwrap_or(0.0);
            totals.walk_to_stop_m += t.distances_m.walk_to_stop.unwrap_or(0.0);
            totals.bus_m += t.distances_m.bus.unwrap_or(0.0);
            totals.walk_from_stop_m += t.distances_m.walk_from_stop.unwrap_or(0.0);
            totals.total_time_s += t.total_time_s.unwrap_or(0.0);
            totals.car_only_distance_m += t.car_only.distance_m.unwrap_or(0.0);
            totals.car_only_duration_s += t.car_only.duration_s.unwrap_or(0.0);
        }
        totals
    }
}

/// What the bus summary card shows for the active route.
#[derive(Clone, Debug, PartialEq)]
pub struct BusOverview {
    pub stops: CombinedStops,
    pub totals: BusTotals,
    /// Legs that came back without a bus summary
    pub legs_without_summary: usize,
}

impl BusOverview {
    pub fn new(summaries: &[Option<&BusSummary>]) -> Self {
        let present: Vec<&BusSummary> = summaries.iter().filter_map(|s| *s).collect();
        Self {
            stops: combine_stops(&present),
            totals: BusTotals::from_summaries(&present),
            legs_without_summary: summaries.len() - present.len(),
        }
    }
}
