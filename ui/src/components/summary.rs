use chrono::{Duration, NaiveTime};

use api::TravelMode;
use model::{leg_duration, ActiveRoute, BusOverview, DurationBadges, RouteType};

use super::Text;

/// "—" when unknown, "N min" under an hour, otherwise "H h M min".
pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(x) if x.is_finite() => x,
        _ => return "—".to_string(),
    };
    let mins = (seconds / 60.0).round() as i64;
    if mins < 60 {
        return format!("{} min", mins.max(1));
    }
    let (h, m) = (mins / 60, mins % 60);
    if m == 0 {
        format!("{h} h")
    } else {
        format!("{h} h {m} min")
    }
}

/// Badges only ever show whole minutes.
pub fn format_badge(seconds: Option<f64>) -> String {
    match seconds {
        Some(x) if x.is_finite() => format!("{} min", ((x / 60.0).round() as i64).max(1)),
        _ => "—".to_string(),
    }
}

/// Trips longer than this get no arrival time.
const MAX_CLOCK_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// "HH:MM — HH:MM", leaving at `start`. The arrival is "—" for a total that's negative, not a
/// number, or implausibly long.
pub fn clock_range(start: NaiveTime, total_seconds: f64) -> String {
    let from = start.format("%H:%M");
    if !(0.0..=MAX_CLOCK_SECONDS).contains(&total_seconds) {
        return format!("{from} — —");
    }
    let end = start + Duration::seconds(total_seconds.round() as i64);
    format!("{from} — {}", end.format("%H:%M"))
}

fn icon(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Car => "🚗",
        TravelMode::Bus => "🚌",
        TravelMode::Foot => "🚶",
    }
}

/// The travel mode toggle, with the active mode bracketed.
pub fn badges(durations: &DurationBadges, active: TravelMode) -> Text {
    let cells: Vec<String> = TravelMode::all()
        .into_iter()
        .map(|mode| {
            let cell = format!("{} {} {}", icon(mode), mode, format_badge(durations.get(mode)));
            if mode == active {
                format!("[{cell}]")
            } else {
                cell
            }
        })
        .collect();
    Text::from(cells.join("  "))
}

/// Every leg of the route, numbered from 1.
pub fn itinerary(route: &ActiveRoute) -> Text {
    let title = match route.route_type {
        RouteType::Direct => "Route",
        _ => "Trip",
    };
    let mut txt = Text::from(format!("{title} by {} {}:", icon(route.mode), route.mode));
    for leg in &route.legs {
        let time = if leg.failed {
            "unavailable".to_string()
        } else {
            format_duration(leg_duration(&leg.response, route.mode))
        };
        txt.add_line(format!(
            "  {}. {} → {} ({time})",
            leg.leg.idx + 1,
            leg.leg.from_label,
            leg.leg.to_label
        ));
    }
    let failed = route.failed_legs();
    if !failed.is_empty() {
        let numbers: Vec<String> = failed.iter().map(|idx| (idx + 1).to_string()).collect();
        txt.add_line(format!(
            "Couldn't load the route for leg {}; it's left off the map",
            numbers.join(", ")
        ));
    }
    txt.add_line("Zoom to one leg with: leg <n>");
    txt
}

struct Segment<'a> {
    icon: &'a str,
    title: &'a str,
    seconds: f64,
}

fn option_card(title: &str, total: f64, segments: &[Segment], now: NaiveTime) -> Text {
    let mut txt = Text::from(format!(
        "{title}: {} ({})",
        format_duration(Some(total)),
        clock_range(now, total)
    ));
    if segments.len() > 1 {
        let icons: Vec<&str> = segments.iter().map(|s| s.icon).collect();
        txt.add_line(format!("  {}", icons.join(" › ")));
    }
    for s in segments {
        txt.add_line(format!(
            "  {} {}: {}",
            s.icon,
            s.title,
            format_duration(Some(s.seconds))
        ));
    }
    txt
}

/// Leave-now cards comparing the bus trip with driving, then the stops along the way.
pub fn bus_cards(bus: &BusOverview, now: NaiveTime) -> Text {
    let t = &bus.totals;
    let mut txt = Text::from("Leave now");
    txt.append(option_card(
        "🚌 Bus",
        t.total_time_s,
        &[
            Segment {
                icon: "🚶",
                title: "Walk to the stop",
                seconds: t.walk_to_stop_s,
            },
            Segment {
                icon: "🚌",
                title: "Ride",
                seconds: t.bus_s,
            },
            Segment {
                icon: "🚶",
                title: "Walk from the stop",
                seconds: t.walk_from_stop_s,
            },
        ],
        now,
    ));
    txt.add_line(format!(
        "  ~{} m walking, {:.1} km by bus",
        (t.walk_to_stop_m + t.walk_from_stop_m).round(),
        t.bus_m / 1000.0
    ));
    txt.append(option_card(
        "🚗 Car only",
        t.car_only_duration_s,
        &[Segment {
            icon: "🚗",
            title: "Drive directly",
            seconds: t.car_only_duration_s,
        }],
        now,
    ));

    let stops = &bus.stops;
    txt.add_line("Stops:");
    txt.add_line(format!(
        "  Board at: {}",
        stops.boarding.as_deref().unwrap_or("-")
    ));
    if !stops.passing.is_empty() {
        txt.add_line("  Passing:");
        for (idx, name) in stops.passing.iter().enumerate() {
            txt.add_line(format!("    {}. {name}", idx + 1));
        }
    }
    txt.add_line(format!(
        "  Get off at: {}",
        stops.alighting.as_deref().unwrap_or("-")
    ));
    if bus.legs_without_summary > 0 {
        txt.add_line(format!(
            "  ({} legs had no bus information)",
            bus.legs_without_summary
        ));
    }
    txt
}
