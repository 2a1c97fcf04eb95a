use std::collections::HashMap;

use crate::error::NetworkError;
use crate::transit::{
    CostCalculator, DefaultCostCalculator, PatternIndex, PatternSlackProvider, Seconds, SlackProvider, StopIndex,
    StopTime, Timestamp, Transfer, TransitDataProvider, TripIndex,
};
use crate::utils;

pub struct Route {
    pub label: Box<str>,
    pub num_stops: usize,
    pub num_trips: usize,
    pub route_stops_idx: usize,
    pub stop_times_idx: usize,
    pub slack_index: usize,
    pub transit_group: u32,
}

impl Route {
    pub fn get_stops<'a>(&self, route_stops: &'a [StopIndex]) -> &'a [StopIndex] {
        &route_stops[self.route_stops_idx..(self.route_stops_idx + self.num_stops)]
    }

    pub fn get_trip<'a>(&self, trip: usize, stop_times: &'a [StopTime]) -> &'a [StopTime] {
        let start = self.stop_times_idx + trip * self.num_stops;
        let end = start + self.num_stops;
        &stop_times[start..end]
    }
}

pub struct Stop {
    pub name: Box<str>,
    pub routes_idx: usize,
    pub num_routes: usize,
}

impl Stop {
    pub fn get_routes<'a>(&self, stop_routes: &'a [PatternIndex]) -> &'a [PatternIndex] {
        &stop_routes[self.routes_idx..(self.routes_idx + self.num_routes)]
    }
}

/// An in-memory timetable. Routes are trip patterns: every trip of a route visits the same stops.
pub struct Network {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
    pub stop_index: HashMap<String, StopIndex>,
    pub stop_times: Vec<StopTime>,
    pub stop_routes: Vec<PatternIndex>,
    pub route_stops: Vec<StopIndex>,
    transfers_from: Vec<Vec<Transfer>>,
    transfers_to: Vec<Vec<Transfer>>,
    slack: PatternSlackProvider,
    cost_calculator: Option<DefaultCostCalculator>,
}

impl Network {
    pub fn get_stop(&self, idx: usize) -> &Stop {
        &self.stops[idx]
    }

    pub fn get_stop_idx_from_name(&self, name: &str) -> Option<StopIndex> {
        self.stop_index.get(name).copied()
    }

    pub fn num_stop_times(&self) -> usize {
        self.stop_times.len()
    }

    pub fn print_stats(&self) {
        log::info!(
            "Network: {} stops, {} routes, {} trips, {} stop times, {} transfers.",
            self.stops.len(),
            self.routes.len(),
            self.routes.iter().map(|route| route.num_trips).sum::<usize>(),
            self.stop_times.len(),
            self.transfers_from.iter().map(Vec::len).sum::<usize>(),
        );
    }
}

impl TransitDataProvider for Network {
    fn num_stops(&self) -> usize {
        self.stops.len()
    }

    fn num_patterns(&self) -> usize {
        self.routes.len()
    }

    fn patterns_for_stop(&self, stop: StopIndex) -> &[PatternIndex] {
        self.stops[stop as usize].get_routes(&self.stop_routes)
    }

    fn pattern_stops(&self, pattern: PatternIndex) -> &[StopIndex] {
        self.routes[pattern as usize].get_stops(&self.route_stops)
    }

    fn num_trips(&self, pattern: PatternIndex) -> usize {
        self.routes[pattern as usize].num_trips
    }

    fn trip_times(&self, pattern: PatternIndex, trip: TripIndex) -> &[StopTime] {
        self.routes[pattern as usize].get_trip(trip as usize, &self.stop_times)
    }

    fn slack_index(&self, pattern: PatternIndex) -> usize {
        self.routes[pattern as usize].slack_index
    }

    fn pattern_label(&self, pattern: PatternIndex) -> &str {
        &self.routes[pattern as usize].label
    }

    fn transit_group(&self, pattern: PatternIndex) -> u32 {
        self.routes[pattern as usize].transit_group
    }

    fn transfers_from_stop(&self, stop: StopIndex) -> &[Transfer] {
        &self.transfers_from[stop as usize]
    }

    fn transfers_to_stop(&self, stop: StopIndex) -> &[Transfer] {
        &self.transfers_to[stop as usize]
    }

    fn slack_provider(&self) -> &dyn SlackProvider {
        &self.slack
    }

    fn cost_calculator(&self) -> Option<&dyn CostCalculator> {
        self.cost_calculator.as_ref().map(|calculator| calculator as &dyn CostCalculator)
    }

    fn stop_name(&self, stop: StopIndex) -> &str {
        &self.stops[stop as usize].name
    }
}

struct RouteData {
    label: String,
    stops: Vec<StopIndex>,
    trips: Vec<Vec<StopTime>>,
    slack_index: usize,
    transit_group: u32,
}

#[derive(Default)]
pub struct NetworkBuilder {
    stop_names: Vec<String>,
    stop_index: HashMap<String, StopIndex>,
    routes: Vec<RouteData>,
    transfers: Vec<(StopIndex, StopIndex, Seconds, Option<i32>)>,
    slack: PatternSlackProvider,
    cost_calculator: Option<DefaultCostCalculator>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stop, or returns the index of the stop with the same name.
    pub fn add_stop(&mut self, name: &str) -> StopIndex {
        if let Some(&idx) = self.stop_index.get(name) {
            return idx;
        }
        let idx = self.stop_names.len() as StopIndex;
        self.stop_names.push(name.to_owned());
        self.stop_index.insert(name.to_owned(), idx);
        idx
    }

    pub fn add_stops(&mut self, names: &[&str]) -> Vec<StopIndex> {
        names.iter().map(|name| self.add_stop(name)).collect()
    }

    pub fn stop(&self, name: &str) -> Result<StopIndex, NetworkError> {
        self.stop_index.get(name).copied().ok_or_else(|| NetworkError::UnknownStop(name.to_owned()))
    }

    /// Adds a route where every trip is given as whitespace separated times, one per stop, e.g.
    /// "0:02 0:10 0:20". Arrival and departure are the same at each stop.
    pub fn add_route(&mut self, label: &str, stops: &[&str], schedules: &[&str]) -> Result<PatternIndex, NetworkError> {
        let stops = stops.iter().map(|name| self.stop(name)).collect::<Result<Vec<_>, _>>()?;
        let trips = schedules
            .iter()
            .map(|schedule| {
                schedule
                    .split_whitespace()
                    .map(|time| {
                        let time = utils::parse_time(time)?;
                        Ok(StopTime { arrival_time: time, departure_time: time })
                    })
                    .collect::<Result<Vec<_>, NetworkError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.add_route_with_times(label, &stops, trips)
    }

    pub fn add_route_with_times(
        &mut self,
        label: &str,
        stops: &[StopIndex],
        mut trips: Vec<Vec<StopTime>>,
    ) -> Result<PatternIndex, NetworkError> {
        if stops.len() < 2 {
            return Err(NetworkError::RouteTooShort(label.to_owned()));
        }
        for &stop in stops {
            if stop as usize >= self.stop_names.len() {
                return Err(NetworkError::UnknownStop(stop.to_string()));
            }
        }
        for trip in &trips {
            if trip.len() != stops.len() {
                return Err(NetworkError::TripLengthMismatch {
                    route: label.to_owned(),
                    expected: stops.len(),
                    actual: trip.len(),
                });
            }
            check_increasing_times(label, trip)?;
        }

        // Sort trips in route based on earliest departure time.
        trips.sort_by_key(|trip| trip[0].departure_time);
        for pair in trips.windows(2) {
            let overtakes = pair[0].iter().zip(pair[1].iter()).any(|(a, b)| {
                a.arrival_time > b.arrival_time || a.departure_time > b.departure_time
            });
            if overtakes {
                return Err(NetworkError::OvertakingTrips(label.to_owned()));
            }
        }

        self.routes.push(RouteData {
            label: label.to_owned(),
            stops: stops.to_vec(),
            trips,
            slack_index: 0,
            transit_group: 0,
        });
        Ok((self.routes.len() - 1) as PatternIndex)
    }

    /// Sets the slack entry the route uses, see `add_slack_entry`.
    pub fn set_slack_index(&mut self, route: PatternIndex, slack_index: usize) {
        if let Some(route) = self.routes.get_mut(route as usize) {
            route.slack_index = slack_index;
        }
    }

    pub fn set_transit_group(&mut self, route: PatternIndex, transit_group: u32) {
        if let Some(route) = self.routes.get_mut(route as usize) {
            route.transit_group = transit_group;
        }
    }

    /// Uses the same slack for every route.
    pub fn slack(mut self, transfer_slack: Seconds, board_slack: Seconds, alight_slack: Seconds) -> Self {
        self.slack = PatternSlackProvider {
            transfer_slack,
            entries: vec![(board_slack, alight_slack)],
        };
        self
    }

    pub fn transfer_slack(&mut self, transfer_slack: Seconds) {
        self.slack.transfer_slack = transfer_slack;
    }

    pub fn add_slack_entry(&mut self, board_slack: Seconds, alight_slack: Seconds) -> usize {
        self.slack.entries.push((board_slack, alight_slack));
        self.slack.entries.len() - 1
    }

    /// A one-way walking transfer, costed with the default walk reluctance.
    pub fn add_transfer(&mut self, from: &str, to: &str, duration: &str) -> Result<(), NetworkError> {
        let (from, to) = (self.stop(from)?, self.stop(to)?);
        self.transfers.push((from, to, utils::parse_duration(duration)?, None));
        Ok(())
    }

    pub fn add_transfer_with_cost(&mut self, from: StopIndex, to: StopIndex, duration: Seconds, c1: i32) {
        self.transfers.push((from, to, duration, Some(c1)));
    }

    pub fn cost_calculator(mut self, calculator: DefaultCostCalculator) -> Self {
        self.cost_calculator = Some(calculator);
        self
    }

    pub fn build(self) -> Network {
        let num_stops = self.stop_names.len();

        let mut routes = Vec::with_capacity(self.routes.len());
        let mut route_stops = Vec::new();
        let mut stop_times = Vec::new();
        let mut routes_by_stop: Vec<Vec<PatternIndex>> = vec![Vec::new(); num_stops];
        for (route_idx, data) in self.routes.into_iter().enumerate() {
            routes.push(Route {
                label: data.label.into_boxed_str(),
                num_stops: data.stops.len(),
                num_trips: data.trips.len(),
                route_stops_idx: route_stops.len(),
                stop_times_idx: stop_times.len(),
                slack_index: data.slack_index,
                transit_group: data.transit_group,
            });
            for &stop in &data.stops {
                let stop_routes = &mut routes_by_stop[stop as usize];
                // A route visiting a stop twice is listed once.
                if stop_routes.last() != Some(&(route_idx as PatternIndex)) {
                    stop_routes.push(route_idx as PatternIndex);
                }
            }
            route_stops.extend_from_slice(&data.stops);
            stop_times.extend(data.trips.into_iter().flatten());
        }

        let mut stop_routes = Vec::new();
        let mut stops = Vec::with_capacity(num_stops);
        for (name, routes) in self.stop_names.into_iter().zip(routes_by_stop) {
            stops.push(Stop {
                name: name.into_boxed_str(),
                routes_idx: stop_routes.len(),
                num_routes: routes.len(),
            });
            stop_routes.extend(routes);
        }

        let mut transfers_from = vec![Vec::new(); num_stops];
        let mut transfers_to = vec![Vec::new(); num_stops];
        for (from, to, duration, c1) in self.transfers {
            let walk = Transfer::walk(to, duration);
            let c1 = c1.unwrap_or(walk.c1);
            transfers_from[from as usize].push(Transfer { stop: to, duration, c1 });
            transfers_to[to as usize].push(Transfer { stop: from, duration, c1 });
        }

        let mut slack = self.slack;
        if slack.entries.is_empty() {
            slack.entries.push((0, 0));
        }

        Network {
            routes,
            stops,
            stop_index: self.stop_index,
            stop_times,
            stop_routes,
            route_stops,
            transfers_from,
            transfers_to,
            slack,
            cost_calculator: self.cost_calculator,
        }
    }
}

fn check_increasing_times(label: &str, trip: &[StopTime]) -> Result<(), NetworkError> {
    let mut previous: Timestamp = Timestamp::MIN;
    for (stop_pos, stop_time) in trip.iter().enumerate() {
        if stop_time.arrival_time < previous || stop_time.departure_time < stop_time.arrival_time {
            return Err(NetworkError::DecreasingTimes { route: label.to_owned(), stop_pos });
        }
        previous = stop_time.departure_time;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> NetworkBuilder {
        let mut builder = NetworkBuilder::new();
        builder.add_stops(&["A", "B", "C", "D"]);
        builder
    }

    #[test]
    fn builds_flat_arrays() {
        let mut builder = builder();
        builder.add_route("BUS R1", &["A", "B", "C"], &["0:12 0:20 0:30", "0:02 0:10 0:20"]).unwrap();
        builder.add_route("BUS R2", &["C", "D"], &["0:40 0:50"]).unwrap();
        builder.add_transfer("B", "D", "2m").unwrap();
        let network = builder.slack(60, 30, 10).build();

        assert_eq!(network.num_stops(), 4);
        assert_eq!(network.num_patterns(), 2);
        assert_eq!(network.pattern_stops(1), &[2, 3]);
        assert_eq!(network.patterns_for_stop(2), &[0, 1]);
        // Trips are sorted by departure.
        assert_eq!(network.trip_times(0, 0)[0].departure_time, 120);
        assert_eq!(network.trip_times(0, 1)[2].arrival_time, 1800);
        assert_eq!(network.transfers_from_stop(1), &[Transfer::walk(3, 120)]);
        assert_eq!(network.transfers_to_stop(3), &[Transfer::walk(1, 120)]);
        assert_eq!(network.slack_provider().board_slack(0), Some(30));
        assert_eq!(network.pattern_label(1), "BUS R2");
        assert_eq!(network.get_stop_idx_from_name("D"), Some(3));
        assert!(network.cost_calculator().is_none());
    }

    #[test]
    fn circular_route_is_listed_once_per_stop() {
        let mut builder = builder();
        builder.add_route("BUS O", &["A", "B", "A"], &["0:01 0:02 0:03"]).unwrap();
        let network = builder.build();
        assert_eq!(network.patterns_for_stop(0), &[0]);
    }

    #[test]
    fn rejects_bad_routes() {
        let mut builder = builder();
        assert_eq!(
            builder.add_route("X", &["A", "E"], &["0:01 0:02"]),
            Err(NetworkError::UnknownStop("E".to_owned()))
        );
        assert!(matches!(
            builder.add_route("X", &["A", "B"], &["0:01"]),
            Err(NetworkError::TripLengthMismatch { .. })
        ));
        assert!(matches!(
            builder.add_route("X", &["A", "B"], &["0:05 0:01"]),
            Err(NetworkError::DecreasingTimes { stop_pos: 1, .. })
        ));
        assert_eq!(
            builder.add_route("X", &["A", "B"], &["0:01 0:30", "0:02 0:10"]),
            Err(NetworkError::OvertakingTrips("X".to_owned()))
        );
        assert_eq!(
            builder.add_route("X", &["A"], &["0:01"]),
            Err(NetworkError::RouteTooShort("X".to_owned()))
        );
    }
}
