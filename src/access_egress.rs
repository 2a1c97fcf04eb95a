use std::collections::HashMap;
use std::fmt::Display;

use crate::request::RaptorProfile;
use crate::transit::{to_raptor_cost, Cost, Seconds, StopIndex, Timestamp, Transfer};
use crate::utils;

/// The window in which a leg may start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: Timestamp,
    pub close: Timestamp,
}

/// A leg between the origin (or destination) and a stop, computed by the street search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessEgress {
    pub stop: StopIndex,
    pub duration: Seconds,
    pub c1: Cost,
    // Number of rides the leg itself contains, 0 for walking.
    pub rides: u32,
    // The leg ends on board a vehicle (e.g. flex drop-off at the stop), so it can be followed by a
    // walking transfer.
    pub stop_reached_on_board: bool,
    pub opening_hours: Option<OpeningHours>,
}

impl AccessEgress {
    pub fn walk(stop: StopIndex, duration: Seconds) -> Self {
        Self::walk_with_cost(stop, duration, to_raptor_cost(duration as f64 * Transfer::DEFAULT_WALK_RELUCTANCE))
    }

    pub fn walk_with_cost(stop: StopIndex, duration: Seconds, c1: Cost) -> Self {
        Self {
            stop,
            duration,
            c1,
            rides: 0,
            stop_reached_on_board: false,
            opening_hours: None,
        }
    }

    /// A flex leg arriving on board at the stop.
    pub fn flex(stop: StopIndex, duration: Seconds, rides: u32) -> Self {
        Self {
            rides,
            stop_reached_on_board: true,
            ..Self::walk(stop, duration)
        }
    }

    /// A flex leg followed by a walk to the stop.
    pub fn flex_and_walk(stop: StopIndex, duration: Seconds, rides: u32) -> Self {
        Self {
            rides,
            stop_reached_on_board: false,
            ..Self::walk(stop, duration)
        }
    }

    pub fn with_c1(self, c1: Cost) -> Self {
        Self { c1, ..self }
    }

    pub fn with_opening_hours(self, open: Timestamp, close: Timestamp) -> Self {
        Self {
            opening_hours: Some(OpeningHours { open, close }),
            ..self
        }
    }

    pub fn has_rides(&self) -> bool {
        self.rides > 0
    }

    pub fn has_opening_hours(&self) -> bool {
        self.opening_hours.is_some()
    }

    /// The earliest time at or after `requested` the leg can start.
    pub fn earliest_departure_time(&self, requested: Timestamp) -> Option<Timestamp> {
        match self.opening_hours {
            None => Some(requested),
            Some(hours) if requested < hours.open => Some(hours.open),
            Some(hours) if requested > hours.close => None,
            Some(_) => Some(requested),
        }
    }

    /// The latest time at or before `requested` the leg can end.
    pub fn latest_arrival_time(&self, requested: Timestamp) -> Option<Timestamp> {
        let departure = requested - self.duration;
        match self.opening_hours {
            None => Some(requested),
            Some(hours) if departure > hours.close => Some(hours.close + self.duration),
            Some(hours) if departure < hours.open => None,
            Some(_) => Some(requested),
        }
    }

    pub(crate) fn is_valid(&self, num_stops: usize) -> bool {
        (self.stop as usize) < num_stops && self.duration >= 0
    }
}

impl Display for AccessEgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_rides() {
            write!(f, "Flex {} {}x", utils::get_duration_str(self.duration), self.rides)?;
        } else {
            write!(f, "Walk {}", utils::get_duration_str(self.duration))?;
        }
        if let Some(hours) = self.opening_hours {
            write!(f, " Open({} {})", utils::get_time_str(hours.open), utils::get_time_str(hours.close))?;
        }
        Ok(())
    }
}

// Keeps the fastest leg per stop. Ties are resolved in favour of the first leg seen, and the
// relative order of the kept legs is preserved.
fn remove_non_optimal_paths_for_standard_raptor(paths: Vec<AccessEgress>) -> Vec<AccessEgress> {
    let mut best: Vec<AccessEgress> = Vec::with_capacity(paths.len());
    let mut index_by_stop: HashMap<StopIndex, usize> = HashMap::new();
    for path in paths {
        match index_by_stop.get(&path.stop) {
            Some(&i) => {
                if path.duration < best[i].duration {
                    best[i] = path;
                }
            }
            None => {
                index_by_stop.insert(path.stop, best.len());
                best.push(path);
            }
        }
    }
    best
}

fn normalize(paths: Vec<AccessEgress>, profile: RaptorProfile) -> Vec<AccessEgress> {
    if profile.is_multi_criteria() {
        paths
    } else {
        remove_non_optimal_paths_for_standard_raptor(paths)
    }
}

/// Access legs grouped by the round in which they are added to the search.
#[derive(Clone, Debug, Default)]
pub struct AccessPaths {
    on_board_by_rides: Vec<Vec<AccessEgress>>,
    on_street_by_rides: Vec<Vec<AccessEgress>>,
    time_dependent: bool,
}

impl AccessPaths {
    pub fn create(paths: Vec<AccessEgress>, profile: RaptorProfile) -> Self {
        let paths = normalize(paths, profile);
        let time_dependent = paths.iter().any(AccessEgress::has_opening_hours);
        let max_rides = paths.iter().map(|p| p.rides as usize).max().unwrap_or(0);

        let mut on_board_by_rides = vec![Vec::new(); max_rides + 1];
        let mut on_street_by_rides = vec![Vec::new(); max_rides + 1];
        for path in paths {
            // A walking leg is always in round zero and never on board.
            if path.has_rides() && path.stop_reached_on_board {
                on_board_by_rides[path.rides as usize].push(path);
            } else {
                on_street_by_rides[path.rides as usize].push(path);
            }
        }
        Self { on_board_by_rides, on_street_by_rides, time_dependent }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn arrived_on_board_by_rides(&self, rides: u32) -> &[AccessEgress] {
        self.on_board_by_rides.get(rides as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn arrived_on_street_by_rides(&self, rides: u32) -> &[AccessEgress] {
        self.on_street_by_rides.get(rides as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The highest round containing an access leg.
    pub fn max_number_of_rides(&self) -> u32 {
        self.on_street_by_rides.len().saturating_sub(1) as u32
    }

    pub fn has_time_dependent_access(&self) -> bool {
        self.time_dependent
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessEgress> {
        self.on_street_by_rides.iter().chain(self.on_board_by_rides.iter()).flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Egress legs indexed by the stop they start at.
#[derive(Clone, Debug, Default)]
pub struct EgressPaths {
    by_stop: HashMap<StopIndex, Vec<AccessEgress>>,
    time_dependent: bool,
}

impl EgressPaths {
    pub fn create(paths: Vec<AccessEgress>, profile: RaptorProfile) -> Self {
        let paths = normalize(paths, profile);
        let time_dependent = paths.iter().any(AccessEgress::has_opening_hours);
        let mut by_stop: HashMap<StopIndex, Vec<AccessEgress>> = HashMap::new();
        for path in paths {
            by_stop.entry(path.stop).or_default().push(path);
        }
        Self { by_stop, time_dependent }
    }

    pub fn egress_at(&self, stop: StopIndex) -> &[AccessEgress] {
        self.by_stop.get(&stop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_egress_at(&self, stop: StopIndex) -> bool {
        self.by_stop.contains_key(&stop)
    }

    pub fn stops(&self) -> impl Iterator<Item = StopIndex> + '_ {
        self.by_stop.keys().copied()
    }

    pub fn has_time_dependent_egress(&self) -> bool {
        self.time_dependent
    }

    pub fn len(&self) -> usize {
        self.by_stop.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stop.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_hours_shift_departure_forward() {
        let flex = AccessEgress::flex(1, 300, 1).with_opening_hours(9 * 3600, 9 * 3600 + 50 * 60);
        assert_eq!(flex.earliest_departure_time(8 * 3600), Some(9 * 3600));
        assert_eq!(flex.earliest_departure_time(9 * 3600 + 600), Some(9 * 3600 + 600));
        assert_eq!(flex.earliest_departure_time(10 * 3600), None);
    }

    #[test]
    fn opening_hours_shift_arrival_backward() {
        let flex = AccessEgress::flex(1, 300, 1).with_opening_hours(9 * 3600, 9 * 3600 + 50 * 60);
        // Departing at 11:00 is after closing, so the leg departs at 9:50 and arrives 9:55.
        assert_eq!(flex.latest_arrival_time(11 * 3600), Some(9 * 3600 + 55 * 60));
        assert_eq!(flex.latest_arrival_time(9 * 3600 + 600), Some(9 * 3600 + 600));
        assert_eq!(flex.latest_arrival_time(9 * 3600), None);
    }

    #[test]
    fn standard_profile_keeps_fastest_leg_per_stop() {
        let paths = vec![
            AccessEgress::walk(1, 120),
            AccessEgress::walk(2, 60),
            AccessEgress::walk(1, 60),
            AccessEgress::walk_with_cost(1, 60, 1),
        ];
        let access = AccessPaths::create(paths.clone(), RaptorProfile::Standard);
        let kept: Vec<_> = access.iter().copied().collect();
        assert_eq!(kept, vec![AccessEgress::walk(1, 60), AccessEgress::walk(2, 60)]);

        let access = AccessPaths::create(paths, RaptorProfile::MultiCriteria);
        assert_eq!(access.len(), 4);
    }

    #[test]
    fn access_is_grouped_by_rides_and_board_type() {
        let access = AccessPaths::create(
            vec![
                AccessEgress::walk(1, 60),
                AccessEgress::flex(2, 600, 1),
                AccessEgress::flex_and_walk(3, 700, 1),
                AccessEgress::flex(4, 800, 2),
            ],
            RaptorProfile::MultiCriteria,
        );
        assert_eq!(access.max_number_of_rides(), 2);
        assert_eq!(access.arrived_on_street_by_rides(0).len(), 1);
        assert_eq!(access.arrived_on_board_by_rides(1)[0].stop, 2);
        assert_eq!(access.arrived_on_street_by_rides(1)[0].stop, 3);
        assert_eq!(access.arrived_on_board_by_rides(2)[0].stop, 4);
        assert!(access.arrived_on_board_by_rides(3).is_empty());
        assert!(!access.has_time_dependent_access());
    }

    #[test]
    fn egress_is_indexed_by_stop() {
        let egress = EgressPaths::create(
            vec![AccessEgress::walk(5, 60), AccessEgress::flex(5, 300, 1).with_opening_hours(0, 100)],
            RaptorProfile::MultiCriteria,
        );
        assert_eq!(egress.egress_at(5).len(), 2);
        assert!(egress.egress_at(4).is_empty());
        assert!(egress.has_time_dependent_egress());
    }

    #[test]
    fn display() {
        assert_eq!(AccessEgress::walk(1, 180).to_string(), "Walk 3m");
        assert_eq!(
            AccessEgress::flex(1, 315, 1).with_opening_hours(9 * 3600, 9 * 3600 + 50 * 60).to_string(),
            "Flex 5m15s 1x Open(9:00 9:50)"
        );
    }
}
