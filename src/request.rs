use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::access_egress::AccessEgress;
use crate::error::RaptorError;
use crate::multicriteria::RelaxFunction;
use crate::transit::{Cost, Seconds, StopIndex, Timestamp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RaptorProfile {
    // Earliest arrival with fewest transfers, one arrival per stop.
    Standard,
    // Like standard, but only the best times are collected, no paths.
    BestTime,
    #[default]
    MultiCriteria,
}

impl RaptorProfile {
    pub fn is_multi_criteria(self) -> bool {
        self == RaptorProfile::MultiCriteria
    }

    pub fn produces_paths(self) -> bool {
        self != RaptorProfile::BestTime
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchDirection {
    #[default]
    Forward,
    // Arrive-by: searches backwards in time from the latest arrival time.
    Reverse,
}

impl SearchDirection {
    pub fn is_forward(self) -> bool {
        self == SearchDirection::Forward
    }
}

/// A transition from one via leg into the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViaConnection {
    pub from_stop: StopIndex,
    pub to_stop: StopIndex,
    pub duration: Seconds,
    pub c1: Cost,
}

impl ViaConnection {
    pub fn stop(stop: StopIndex) -> Self {
        Self { from_stop: stop, to_stop: stop, duration: 0, c1: 0 }
    }

    pub fn transfer(from_stop: StopIndex, to_stop: StopIndex, duration: Seconds, c1: Cost) -> Self {
        Self { from_stop, to_stop, duration, c1 }
    }

    pub fn is_same_stop(&self) -> bool {
        self.from_stop == self.to_stop
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViaLocation {
    pub label: String,
    pub min_wait: Seconds,
    pub max_wait: Option<Seconds>,
    pub connections: Vec<ViaConnection>,
}

impl ViaLocation {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), min_wait: 0, max_wait: None, connections: Vec::new() }
    }

    pub fn stops(label: impl Into<String>, stops: &[StopIndex]) -> Self {
        let mut location = Self::new(label);
        location.connections.extend(stops.iter().map(|&stop| ViaConnection::stop(stop)));
        location
    }

    pub fn with_min_wait(mut self, min_wait: Seconds) -> Self {
        self.min_wait = min_wait;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Seconds) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn add_connection(mut self, connection: ViaConnection) -> Self {
        self.connections.push(connection);
        self
    }
}

/// A set of stops the journey must pass through, on board or by visiting them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassThroughPoint {
    pub label: String,
    stops: Vec<StopIndex>,
}

impl PassThroughPoint {
    pub fn new(label: impl Into<String>, stops: &[StopIndex]) -> Self {
        let mut stops = stops.to_vec();
        stops.sort_unstable();
        stops.dedup();
        Self { label: label.into(), stops }
    }

    pub fn contains(&self, stop: StopIndex) -> bool {
        self.stops.binary_search(&stop).is_ok()
    }

    pub fn stops(&self) -> &[StopIndex] {
        &self.stops
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiCriteriaRequest {
    pub relax_c1_at_destination: Option<RelaxFunction>,
    // c1 relaxation used when comparing arrivals that rode the same transit groups.
    pub transit_group_priority: Option<RelaxFunction>,
    pub pass_through_points: Vec<PassThroughPoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchParams {
    pub earliest_departure_time: Option<Timestamp>,
    pub latest_arrival_time: Option<Timestamp>,
    pub search_window: Seconds,
    pub timetable: bool,
    pub max_number_of_transfers: Option<u32>,
    pub number_of_additional_transfers: u32,
    pub access_paths: Vec<AccessEgress>,
    pub egress_paths: Vec<AccessEgress>,
    pub via_locations: Vec<ViaLocation>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            earliest_departure_time: None,
            latest_arrival_time: None,
            search_window: 0,
            timetable: false,
            max_number_of_transfers: None,
            number_of_additional_transfers: 5,
            access_paths: Vec::new(),
            egress_paths: Vec::new(),
            via_locations: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RaptorRequest {
    profile: RaptorProfile,
    direction: SearchDirection,
    search_params: SearchParams,
    multi_criteria: MultiCriteriaRequest,
    cancellation: Option<Arc<AtomicBool>>,
}

impl RaptorRequest {
    pub fn profile(&self) -> RaptorProfile {
        self.profile
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    pub fn search_params(&self) -> &SearchParams {
        &self.search_params
    }

    pub fn multi_criteria(&self) -> &MultiCriteriaRequest {
        &self.multi_criteria
    }

    pub fn is_pass_through(&self) -> bool {
        !self.multi_criteria.pass_through_points.is_empty()
    }

    pub fn is_via_search(&self) -> bool {
        !self.search_params.via_locations.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, Default)]
pub struct RaptorRequestBuilder {
    profile: RaptorProfile,
    direction: SearchDirection,
    search_params: SearchParams,
    multi_criteria: MultiCriteriaRequest,
    cancellation: Option<Arc<AtomicBool>>,
}

impl RaptorRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(mut self, profile: RaptorProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn earliest_departure_time(mut self, time: Timestamp) -> Self {
        self.search_params.earliest_departure_time = Some(time);
        self
    }

    pub fn latest_arrival_time(mut self, time: Timestamp) -> Self {
        self.search_params.latest_arrival_time = Some(time);
        self
    }

    pub fn search_window(mut self, window: Seconds) -> Self {
        self.search_params.search_window = window;
        self
    }

    pub fn timetable(mut self, timetable: bool) -> Self {
        self.search_params.timetable = timetable;
        self
    }

    pub fn max_number_of_transfers(mut self, max: u32) -> Self {
        self.search_params.max_number_of_transfers = Some(max);
        self
    }

    pub fn number_of_additional_transfers(mut self, n: u32) -> Self {
        self.search_params.number_of_additional_transfers = n;
        self
    }

    pub fn add_access_paths(mut self, paths: impl IntoIterator<Item = AccessEgress>) -> Self {
        self.search_params.access_paths.extend(paths);
        self
    }

    pub fn add_egress_paths(mut self, paths: impl IntoIterator<Item = AccessEgress>) -> Self {
        self.search_params.egress_paths.extend(paths);
        self
    }

    pub fn add_via_location(mut self, via: ViaLocation) -> Self {
        self.search_params.via_locations.push(via);
        self
    }

    pub fn add_pass_through_point(mut self, point: PassThroughPoint) -> Self {
        self.multi_criteria.pass_through_points.push(point);
        self
    }

    pub fn relax_c1_at_destination(mut self, relax: RelaxFunction) -> Self {
        self.multi_criteria.relax_c1_at_destination = Some(relax);
        self
    }

    pub fn transit_group_priority(mut self, relax: RelaxFunction) -> Self {
        self.multi_criteria.transit_group_priority = Some(relax);
        self
    }

    pub fn cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn build(self) -> Result<RaptorRequest, RaptorError> {
        let params = &self.search_params;
        let mc = &self.multi_criteria;

        match self.direction {
            SearchDirection::Forward if params.earliest_departure_time.is_none() => {
                return Err(RaptorError::MissingEarliestDepartureTime)
            }
            SearchDirection::Reverse if params.latest_arrival_time.is_none() => {
                return Err(RaptorError::MissingLatestArrivalTime)
            }
            _ => {}
        }
        if params.search_window < 0 {
            return Err(RaptorError::InvalidSearchWindow(params.search_window));
        }
        if params.access_paths.is_empty() {
            return Err(RaptorError::NoAccessPaths);
        }
        if params.egress_paths.is_empty() {
            return Err(RaptorError::NoEgressPaths);
        }
        for relax in mc.relax_c1_at_destination.iter().chain(mc.transit_group_priority.iter()) {
            if !relax.is_valid() {
                return Err(RaptorError::InvalidRelaxFunction { ratio: relax.ratio(), slack: relax.slack() });
            }
        }
        if let Some(via) = params.via_locations.iter().find(|via| via.connections.is_empty()) {
            return Err(RaptorError::EmptyViaLocation(via.label.clone()));
        }
        if let Some(point) = mc.pass_through_points.iter().find(|point| point.stops.is_empty()) {
            return Err(RaptorError::EmptyPassThroughPoint(point.label.clone()));
        }
        let pass_through = !mc.pass_through_points.is_empty();
        if pass_through && !params.via_locations.is_empty() {
            return Err(RaptorError::PassThroughAndViaConflict);
        }
        if pass_through && mc.transit_group_priority.is_some() {
            return Err(RaptorError::ConflictingC2Criteria);
        }
        if (pass_through || mc.transit_group_priority.is_some()) && !self.profile.is_multi_criteria() {
            return Err(RaptorError::MultiCriteriaRequired);
        }

        Ok(RaptorRequest {
            profile: self.profile,
            direction: self.direction,
            search_params: self.search_params,
            multi_criteria: self.multi_criteria,
            cancellation: self.cancellation,
        })
    }
}

/// Tuning shared by all searches of a service.
#[derive(Clone, Debug, PartialEq)]
pub struct RaptorTuningParameters {
    pub max_number_of_transfers: u32,
    pub iteration_departure_step: Seconds,
    pub search_timeout: Option<Duration>,
}

impl Default for RaptorTuningParameters {
    fn default() -> Self {
        Self {
            max_number_of_transfers: 12,
            iteration_departure_step: 60,
            search_timeout: None,
        }
    }
}
