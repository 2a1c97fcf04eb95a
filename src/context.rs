use crate::access_egress::{AccessEgress, AccessPaths, EgressPaths};
use crate::calculator::{SearchSlackProvider, TransitCalculator};
use crate::error::RaptorError;
use crate::lifecycle::{LifeCycleEventPublisher, LifeCycleSubscriptions};
use crate::multicriteria::{
    pareto_comparator, DominanceFunction, ParetoCostConfig, ParetoTimeConfig, PathParetoComparator,
    PatternRideComparator, RelaxFunction, StopArrivalComparator,
};
use crate::request::{PassThroughPoint, RaptorProfile, RaptorRequest, RaptorTuningParameters, ViaConnection, ViaLocation};
use crate::round_tracker::RoundTracker;
use crate::transit::{Cost, CostCalculator, PatternIndex, Seconds, StopIndex, TransitDataProvider};

pub type AcceptC2<'a> = Box<dyn Fn(Cost) -> bool + 'a>;

/// The connections from one via leg into the next, in search direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViaConnections {
    pub label: String,
    pub min_wait: Seconds,
    pub max_wait: Option<Seconds>,
    pub connections: Vec<ViaConnection>,
}

impl ViaConnections {
    fn from_location(location: &ViaLocation, forward: bool) -> Self {
        let connections = location
            .connections
            .iter()
            .map(|c| if forward { *c } else { ViaConnection::transfer(c.to_stop, c.from_stop, c.duration, c.c1) })
            .collect();
        Self {
            label: location.label.clone(),
            min_wait: location.min_wait,
            max_wait: location.max_wait,
            connections,
        }
    }

    pub fn from_stop(&self, stop: StopIndex) -> impl Iterator<Item = &ViaConnection> {
        self.connections.iter().filter(move |c| c.from_stop == stop)
    }
}

/// One segment of a via search. The first leg has the access paths, the last the egress paths.
#[derive(Debug)]
pub struct SearchContextViaLeg {
    index: usize,
    access: AccessPaths,
    via: Option<ViaConnections>,
    egress: Option<EgressPaths>,
}

impl SearchContextViaLeg {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn access(&self) -> &AccessPaths {
        &self.access
    }

    pub fn via_connections(&self) -> Option<&ViaConnections> {
        self.via.as_ref()
    }

    pub fn egress(&self) -> Option<&EgressPaths> {
        self.egress.as_ref()
    }

    pub fn is_last(&self) -> bool {
        self.egress.is_some()
    }
}

/// Splits a search into one leg per via location plus one.
pub(crate) fn create_via_legs(
    access: AccessPaths,
    egress: EgressPaths,
    via_connections: Vec<ViaConnections>,
    num_via_locations: usize,
) -> Result<Vec<SearchContextViaLeg>, RaptorError> {
    if via_connections.len() != num_via_locations {
        return Err(RaptorError::ViaConnectionCountMismatch {
            expected: num_via_locations,
            actual: via_connections.len(),
        });
    }
    let mut legs = Vec::with_capacity(via_connections.len() + 1);
    let mut access = Some(access);
    for (index, via) in via_connections.into_iter().enumerate() {
        legs.push(SearchContextViaLeg {
            index,
            access: access.take().unwrap_or_default(),
            via: Some(via),
            egress: None,
        });
    }
    legs.push(SearchContextViaLeg {
        index: legs.len(),
        access: access.unwrap_or_default(),
        via: None,
        egress: Some(egress),
    });
    Ok(legs)
}

/// Where c2 comes from, if anywhere.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum C2Source {
    None,
    // Points in search direction.
    PassThrough(Vec<PassThroughPoint>),
    TransitGroupPriority,
}

impl C2Source {
    /// The c2 after visiting `stop`: the number of pass-through points visited in order.
    pub fn visit(&self, c2: Cost, stop: StopIndex) -> Cost {
        let C2Source::PassThrough(points) = self else {
            return c2;
        };
        let mut c2 = c2;
        while let Some(point) = points.get(c2 as usize) {
            if !point.contains(stop) {
                break;
            }
            c2 += 1;
        }
        c2
    }

    pub fn board<T: TransitDataProvider + ?Sized>(&self, c2: Cost, transit: &T, pattern: PatternIndex) -> Cost {
        match self {
            C2Source::TransitGroupPriority => c2 | (1 << (transit.transit_group(pattern) % 32)),
            _ => c2,
        }
    }

    pub fn is_active(&self) -> bool {
        *self != C2Source::None
    }

    fn dominance(&self) -> Option<DominanceFunction> {
        match self {
            C2Source::None => None,
            C2Source::PassThrough(_) => Some(|l, r| l > r),
            C2Source::TransitGroupPriority => Some(|l, r| l != r),
        }
    }
}

pub struct SearchContextBuilder<'a, T: TransitDataProvider + ?Sized> {
    request: &'a RaptorRequest,
    tuning: &'a RaptorTuningParameters,
    transit: &'a T,
    accept_c2_at_destination: Option<AcceptC2<'a>>,
}

impl<'a, T: TransitDataProvider + ?Sized> SearchContextBuilder<'a, T> {
    pub fn build(self) -> Result<SearchContext<'a, T>, RaptorError> {
        let request = self.request;
        let params = request.search_params();
        let profile = request.profile();
        let forward = request.direction().is_forward();
        let num_stops = self.transit.num_stops();

        let (access, egress) = if forward {
            (&params.access_paths, &params.egress_paths)
        } else {
            (&params.egress_paths, &params.access_paths)
        };
        let access = AccessPaths::create(valid_legs(access, num_stops)?, profile);
        let egress = EgressPaths::create(valid_legs(egress, num_stops)?, profile);
        if access.is_empty() {
            return Err(RaptorError::NoAccessPaths);
        }
        if egress.is_empty() {
            return Err(RaptorError::NoEgressPaths);
        }

        for via in &params.via_locations {
            for connection in &via.connections {
                check_stop(connection.from_stop, num_stops)?;
                check_stop(connection.to_stop, num_stops)?;
            }
        }
        let pass_through_points = &request.multi_criteria().pass_through_points;
        for point in pass_through_points {
            for &stop in point.stops() {
                check_stop(stop, num_stops)?;
            }
        }
        if self.accept_c2_at_destination.is_some() && pass_through_points.is_empty() {
            return Err(RaptorError::EmptyPassThroughPoints);
        }

        let mut via_locations: Vec<_> = params.via_locations.iter().collect();
        if !forward {
            via_locations.reverse();
        }
        let via_connections: Vec<_> =
            via_locations.iter().map(|location| ViaConnections::from_location(location, forward)).collect();
        let legs = create_via_legs(access, egress, via_connections, params.via_locations.len())?;

        let mc = request.multi_criteria();
        let c2_source = if !pass_through_points.is_empty() {
            let mut points = pass_through_points.clone();
            if !forward {
                points.reverse();
            }
            C2Source::PassThrough(points)
        } else if mc.transit_group_priority.is_some() {
            C2Source::TransitGroupPriority
        } else {
            C2Source::None
        };

        let accept_c2_at_destination = match (self.accept_c2_at_destination, &c2_source) {
            (Some(accept), _) => Some(accept),
            (None, C2Source::PassThrough(points)) => {
                let n = points.len() as Cost;
                Some(Box::new(move |c2: Cost| c2 == n) as AcceptC2<'a>)
            }
            (None, _) => None,
        };

        let cost_calculator = if profile.is_multi_criteria() { self.transit.cost_calculator() } else { None };
        let (stop_cost, destination_cost, relax_c1) = if !profile.is_multi_criteria() {
            (ParetoCostConfig::None, ParetoCostConfig::None, RelaxFunction::NORMAL)
        } else if let Some(relax) = mc.transit_group_priority {
            (ParetoCostConfig::UseC1RelaxedIfC2IsOptimal, ParetoCostConfig::UseC1RelaxedIfC2IsOptimal, relax)
        } else if matches!(c2_source, C2Source::PassThrough(_)) {
            let destination = if mc.relax_c1_at_destination.is_some() {
                ParetoCostConfig::UseC1RelaxDestination
            } else {
                ParetoCostConfig::UseC1AndC2
            };
            (ParetoCostConfig::UseC1AndC2, destination, mc.relax_c1_at_destination.unwrap_or_default())
        } else if cost_calculator.is_none() {
            (ParetoCostConfig::None, ParetoCostConfig::None, RelaxFunction::NORMAL)
        } else if let Some(relax) = mc.relax_c1_at_destination {
            (ParetoCostConfig::UseC1, ParetoCostConfig::UseC1RelaxDestination, relax)
        } else {
            (ParetoCostConfig::UseC1, ParetoCostConfig::UseC1, RelaxFunction::NORMAL)
        };

        let time_config = if params.timetable {
            ParetoTimeConfig::UseTimetable
        } else if forward {
            ParetoTimeConfig::UseArrivalTime
        } else {
            ParetoTimeConfig::UseDepartureTime
        };

        log::debug!(
            "Search context: {:?} {:?}, {} via legs, time {time_config:?}, cost {destination_cost:?}.",
            profile,
            request.direction(),
            legs.len(),
        );

        Ok(SearchContext {
            request,
            tuning: self.tuning,
            transit: self.transit,
            calculator: TransitCalculator::new(request.direction(), params, self.tuning),
            slack_provider: SearchSlackProvider::new(self.transit.slack_provider(), request.direction()),
            cost_calculator,
            time_config,
            stop_cost,
            destination_cost,
            relax_c1,
            c2_source,
            accept_c2_at_destination,
            legs,
            subscriptions: Some(LifeCycleSubscriptions::new()),
        })
    }
}

fn check_stop(stop: StopIndex, num_stops: usize) -> Result<(), RaptorError> {
    if stop as usize >= num_stops {
        return Err(RaptorError::StopOutOfRange { stop, num_stops });
    }
    Ok(())
}

fn valid_legs(legs: &[AccessEgress], num_stops: usize) -> Result<Vec<AccessEgress>, RaptorError> {
    let mut valid = Vec::with_capacity(legs.len());
    for leg in legs {
        if leg.stop as usize >= num_stops {
            return Err(RaptorError::InvalidAccessEgress { stop: leg.stop, num_stops });
        }
        if leg.is_valid(num_stops) {
            valid.push(*leg);
        } else {
            log::warn!("Dropping street leg to stop {} with negative duration {}s.", leg.stop, leg.duration);
        }
    }
    Ok(valid)
}

/// Everything a worker needs for one search, fixed for the duration of the search.
pub struct SearchContext<'a, T: TransitDataProvider + ?Sized> {
    request: &'a RaptorRequest,
    tuning: &'a RaptorTuningParameters,
    transit: &'a T,
    calculator: TransitCalculator,
    slack_provider: SearchSlackProvider<'a>,
    cost_calculator: Option<&'a dyn CostCalculator>,
    time_config: ParetoTimeConfig,
    stop_cost: ParetoCostConfig,
    destination_cost: ParetoCostConfig,
    relax_c1: RelaxFunction,
    c2_source: C2Source,
    accept_c2_at_destination: Option<AcceptC2<'a>>,
    legs: Vec<SearchContextViaLeg>,
    subscriptions: Option<LifeCycleSubscriptions<'a>>,
}

impl<'a, T: TransitDataProvider + ?Sized> SearchContext<'a, T> {
    pub fn of(
        request: &'a RaptorRequest,
        tuning: &'a RaptorTuningParameters,
        transit: &'a T,
        accept_c2_at_destination: Option<AcceptC2<'a>>,
    ) -> SearchContextBuilder<'a, T> {
        SearchContextBuilder { request, tuning, transit, accept_c2_at_destination }
    }

    pub fn request(&self) -> &'a RaptorRequest {
        self.request
    }

    pub fn tuning(&self) -> &'a RaptorTuningParameters {
        self.tuning
    }

    pub fn transit(&self) -> &'a T {
        self.transit
    }

    pub fn profile(&self) -> RaptorProfile {
        self.request.profile()
    }

    pub fn calculator(&self) -> &TransitCalculator {
        &self.calculator
    }

    pub fn slack_provider(&self) -> &SearchSlackProvider<'a> {
        &self.slack_provider
    }

    /// Present only for multi-criteria searches on a provider with costs.
    pub fn cost_calculator(&self) -> Option<&'a dyn CostCalculator> {
        self.cost_calculator
    }

    pub fn time_config(&self) -> ParetoTimeConfig {
        self.time_config
    }

    pub fn cost_config(&self) -> ParetoCostConfig {
        self.destination_cost
    }

    pub fn legs(&self) -> &[SearchContextViaLeg] {
        &self.legs
    }

    pub fn has_time_dependent_access(&self) -> bool {
        self.legs.first().is_some_and(|leg| leg.access().has_time_dependent_access())
    }

    pub(crate) fn c2_source(&self) -> &C2Source {
        &self.c2_source
    }

    pub(crate) fn accept_c2_at_destination(&self, c2: Cost) -> bool {
        self.accept_c2_at_destination.as_ref().map_or(true, |accept| accept(c2))
    }

    pub fn round_tracker(&self) -> RoundTracker {
        let params = self.request.search_params();
        let max_transfers = params
            .max_number_of_transfers
            .map_or(self.tuning.max_number_of_transfers, |max| max.min(self.tuning.max_number_of_transfers));
        RoundTracker::new(max_transfers, params.number_of_additional_transfers)
    }

    pub fn path_comparator(&self) -> PathParetoComparator {
        let comparator =
            pareto_comparator(self.time_config, self.destination_cost, self.relax_c1, self.c2_source.dominance());
        if self.calculator.search_forward() { comparator } else { comparator.for_reverse_search() }
    }

    pub(crate) fn stop_arrival_comparator(&self) -> StopArrivalComparator {
        StopArrivalComparator {
            forward: self.calculator.search_forward(),
            multi_criteria: self.profile().is_multi_criteria(),
            cost: self.stop_cost,
            relax_c1: self.relax_c1,
            c2_dominance: self.c2_source.dominance(),
        }
    }

    pub(crate) fn pattern_ride_comparator(&self) -> PatternRideComparator {
        PatternRideComparator {
            forward: self.calculator.search_forward(),
            multi_criteria: self.profile().is_multi_criteria(),
            c2_dominance: self.c2_source.dominance(),
        }
    }

    /// Subscriptions can be added until the publisher is created.
    pub fn life_cycle(&mut self) -> Option<&mut LifeCycleSubscriptions<'a>> {
        self.subscriptions.as_mut()
    }

    pub fn create_life_cycle_publisher(&mut self) -> Result<LifeCycleEventPublisher<'a>, RaptorError> {
        self.subscriptions
            .take()
            .map(LifeCycleSubscriptions::close)
            .ok_or(RaptorError::LifeCyclePublisherAlreadyCreated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkBuilder;
    use crate::request::{RaptorRequestBuilder, SearchDirection};
    use crate::transit::DefaultCostCalculator;

    fn network() -> crate::network::Network {
        let mut builder = NetworkBuilder::new();
        builder.add_stops(&["A", "B", "C"]);
        builder.add_route("R1", &["A", "B", "C"], &["0:10 0:20 0:30"]).unwrap();
        builder.cost_calculator(DefaultCostCalculator::default()).build()
    }

    fn request() -> RaptorRequestBuilder {
        RaptorRequestBuilder::new()
            .earliest_departure_time(0)
            .latest_arrival_time(3600)
            .add_access_paths([AccessEgress::walk(0, 60)])
            .add_egress_paths([AccessEgress::walk(2, 60)])
    }

    #[test]
    fn criteria_follow_request() {
        let network = network();
        let tuning = RaptorTuningParameters::default();

        let r = request().build().unwrap();
        let ctx = SearchContext::of(&r, &tuning, &network, None).build().unwrap();
        assert_eq!(ctx.time_config(), ParetoTimeConfig::UseArrivalTime);
        assert_eq!(ctx.cost_config(), ParetoCostConfig::UseC1);
        assert!(ctx.cost_calculator().is_some());
        assert_eq!(ctx.legs().len(), 1);

        let r = request().direction(SearchDirection::Reverse).timetable(true).build().unwrap();
        let ctx = SearchContext::of(&r, &tuning, &network, None).build().unwrap();
        assert_eq!(ctx.time_config(), ParetoTimeConfig::UseTimetable);
        // The access of a reverse search is the request's egress.
        assert_eq!(ctx.legs()[0].access().iter().next().map(|a| a.stop), Some(2));

        let r = request().profile(RaptorProfile::Standard).build().unwrap();
        let ctx = SearchContext::of(&r, &tuning, &network, None).build().unwrap();
        assert_eq!(ctx.cost_config(), ParetoCostConfig::None);
        assert!(ctx.cost_calculator().is_none());

        let r = request().relax_c1_at_destination(RelaxFunction::new(1.2, 0)).build().unwrap();
        let ctx = SearchContext::of(&r, &tuning, &network, None).build().unwrap();
        assert_eq!(ctx.cost_config(), ParetoCostConfig::UseC1RelaxDestination);
    }

    #[test]
    fn rejects_invalid_stops_and_c2_setup() {
        let network = network();
        let tuning = RaptorTuningParameters::default();

        let r = request().add_access_paths([AccessEgress::walk(9, 60)]).build().unwrap();
        assert_eq!(
            SearchContext::of(&r, &tuning, &network, None).build().err(),
            Some(RaptorError::InvalidAccessEgress { stop: 9, num_stops: 3 })
        );

        let r = request().add_via_location(ViaLocation::stops("V", &[7])).build().unwrap();
        assert_eq!(
            SearchContext::of(&r, &tuning, &network, None).build().err(),
            Some(RaptorError::StopOutOfRange { stop: 7, num_stops: 3 })
        );

        let r = request().build().unwrap();
        assert_eq!(
            SearchContext::of(&r, &tuning, &network, Some(Box::new(|c2: Cost| c2 == 1))).build().err(),
            Some(RaptorError::EmptyPassThroughPoints)
        );
    }

    #[test]
    fn via_legs_split_access_and_egress() {
        let access = AccessPaths::create(vec![AccessEgress::walk(0, 60)], RaptorProfile::MultiCriteria);
        let egress = EgressPaths::create(vec![AccessEgress::walk(2, 60)], RaptorProfile::MultiCriteria);
        let via = ViaConnections::from_location(&ViaLocation::stops("V", &[1]), true);

        let legs = create_via_legs(access.clone(), egress.clone(), vec![via.clone(), via.clone()], 2).unwrap();
        assert_eq!(legs.len(), 3);
        assert_eq!(legs[0].access().len(), 1);
        assert!(legs[1].access().is_empty());
        assert!(legs[1].egress().is_none());
        assert!(legs[2].is_last());
        assert!(legs[2].via_connections().is_none());

        assert_eq!(
            create_via_legs(access, egress, vec![via], 2).err(),
            Some(RaptorError::ViaConnectionCountMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn reverse_via_connections_are_flipped() {
        let location = ViaLocation::new("V").add_connection(ViaConnection::transfer(1, 2, 60, 100));
        let via = ViaConnections::from_location(&location, false);
        assert_eq!(via.connections, vec![ViaConnection::transfer(2, 1, 60, 100)]);
        assert_eq!(via.from_stop(2).count(), 1);
    }

    #[test]
    fn pass_through_counts_points_in_order() {
        let source = C2Source::PassThrough(vec![PassThroughPoint::new("P1", &[1]), PassThroughPoint::new("P2", &[2, 3])]);
        assert_eq!(source.visit(0, 2), 0);
        assert_eq!(source.visit(0, 1), 1);
        assert_eq!(source.visit(1, 3), 2);
        assert_eq!(source.visit(2, 1), 2);
    }

    #[test]
    fn publisher_is_created_once() {
        let network = network();
        let tuning = RaptorTuningParameters::default();
        let r = request().build().unwrap();
        let mut ctx = SearchContext::of(&r, &tuning, &network, None).build().unwrap();
        assert!(ctx.life_cycle().is_some());
        assert!(ctx.create_life_cycle_publisher().is_ok());
        assert!(ctx.life_cycle().is_none());
        assert!(matches!(ctx.create_life_cycle_publisher(), Err(RaptorError::LifeCyclePublisherAlreadyCreated)));
    }
}
