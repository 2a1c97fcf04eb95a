use crate::access_egress::AccessEgress;
use crate::calculator::TransitCalculator;
use crate::multicriteria::{StopArrivalComparator, StopArrivalKey};
use crate::pareto::{ParetoSet, ParetoSetEventListener};
use crate::request::ViaConnection;
use crate::round_tracker::RoundTracker;
use crate::transit::{Cost, PatternIndex, Seconds, StopIndex, Timestamp, Transfer, TripIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrivalId(pub(crate) u32);

impl ArrivalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A ride on a trip, with positions and times in search direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitRide {
    pub pattern: PatternIndex,
    pub trip: TripIndex,
    pub board_pos: usize,
    pub alight_pos: usize,
    pub board_time: Timestamp,
    pub alight_time: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrivalKind {
    Access(AccessEgress),
    Transit(TransitRide),
    // The transfer as listed for the stop the search came from.
    Transfer(Transfer),
    // Arrival seeded into the next via leg. The connection is in search direction.
    Via { connection: ViaConnection, min_wait: Seconds, max_wait: Option<Seconds> },
}

/// One arrival at a stop. Arrivals form chains back to an access leg through `previous`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopArrival {
    pub stop: StopIndex,
    pub time: Timestamp,
    pub round: u32,
    pub c1: Cost,
    pub c2: Cost,
    pub arrived_on_board: bool,
    pub previous: Option<ArrivalId>,
    pub kind: ArrivalKind,
}

impl StopArrival {
    pub(crate) fn key(&self, id: u32) -> StopArrivalKey {
        StopArrivalKey {
            id,
            time: self.time,
            round: self.round,
            c1: self.c1,
            c2: self.c2,
            arrived_on_board: self.arrived_on_board,
        }
    }
}

/// Owns every arrival created during a search. Arrivals are never removed, only marked as no
/// longer part of a stop's Pareto set, so paths can always be traced back.
#[derive(Debug, Default)]
pub struct ArrivalArena {
    arrivals: Vec<StopArrival>,
    alive: Vec<bool>,
}

impl ArrivalArena {
    pub(crate) fn push(&mut self, arrival: StopArrival) -> ArrivalId {
        let id = ArrivalId(self.arrivals.len() as u32);
        self.arrivals.push(arrival);
        self.alive.push(true);
        id
    }

    pub fn get(&self, id: ArrivalId) -> &StopArrival {
        &self.arrivals[id.index()]
    }

    pub fn is_alive(&self, id: ArrivalId) -> bool {
        self.alive[id.index()]
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.arrivals.len() as u32
    }

    /// The time at `id` after delaying the access leg its chain starts with, so that the traveller
    /// arrives no earlier than `latest_arrival_time`. Only chains of access, transfers and via
    /// connections are shifted; anything after a ride is fixed by the timetable.
    pub(crate) fn time_shifted_arrival_time(&self, id: ArrivalId, latest_arrival_time: Timestamp) -> Timestamp {
        let arrival = self.get(id);
        let delta = latest_arrival_time - arrival.time;
        if delta <= 0 {
            return arrival.time;
        }
        let mut current = arrival;
        loop {
            match current.kind {
                ArrivalKind::Access(access) => {
                    let shifted = access.latest_arrival_time(current.time + delta).unwrap_or(current.time);
                    return arrival.time + (shifted - current.time).max(0);
                }
                ArrivalKind::Transit(_) => return arrival.time,
                ArrivalKind::Transfer(_) | ArrivalKind::Via { .. } => match current.previous {
                    Some(previous) => current = self.get(previous),
                    None => return arrival.time,
                },
            }
        }
    }
}

struct ArrivalDropper<'a> {
    arena: &'a mut ArrivalArena,
}

impl ParetoSetEventListener<StopArrivalKey> for ArrivalDropper<'_> {
    fn notify_element_dropped(&mut self, element: &StopArrivalKey, _dropped_by: &StopArrivalKey) {
        self.arena.alive[element.id as usize] = false;
    }
}

/// An arrival at the destination, in search direction: `departure_time` is when the egress leg
/// leaves the stop and `arrival_time` is when it reaches the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestinationArrival {
    pub previous: ArrivalId,
    pub egress: AccessEgress,
    pub departure_time: Timestamp,
    pub arrival_time: Timestamp,
    pub round: u32,
    pub c1: Cost,
    pub c2: Cost,
    pub iteration_time: Timestamp,
}

impl DestinationArrival {
    pub fn number_of_transfers(&self) -> u32 {
        self.round.saturating_sub(1)
    }
}

/// The stop arrivals of one via leg.
pub(crate) struct LegState {
    stops: Vec<ParetoSet<StopArrivalKey, StopArrivalComparator>>,
    pub round_tracker: RoundTracker,
    // Added in the current round.
    current_round: Vec<ArrivalId>,
    // Alive arrivals from the previous round, the ones trips are boarded from.
    previous_round: Vec<ArrivalId>,
    // Everything added during the current iteration, handed over to the next via leg.
    iteration_arrivals: Vec<ArrivalId>,
    seeds: Vec<StopArrival>,
}

impl LegState {
    pub fn new(num_stops: usize, comparator: StopArrivalComparator, round_tracker: RoundTracker) -> Self {
        Self {
            stops: (0..num_stops).map(|_| ParetoSet::new(comparator)).collect(),
            round_tracker,
            current_round: Vec::new(),
            previous_round: Vec::new(),
            iteration_arrivals: Vec::new(),
            seeds: Vec::new(),
        }
    }

    pub fn setup_iteration(&mut self) {
        self.round_tracker.setup_iteration();
        self.current_round.clear();
        self.previous_round.clear();
        self.iteration_arrivals.clear();
    }

    /// Adds the arrival unless an existing arrival at the stop dominates it.
    pub fn add(&mut self, arena: &mut ArrivalArena, arrival: StopArrival) -> Option<ArrivalId> {
        let set = &mut self.stops[arrival.stop as usize];
        if !set.qualify(&arrival.key(arena.next_id())) {
            return None;
        }
        let id = arena.push(arrival);
        set.add_with_listener(arrival.key(id.0), &mut ArrivalDropper { arena });
        self.current_round.push(id);
        self.iteration_arrivals.push(id);
        Some(id)
    }

    /// Makes the alive arrivals of the round just completed the ones to board from. Returns false
    /// if there are none.
    pub fn prepare_for_next_round(&mut self, arena: &ArrivalArena) -> bool {
        self.previous_round.clear();
        self.previous_round.extend(self.current_round.iter().copied().filter(|&id| arena.is_alive(id)));
        self.current_round.clear();
        !self.previous_round.is_empty()
    }

    pub fn previous_round(&self) -> &[ArrivalId] {
        &self.previous_round
    }

    pub fn current_round(&self) -> &[ArrivalId] {
        &self.current_round
    }

    pub fn iteration_arrivals(&self) -> &[ArrivalId] {
        &self.iteration_arrivals
    }

    pub fn add_seed(&mut self, seed: StopArrival) {
        self.seeds.push(seed);
    }

    pub fn take_seeds(&mut self) -> Vec<StopArrival> {
        std::mem::take(&mut self.seeds)
    }

    pub fn arrivals_at(&self, stop: StopIndex) -> impl Iterator<Item = &StopArrivalKey> {
        self.stops[stop as usize].iter()
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }
}

/// Best arrival time and fewest rides per stop, for the last via leg.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopArrivals {
    best_times: Vec<Option<Timestamp>>,
    fewest_rides: Vec<Option<u32>>,
    best_destination_time: Option<Timestamp>,
}

impl StopArrivals {
    pub(crate) fn from_leg(leg: &LegState, calculator: &TransitCalculator, best_destination_time: Option<Timestamp>) -> Self {
        let mut best_times = Vec::with_capacity(leg.num_stops());
        let mut fewest_rides = Vec::with_capacity(leg.num_stops());
        for stop in 0..leg.num_stops() as StopIndex {
            let mut best_time: Option<Timestamp> = None;
            let mut rides: Option<u32> = None;
            for arrival in leg.arrivals_at(stop) {
                if best_time.map_or(true, |best| calculator.is_before(arrival.time, best)) {
                    best_time = Some(arrival.time);
                }
                rides = Some(rides.map_or(arrival.round, |r| r.min(arrival.round)));
            }
            best_times.push(best_time);
            fewest_rides.push(rides);
        }
        Self { best_times, fewest_rides, best_destination_time }
    }

    /// Arrival time in search direction: the latest departure for a reverse search.
    pub fn best_time(&self, stop: StopIndex) -> Option<Timestamp> {
        self.best_times.get(stop as usize).copied().flatten()
    }

    pub fn fewest_rides(&self, stop: StopIndex) -> Option<u32> {
        self.fewest_rides.get(stop as usize).copied().flatten()
    }

    pub fn reached(&self, stop: StopIndex) -> bool {
        self.best_time(stop).is_some()
    }

    pub fn best_destination_time(&self) -> Option<Timestamp> {
        self.best_destination_time
    }
}
