use crate::pareto::ParetoComparator;
use crate::transit::{Cost, Seconds, Timestamp};

/// Which time criteria a destination comparator uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParetoTimeConfig {
    UseArrivalTime,
    // Later departure wins, minimizing the wait at the access side.
    UseDepartureTime,
    // Later iteration departure wins, on top of arrival time.
    UseTimetable,
}

/// Which cost criteria a comparator uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParetoCostConfig {
    None,
    UseC1,
    UseC1AndC2,
    UseC1RelaxedIfC2IsOptimal,
    UseC1RelaxDestination,
}

impl ParetoCostConfig {
    pub fn includes_c1(self) -> bool {
        self != ParetoCostConfig::None
    }
}

/// Returns true if the left c2 value dominates the right one.
pub type DominanceFunction = fn(Cost, Cost) -> bool;

/// `relaxed = value * ratio + slack`, used to tolerate alternatives that are slightly worse on c1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxFunction {
    ratio: f64,
    slack: Cost,
}

impl RelaxFunction {
    pub const NORMAL: RelaxFunction = RelaxFunction { ratio: 1.0, slack: 0 };
    pub const MIN_RATIO: f64 = 1.0;
    pub const MAX_RATIO: f64 = 4.0;

    pub fn new(ratio: f64, slack: Cost) -> Self {
        Self { ratio, slack }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn slack(&self) -> Cost {
        self.slack
    }

    pub fn is_valid(&self) -> bool {
        (Self::MIN_RATIO..=Self::MAX_RATIO).contains(&self.ratio) && self.slack >= 0
    }

    pub fn relax(&self, value: Cost) -> Cost {
        (value as f64 * self.ratio).round() as Cost + self.slack
    }
}

impl Default for RelaxFunction {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// The criteria of a destination arrival or path.
pub trait PathCriteria {
    fn iteration_departure_time(&self) -> Timestamp;
    fn start_time(&self) -> Timestamp;
    fn end_time(&self) -> Timestamp;
    fn number_of_transfers(&self) -> u32;
    fn c1(&self) -> Cost;
    fn c2(&self) -> Cost;

    fn duration_in_seconds(&self) -> Seconds {
        self.end_time() - self.start_time()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PathParetoComparator {
    time: ParetoTimeConfig,
    cost: ParetoCostConfig,
    relax_c1: RelaxFunction,
    c2_dominance: Option<DominanceFunction>,
    forward: bool,
}

/// Composes the destination comparator from the request flags. Transfers are always a criterion,
/// and path duration is one whenever c1 is.
pub fn pareto_comparator(
    time: ParetoTimeConfig,
    cost: ParetoCostConfig,
    relax_c1: RelaxFunction,
    c2_dominance: Option<DominanceFunction>,
) -> PathParetoComparator {
    PathParetoComparator { time, cost, relax_c1, c2_dominance, forward: true }
}

impl PathParetoComparator {
    /// In a reverse search the timetable criterion prefers the earlier iteration, which is the
    /// one arriving first.
    pub fn for_reverse_search(self) -> Self {
        Self { forward: false, ..self }
    }

    fn time_dominance<P: PathCriteria>(&self, l: &P, r: &P) -> bool {
        match self.time {
            ParetoTimeConfig::UseArrivalTime => l.end_time() < r.end_time(),
            ParetoTimeConfig::UseDepartureTime => l.start_time() > r.start_time(),
            ParetoTimeConfig::UseTimetable if self.forward => {
                l.iteration_departure_time() > r.iteration_departure_time() || l.end_time() < r.end_time()
            }
            ParetoTimeConfig::UseTimetable => {
                l.iteration_departure_time() < r.iteration_departure_time() || l.start_time() > r.start_time()
            }
        }
    }

    fn c2_dominance(&self, l: Cost, r: Cost) -> bool {
        self.c2_dominance.is_some_and(|dominance| dominance(l, r))
    }

    fn cost_dominance<P: PathCriteria>(&self, l: &P, r: &P) -> bool {
        if self.cost.includes_c1() && l.duration_in_seconds() < r.duration_in_seconds() {
            return true;
        }
        match self.cost {
            ParetoCostConfig::None => self.c2_dominance(l.c2(), r.c2()),
            ParetoCostConfig::UseC1 => l.c1() < r.c1(),
            ParetoCostConfig::UseC1AndC2 => l.c1() < r.c1() || self.c2_dominance(l.c2(), r.c2()),
            ParetoCostConfig::UseC1RelaxedIfC2IsOptimal => {
                c1_relaxed_if_c2_is_optimal(l.c1(), l.c2(), r.c1(), r.c2(), self.relax_c1, self.c2_dominance)
            }
            ParetoCostConfig::UseC1RelaxDestination => {
                l.c1() < self.relax_c1.relax(r.c1()) || self.c2_dominance(l.c2(), r.c2())
            }
        }
    }
}

impl<P: PathCriteria> ParetoComparator<P> for PathParetoComparator {
    fn left_dominance_exist(&self, left: &P, right: &P) -> bool {
        self.time_dominance(left, right)
            || left.number_of_transfers() < right.number_of_transfers()
            || self.cost_dominance(left, right)
    }
}

// Left wins on c1 within the relaxed bound while its c2 is not beaten, otherwise it must win
// outright. A c2 win is a win regardless of c1.
fn c1_relaxed_if_c2_is_optimal(
    l_c1: Cost,
    l_c2: Cost,
    r_c1: Cost,
    r_c2: Cost,
    relax: RelaxFunction,
    c2_dominance: Option<DominanceFunction>,
) -> bool {
    let Some(dominance) = c2_dominance else {
        return l_c1 < r_c1;
    };
    if dominance(l_c2, r_c2) {
        return true;
    }
    if dominance(r_c2, l_c2) {
        l_c1 < r_c1
    } else {
        l_c1 < relax.relax(r_c1)
    }
}

/// The criteria of an arrival at a stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StopArrivalKey {
    pub id: u32,
    pub time: Timestamp,
    pub round: u32,
    pub c1: Cost,
    pub c2: Cost,
    pub arrived_on_board: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct StopArrivalComparator {
    pub forward: bool,
    pub multi_criteria: bool,
    pub cost: ParetoCostConfig,
    pub relax_c1: RelaxFunction,
    pub c2_dominance: Option<DominanceFunction>,
}

impl ParetoComparator<StopArrivalKey> for StopArrivalComparator {
    fn left_dominance_exist(&self, l: &StopArrivalKey, r: &StopArrivalKey) -> bool {
        let time = if self.forward { l.time < r.time } else { l.time > r.time };
        if time || (l.arrived_on_board && !r.arrived_on_board) {
            return true;
        }
        if !self.multi_criteria {
            return false;
        }
        if l.round < r.round {
            return true;
        }
        let c2 = |l: Cost, r: Cost| self.c2_dominance.is_some_and(|dominance| dominance(l, r));
        match self.cost {
            ParetoCostConfig::None => c2(l.c2, r.c2),
            ParetoCostConfig::UseC1 | ParetoCostConfig::UseC1RelaxDestination => l.c1 < r.c1 || c2(l.c2, r.c2),
            ParetoCostConfig::UseC1AndC2 => l.c1 < r.c1 || c2(l.c2, r.c2),
            ParetoCostConfig::UseC1RelaxedIfC2IsOptimal => {
                c1_relaxed_if_c2_is_optimal(l.c1, l.c2, r.c1, r.c2, self.relax_c1, self.c2_dominance)
            }
        }
    }
}

/// A boarding of a trip on the pattern currently being scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PatternRide {
    pub prev_arrival: u32,
    pub trip: u32,
    pub board_pos: usize,
    pub board_time: Timestamp,
    pub board_cost: Cost,
    pub relative_c1: Cost,
    pub c2: Cost,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PatternRideComparator {
    pub forward: bool,
    pub multi_criteria: bool,
    pub c2_dominance: Option<DominanceFunction>,
}

impl ParetoComparator<PatternRide> for PatternRideComparator {
    fn left_dominance_exist(&self, l: &PatternRide, r: &PatternRide) -> bool {
        let trip = if self.forward { l.trip < r.trip } else { l.trip > r.trip };
        if trip {
            return true;
        }
        self.multi_criteria
            && (l.relative_c1 < r.relative_c1 || self.c2_dominance.is_some_and(|dominance| dominance(l.c2, r.c2)))
    }
}
