use crate::access_egress::AccessEgress;

// Timestamp is seconds since midnight of the service day. Signed, because the reverse search
// subtracts durations and iteration bounds may move before midnight.
pub type Timestamp = i32;
pub type Seconds = i32;
// Generalized cost in centi-seconds.
pub type Cost = i32;
pub type StopIndex = u32;
pub type PatternIndex = u32;
pub type TripIndex = u32;

/// Converts a cost expressed in seconds (possibly fractional) to the integer cost unit used in the
/// search.
pub fn to_raptor_cost(seconds: f64) -> Cost {
    (seconds * 100.0).round() as Cost
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopTime {
    pub arrival_time: Timestamp,
    pub departure_time: Timestamp,
}

/// A street transfer. In `transfers_from_stop` the `stop` is the destination of the walk, in
/// `transfers_to_stop` it is the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub stop: StopIndex,
    pub duration: Seconds,
    pub c1: Cost,
}

impl Transfer {
    pub const DEFAULT_WALK_RELUCTANCE: f64 = 2.0;

    pub fn walk(stop: StopIndex, duration: Seconds) -> Self {
        Self {
            stop,
            duration,
            c1: to_raptor_cost(duration as f64 * Self::DEFAULT_WALK_RELUCTANCE),
        }
    }
}

pub trait SlackProvider {
    fn transfer_slack(&self) -> Seconds;
    fn board_slack(&self, slack_index: usize) -> Option<Seconds>;
    fn alight_slack(&self, slack_index: usize) -> Option<Seconds>;
}

/// Same slack for every pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultSlackProvider {
    pub transfer_slack: Seconds,
    pub board_slack: Seconds,
    pub alight_slack: Seconds,
}

impl DefaultSlackProvider {
    pub fn new(transfer_slack: Seconds, board_slack: Seconds, alight_slack: Seconds) -> Self {
        Self { transfer_slack, board_slack, alight_slack }
    }
}

impl SlackProvider for DefaultSlackProvider {
    fn transfer_slack(&self) -> Seconds {
        self.transfer_slack
    }

    fn board_slack(&self, _slack_index: usize) -> Option<Seconds> {
        Some(self.board_slack)
    }

    fn alight_slack(&self, _slack_index: usize) -> Option<Seconds> {
        Some(self.alight_slack)
    }
}

/// Board/alight slack looked up by the pattern's slack index. Patterns pointing outside the table
/// have no slack, which the search reports as a provider error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternSlackProvider {
    pub transfer_slack: Seconds,
    // (board, alight)
    pub entries: Vec<(Seconds, Seconds)>,
}

impl SlackProvider for PatternSlackProvider {
    fn transfer_slack(&self) -> Seconds {
        self.transfer_slack
    }

    fn board_slack(&self, slack_index: usize) -> Option<Seconds> {
        self.entries.get(slack_index).map(|&(board, _)| board)
    }

    fn alight_slack(&self, slack_index: usize) -> Option<Seconds> {
        self.entries.get(slack_index).map(|&(_, alight)| alight)
    }
}

/// Generalized cost plugin. All durations passed in are positive, regardless of search direction.
pub trait CostCalculator {
    /// Cost of waiting `wait_time` at `board_stop` and boarding. `first_boarding` is true when no
    /// ride precedes this one.
    fn boarding_cost(&self, first_boarding: bool, wait_time: Seconds, board_stop: StopIndex) -> Cost;

    /// Cost of a ride given the cost of boarding it, added to the cost at the boarding stop.
    fn transit_arrival_cost(
        &self,
        board_cost: Cost,
        alight_slack: Seconds,
        transit_time: Seconds,
        pattern: PatternIndex,
        to_stop: StopIndex,
    ) -> Cost;

    /// Riding cost relative to a fixed point in time, used to compare boardings of the same
    /// pattern made at different stops. `board_time` increases in search direction.
    fn on_trip_relative_riding_cost(&self, board_time: Timestamp, pattern: PatternIndex) -> Cost;

    fn wait_cost(&self, wait_time: Seconds) -> Cost;

    fn egress_cost(&self, egress: &AccessEgress) -> Cost;
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefaultCostCalculator {
    board_cost: Cost,
    transfer_cost: Cost,
    // Factors are cost per second (reluctance * 100), so costs stay additive.
    wait_factor: i32,
    default_transit_factor: i32,
    transit_factors: Vec<i32>,
    stop_costs: Option<Vec<Cost>>,
}

impl DefaultCostCalculator {
    pub fn new(board_cost: Seconds, transfer_cost: Seconds, wait_reluctance: f64, transit_reluctance: f64) -> Self {
        Self {
            board_cost: to_raptor_cost(board_cost as f64),
            transfer_cost: to_raptor_cost(transfer_cost as f64),
            wait_factor: to_raptor_cost(wait_reluctance),
            default_transit_factor: to_raptor_cost(transit_reluctance),
            transit_factors: Vec::new(),
            stop_costs: None,
        }
    }

    /// Overrides the transit reluctance of one pattern.
    pub fn with_transit_reluctance(mut self, pattern: PatternIndex, reluctance: f64) -> Self {
        let index = pattern as usize;
        if self.transit_factors.len() <= index {
            self.transit_factors.resize(index + 1, self.default_transit_factor);
        }
        self.transit_factors[index] = to_raptor_cost(reluctance);
        self
    }

    /// Extra cost for boarding or alighting at each stop, indexed by stop.
    pub fn with_stop_costs(mut self, stop_costs: Vec<Cost>) -> Self {
        self.stop_costs = Some(stop_costs);
        self
    }

    fn transit_factor(&self, pattern: PatternIndex) -> i32 {
        self.transit_factors.get(pattern as usize).copied().unwrap_or(self.default_transit_factor)
    }

    fn stop_cost(&self, stop: StopIndex) -> Cost {
        match &self.stop_costs {
            Some(costs) => costs.get(stop as usize).copied().unwrap_or(0),
            None => 0,
        }
    }
}

impl Default for DefaultCostCalculator {
    fn default() -> Self {
        Self::new(60, 120, 0.8, 1.0)
    }
}

impl CostCalculator for DefaultCostCalculator {
    fn boarding_cost(&self, first_boarding: bool, wait_time: Seconds, board_stop: StopIndex) -> Cost {
        let board_cost = if first_boarding {
            self.board_cost
        } else {
            self.board_cost + self.transfer_cost
        };
        self.wait_factor * wait_time + board_cost + self.stop_cost(board_stop)
    }

    fn transit_arrival_cost(
        &self,
        board_cost: Cost,
        alight_slack: Seconds,
        transit_time: Seconds,
        pattern: PatternIndex,
        to_stop: StopIndex,
    ) -> Cost {
        board_cost
            + self.transit_factor(pattern) * transit_time
            + self.wait_factor * alight_slack
            + self.stop_cost(to_stop)
    }

    fn on_trip_relative_riding_cost(&self, board_time: Timestamp, pattern: PatternIndex) -> Cost {
        -self.transit_factor(pattern) * board_time
    }

    fn wait_cost(&self, wait_time: Seconds) -> Cost {
        self.wait_factor * wait_time
    }

    fn egress_cost(&self, egress: &AccessEgress) -> Cost {
        if egress.has_rides() {
            egress.c1 + self.board_cost + self.transfer_cost
        } else {
            egress.c1
        }
    }
}

/// Read-only schedule access. Implementations are shared between concurrently running searches.
pub trait TransitDataProvider: Sync {
    fn num_stops(&self) -> usize;

    fn num_patterns(&self) -> usize;

    fn patterns_for_stop(&self, stop: StopIndex) -> &[PatternIndex];

    fn pattern_stops(&self, pattern: PatternIndex) -> &[StopIndex];

    /// Trips of a pattern are ordered by departure and never overtake each other.
    fn num_trips(&self, pattern: PatternIndex) -> usize;

    fn trip_times(&self, pattern: PatternIndex, trip: TripIndex) -> &[StopTime];

    fn slack_index(&self, pattern: PatternIndex) -> usize;

    /// Mode and line, e.g. "BUS L11".
    fn pattern_label(&self, pattern: PatternIndex) -> &str;

    fn boarding_possible_at(&self, _pattern: PatternIndex, _stop_pos: usize) -> bool {
        true
    }

    fn alighting_possible_at(&self, _pattern: PatternIndex, _stop_pos: usize) -> bool {
        true
    }

    /// Transit group of the pattern in 0..32, used for transit group priority.
    fn transit_group(&self, _pattern: PatternIndex) -> u32 {
        0
    }

    fn transfers_from_stop(&self, stop: StopIndex) -> &[Transfer];

    fn transfers_to_stop(&self, stop: StopIndex) -> &[Transfer];

    fn slack_provider(&self) -> &dyn SlackProvider;

    fn cost_calculator(&self) -> Option<&dyn CostCalculator>;

    fn stop_name(&self, stop: StopIndex) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_units() {
        assert_eq!(to_raptor_cost(1.0), 100);
        assert_eq!(to_raptor_cost(0.8), 80);
        assert_eq!(Transfer::walk(3, 225).c1, 45_000);
    }

    #[test]
    fn boarding_cost_adds_transfer_cost_after_first_ride() {
        let calculator = DefaultCostCalculator::new(60, 120, 0.8, 1.0);
        assert_eq!(calculator.boarding_cost(true, 45, 0), 45 * 80 + 6_000);
        assert_eq!(calculator.boarding_cost(false, 45, 0), 45 * 80 + 18_000);
    }

    #[test]
    fn transit_cost_uses_pattern_reluctance_and_stop_costs() {
        let calculator = DefaultCostCalculator::new(60, 120, 0.8, 1.0)
            .with_transit_reluctance(1, 1.5)
            .with_stop_costs(vec![0, 0, 500]);
        assert_eq!(calculator.transit_arrival_cost(6_000, 15, 600, 0, 1), 6_000 + 60_000 + 1_200);
        assert_eq!(calculator.transit_arrival_cost(6_000, 15, 600, 1, 2), 6_000 + 90_000 + 1_200 + 500);
    }

    #[test]
    fn wait_cost_is_additive() {
        let calculator = DefaultCostCalculator::default();
        assert_eq!(calculator.wait_cost(45) + calculator.wait_cost(15), calculator.wait_cost(60));
    }

    #[test]
    fn pattern_slack_provider_reports_missing_entries() {
        let slack = PatternSlackProvider { transfer_slack: 60, entries: vec![(30, 10)] };
        assert_eq!(slack.board_slack(0), Some(30));
        assert_eq!(slack.alight_slack(0), Some(10));
        assert_eq!(slack.board_slack(1), None);
    }
}
