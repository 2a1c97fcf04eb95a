use crate::transit::{PatternIndex, StopIndex};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RaptorError {
    #[error("A forward search requires an earliest departure time.")]
    MissingEarliestDepartureTime,
    #[error("A reverse search requires a latest arrival time.")]
    MissingLatestArrivalTime,
    #[error("The search window must not be negative, was {0}s.")]
    InvalidSearchWindow(i32),
    #[error("No access paths given.")]
    NoAccessPaths,
    #[error("No egress paths given.")]
    NoEgressPaths,
    #[error("Access or egress leg to stop {stop} is invalid (the network has {num_stops} stops).")]
    InvalidAccessEgress { stop: StopIndex, num_stops: usize },
    #[error("Stop {stop} is out of range (the network has {num_stops} stops).")]
    StopOutOfRange { stop: StopIndex, num_stops: usize },
    #[error("Relax function needs a ratio in [1.0, 4.0] and a non-negative slack, was {ratio} and {slack}.")]
    InvalidRelaxFunction { ratio: f64, slack: i32 },
    #[error("Via location '{0}' has no connections.")]
    EmptyViaLocation(String),
    #[error("Expected {expected} via connection sets, but got {actual}.")]
    ViaConnectionCountMismatch { expected: usize, actual: usize },
    #[error("Pass-through points can not be combined with via locations.")]
    PassThroughAndViaConflict,
    #[error("A pass-through search needs at least one pass-through point.")]
    EmptyPassThroughPoints,
    #[error("Pass-through point '{0}' has no stops.")]
    EmptyPassThroughPoint(String),
    #[error("Pass-through and transit group priority both need c2 and can not be combined.")]
    ConflictingC2Criteria,
    #[error("Pass-through and transit group priority require the multi-criteria profile.")]
    MultiCriteriaRequired,
    #[error("The life-cycle publisher has already been created.")]
    LifeCyclePublisherAlreadyCreated,
    #[error("Pattern {pattern} has no slack for slack index {slack_index}.")]
    MissingSlack { pattern: PatternIndex, slack_index: usize },
    #[error("Stop arrival {0} does not lead back to an access leg.")]
    BrokenArrivalChain(u32),
    #[error("The search was cancelled.")]
    SearchCancelled,
    #[error("The search timed out.")]
    SearchTimedOut,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid time: '{0}'.")]
    InvalidTime(String),
    #[error("Invalid duration: '{0}'.")]
    InvalidDuration(String),
    #[error("Unknown stop '{0}'.")]
    UnknownStop(String),
    #[error("Route {0} needs at least two stops.")]
    RouteTooShort(String),
    #[error("Trip on route {route} has {actual} stop times, expected {expected}.")]
    TripLengthMismatch { route: String, expected: usize, actual: usize },
    #[error("Trip on route {route} goes back in time at stop position {stop_pos}.")]
    DecreasingTimes { route: String, stop_pos: usize },
    #[error("Trips on route {0} overtake each other.")]
    OvertakingTrips(String),
}
