use crate::access_egress::AccessEgress;
use crate::error::RaptorError;
use crate::request::{RaptorTuningParameters, SearchDirection, SearchParams};
use crate::transit::{PatternIndex, Seconds, SlackProvider, StopTime, Timestamp, TransitDataProvider, TripIndex};

/// Hides the search direction from the worker. "Earlier", "board" and "departure" are all in search
/// direction: in a reverse search time runs backwards, trips are boarded where they physically
/// alight and access legs are the request's egress legs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitCalculator {
    forward: bool,
    iteration_step: Seconds,
    earliest_departure_time: Option<Timestamp>,
    latest_arrival_time: Option<Timestamp>,
    search_window: Seconds,
}

impl TransitCalculator {
    pub fn new(direction: SearchDirection, params: &SearchParams, tuning: &RaptorTuningParameters) -> Self {
        Self {
            forward: direction.is_forward(),
            iteration_step: tuning.iteration_departure_step.max(1),
            earliest_departure_time: params.earliest_departure_time,
            latest_arrival_time: params.latest_arrival_time,
            search_window: params.search_window,
        }
    }

    pub fn search_forward(&self) -> bool {
        self.forward
    }

    pub fn iteration_step(&self) -> Seconds {
        self.iteration_step
    }

    pub fn plus_duration(&self, time: Timestamp, duration: Seconds) -> Timestamp {
        if self.forward { time + duration } else { time - duration }
    }

    pub fn minus_duration(&self, time: Timestamp, duration: Seconds) -> Timestamp {
        if self.forward { time - duration } else { time + duration }
    }

    /// True if `a` is strictly before `b` in search direction.
    pub fn is_before(&self, a: Timestamp, b: Timestamp) -> bool {
        if self.forward { a < b } else { a > b }
    }

    /// Positive if `to` is after `from` in search direction.
    pub fn duration_between(&self, from: Timestamp, to: Timestamp) -> Seconds {
        if self.forward { to - from } else { from - to }
    }

    /// Maps a time to one that increases in search direction.
    pub fn relative_time(&self, time: Timestamp) -> Timestamp {
        if self.forward { time } else { -time }
    }

    /// The iteration times, latest departure first for a forward search and earliest arrival first
    /// for a reverse search. Both bounds are included.
    pub fn iteration_times(&self) -> Vec<Timestamp> {
        let mut times = Vec::new();
        if self.forward {
            let edt = self.earliest_departure_time.unwrap_or_default();
            let mut time = edt + self.search_window - self.iteration_step;
            while time > edt {
                times.push(time);
                time -= self.iteration_step;
            }
            times.push(edt);
        } else {
            let lat = self.latest_arrival_time.unwrap_or_default();
            let mut time = lat - self.search_window + self.iteration_step;
            while time < lat {
                times.push(time);
                time += self.iteration_step;
            }
            times.push(lat);
        }
        times
    }

    pub fn exceeds_time_limit(&self, time: Timestamp) -> bool {
        if self.forward {
            self.latest_arrival_time.is_some_and(|lat| time > lat)
        } else {
            self.earliest_departure_time.is_some_and(|edt| time < edt)
        }
    }

    /// When an access leg leaving at `iteration_time` can actually start, respecting its opening
    /// hours.
    pub fn departure_time(&self, access: &AccessEgress, iteration_time: Timestamp) -> Option<Timestamp> {
        if self.forward {
            access.earliest_departure_time(iteration_time)
        } else {
            access.latest_arrival_time(iteration_time)
        }
    }

    /// Positions along a pattern from `start` in search direction.
    pub fn stop_positions(&self, num_stops: usize, start: usize) -> impl Iterator<Item = usize> {
        let forward = self.forward;
        (start..num_stops)
            .take_while(move |_| forward)
            .chain((0..=start.min(num_stops.saturating_sub(1))).rev().take_while(move |_| !forward))
    }

    /// The time a trip can be boarded at a stop position in search direction.
    pub fn board_time(&self, stop_time: &StopTime) -> Timestamp {
        if self.forward { stop_time.departure_time } else { stop_time.arrival_time }
    }

    pub fn alight_time(&self, stop_time: &StopTime) -> Timestamp {
        if self.forward { stop_time.arrival_time } else { stop_time.departure_time }
    }

    pub fn boarding_possible_at<T: TransitDataProvider + ?Sized>(&self, transit: &T, pattern: PatternIndex, pos: usize) -> bool {
        if self.forward {
            transit.boarding_possible_at(pattern, pos)
        } else {
            transit.alighting_possible_at(pattern, pos)
        }
    }

    pub fn alighting_possible_at<T: TransitDataProvider + ?Sized>(&self, transit: &T, pattern: PatternIndex, pos: usize) -> bool {
        if self.forward {
            transit.alighting_possible_at(pattern, pos)
        } else {
            transit.boarding_possible_at(pattern, pos)
        }
    }

    /// Finds the first trip that can be boarded at `pos` no earlier than `earliest_board_time`, in
    /// search direction. With `window`, only trips boarding before `earliest_board_time + window`
    /// are returned.
    pub fn trip_search<T: TransitDataProvider + ?Sized>(
        &self,
        transit: &T,
        pattern: PatternIndex,
        pos: usize,
        earliest_board_time: Timestamp,
        window: Option<Seconds>,
    ) -> Option<(TripIndex, Timestamp)> {
        let num_trips = transit.num_trips(pattern);
        let board_time = |trip: usize| self.board_time(&transit.trip_times(pattern, trip as TripIndex)[pos]);

        let trip = if self.forward {
            // Trips are sorted, so find the first one departing after the earliest board time.
            let first = partition_point(num_trips, |trip| board_time(trip) < earliest_board_time);
            (first < num_trips).then_some(first)?
        } else {
            let after_last = partition_point(num_trips, |trip| board_time(trip) <= earliest_board_time);
            after_last.checked_sub(1)?
        };

        let time = board_time(trip);
        if let Some(window) = window {
            if !self.is_before(time, self.plus_duration(earliest_board_time, window)) {
                return None;
            }
        }
        Some((trip as TripIndex, time))
    }
}

// The number of leading indexes in 0..n for which `pred` holds, assuming it holds for a prefix.
fn partition_point(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Slack in search direction. A reverse search boards where passengers physically alight, so its
/// board slack is the alight slack and the other way around.
#[derive(Clone, Copy)]
pub struct SearchSlackProvider<'a> {
    slack: &'a dyn SlackProvider,
    forward: bool,
}

impl<'a> SearchSlackProvider<'a> {
    pub fn new(slack: &'a dyn SlackProvider, direction: SearchDirection) -> Self {
        Self { slack, forward: direction.is_forward() }
    }

    pub fn transfer_slack(&self) -> Seconds {
        self.slack.transfer_slack()
    }

    pub fn board_slack(&self, pattern: PatternIndex, slack_index: usize) -> Result<Seconds, RaptorError> {
        let slack = if self.forward {
            self.slack.board_slack(slack_index)
        } else {
            self.slack.alight_slack(slack_index)
        };
        slack.ok_or(RaptorError::MissingSlack { pattern, slack_index })
    }

    pub fn alight_slack(&self, pattern: PatternIndex, slack_index: usize) -> Result<Seconds, RaptorError> {
        let slack = if self.forward {
            self.slack.alight_slack(slack_index)
        } else {
            self.slack.board_slack(slack_index)
        };
        slack.ok_or(RaptorError::MissingSlack { pattern, slack_index })
    }

    /// Board slack for boarding in `round`, with transfer slack added for every boarding after the
    /// first ride.
    pub fn board_slack_in_round(&self, pattern: PatternIndex, slack_index: usize, round: u32) -> Result<Seconds, RaptorError> {
        let board_slack = self.board_slack(pattern, slack_index)?;
        Ok(if round > 1 { board_slack + self.transfer_slack() } else { board_slack })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transit::{DefaultSlackProvider, PatternSlackProvider};

    fn calculator(direction: SearchDirection, window: Seconds) -> TransitCalculator {
        let params = SearchParams {
            earliest_departure_time: Some(600),
            latest_arrival_time: Some(3600),
            search_window: window,
            ..SearchParams::default()
        };
        TransitCalculator::new(direction, &params, &RaptorTuningParameters::default())
    }

    #[test]
    fn forward_iterations_run_from_latest_to_earliest() {
        assert_eq!(calculator(SearchDirection::Forward, 0).iteration_times(), vec![600]);
        assert_eq!(calculator(SearchDirection::Forward, 180).iteration_times(), vec![720, 660, 600]);
    }

    #[test]
    fn reverse_iterations_run_from_earliest_to_latest() {
        assert_eq!(calculator(SearchDirection::Reverse, 180).iteration_times(), vec![3480, 3540, 3600]);
    }

    #[test]
    fn time_arithmetic_follows_direction() {
        let forward = calculator(SearchDirection::Forward, 0);
        let reverse = calculator(SearchDirection::Reverse, 0);
        assert_eq!(forward.plus_duration(100, 10), 110);
        assert_eq!(reverse.plus_duration(100, 10), 90);
        assert!(forward.is_before(1, 2));
        assert!(reverse.is_before(2, 1));
        assert_eq!(reverse.duration_between(100, 90), 10);
        assert!(forward.exceeds_time_limit(3601));
        assert!(!forward.exceeds_time_limit(3600));
        assert!(reverse.exceeds_time_limit(599));
    }

    #[test]
    fn stop_positions_follow_direction() {
        let forward: Vec<_> = calculator(SearchDirection::Forward, 0).stop_positions(4, 1).collect();
        assert_eq!(forward, vec![1, 2, 3]);
        let reverse: Vec<_> = calculator(SearchDirection::Reverse, 0).stop_positions(4, 2).collect();
        assert_eq!(reverse, vec![2, 1, 0]);
    }

    #[test]
    fn slack_swaps_in_reverse() {
        let slack = DefaultSlackProvider::new(60, 45, 15);
        let forward = SearchSlackProvider::new(&slack, SearchDirection::Forward);
        let reverse = SearchSlackProvider::new(&slack, SearchDirection::Reverse);
        assert_eq!(forward.board_slack(0, 0), Ok(45));
        assert_eq!(reverse.board_slack(0, 0), Ok(15));
        assert_eq!(forward.board_slack_in_round(0, 0, 1), Ok(45));
        assert_eq!(forward.board_slack_in_round(0, 0, 2), Ok(105));

        let table = PatternSlackProvider { transfer_slack: 0, entries: vec![] };
        let provider = SearchSlackProvider::new(&table, SearchDirection::Forward);
        assert_eq!(provider.alight_slack(3, 1), Err(RaptorError::MissingSlack { pattern: 3, slack_index: 1 }));
    }
}
