use std::time::Instant;

use crate::access_egress::EgressPaths;
use crate::context::{C2Source, SearchContext};
use crate::error::RaptorError;
use crate::journey::RaptorPath;
use crate::lifecycle::LifeCycleEventPublisher;
use crate::multicriteria::{PathCriteria, PathParetoComparator, PatternRide, PatternRideComparator};
use crate::pareto::ParetoSet;
use crate::path_mapper::PathMapper;
use crate::request::{RaptorRequest, RaptorTuningParameters};
use crate::state::{ArrivalArena, ArrivalId, ArrivalKind, DestinationArrival, LegState, StopArrival, StopArrivals, TransitRide};
use crate::transit::{PatternIndex, Seconds, StopIndex, Timestamp, TransitDataProvider};
use crate::utils;

/// The result of a search.
#[derive(Clone, Debug, Default)]
pub struct RaptorResponse {
    paths: Vec<RaptorPath>,
    stop_arrivals: StopArrivals,
    iterations: usize,
}

impl RaptorResponse {
    /// Sorted by arrival time, then number of transfers, then cost.
    pub fn paths(&self) -> &[RaptorPath] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<RaptorPath> {
        self.paths
    }

    pub fn stop_arrivals(&self) -> &StopArrivals {
        &self.stop_arrivals
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

struct Destination {
    paths: ParetoSet<RaptorPath, PathParetoComparator>,
    best_time: Option<Timestamp>,
    reached_in_round: bool,
}

/// Runs the rounds of every iteration of one search. Created from a context and the publisher
/// closing its subscriptions, and consumed by `route`.
pub struct RangeRaptorWorker<'c, 'a, T: TransitDataProvider + ?Sized> {
    ctx: &'c SearchContext<'a, T>,
    publisher: LifeCycleEventPublisher<'a>,
    mapper: PathMapper<'c, T>,
    arena: ArrivalArena,
    legs: Vec<LegState>,
    destination: Destination,
    // Boardings on the pattern being scanned.
    rides: ParetoSet<PatternRide, PatternRideComparator>,
    // Stops reached in the previous round, with the arrivals there.
    marked_stops: Vec<bool>,
    marked_stop_list: Vec<StopIndex>,
    prev_by_stop: Vec<Vec<ArrivalId>>,
    // The equivalent of the set Q in the paper: first marked position of every touched pattern.
    first_marked_pos: Vec<Option<usize>>,
    touched_patterns: Vec<PatternIndex>,
    iteration_time: Timestamp,
    first_iteration: bool,
    started: Instant,
}

impl<'c, 'a, T: TransitDataProvider + ?Sized> RangeRaptorWorker<'c, 'a, T> {
    pub fn new(ctx: &'c SearchContext<'a, T>, publisher: LifeCycleEventPublisher<'a>) -> Self {
        let transit = ctx.transit();
        let num_stops = transit.num_stops();
        let legs = ctx
            .legs()
            .iter()
            .map(|_| LegState::new(num_stops, ctx.stop_arrival_comparator(), ctx.round_tracker()))
            .collect();
        Self {
            ctx,
            publisher,
            mapper: PathMapper::new(ctx),
            arena: ArrivalArena::default(),
            legs,
            destination: Destination {
                paths: ParetoSet::new(ctx.path_comparator()),
                best_time: None,
                reached_in_round: false,
            },
            rides: ParetoSet::new(ctx.pattern_ride_comparator()),
            marked_stops: vec![false; num_stops],
            marked_stop_list: Vec::new(),
            prev_by_stop: vec![Vec::new(); num_stops],
            first_marked_pos: vec![None; transit.num_patterns()],
            touched_patterns: Vec::new(),
            iteration_time: 0,
            first_iteration: true,
            started: Instant::now(),
        }
    }

    pub fn route(mut self) -> Result<RaptorResponse, RaptorError> {
        let ctx = self.ctx;
        let calculator = *ctx.calculator();
        log::info!(
            "Range raptor {:?} search, {}, {} via legs.",
            ctx.profile(),
            if calculator.search_forward() { "forward" } else { "reverse" },
            ctx.legs().len(),
        );
        self.started = Instant::now();
        self.publisher.route_search(calculator.search_forward());

        let iteration_times = calculator.iteration_times();
        for (i, &iteration_time) in iteration_times.iter().enumerate() {
            self.first_iteration = i == 0;
            self.run_iteration(iteration_time)?;
        }

        let response = self.into_response(iteration_times.len());
        log::info!(
            "Found {} paths in {} iterations, {} stops reached.",
            response.paths.len(),
            response.iterations,
            (0..ctx.transit().num_stops() as StopIndex).filter(|&s| response.stop_arrivals.reached(s)).count(),
        );
        Ok(response)
    }

    fn run_iteration(&mut self, iteration_time: Timestamp) -> Result<(), RaptorError> {
        log::debug!("Iteration {}, {} arrivals so far.", utils::get_time_str(iteration_time), self.arena.len());
        self.check_cancellation()?;
        self.iteration_time = iteration_time;
        self.publisher.setup_iteration(iteration_time);
        for leg in 0..self.legs.len() {
            self.run_leg(leg)?;
            self.hand_over_to_next_leg(leg);
        }
        self.publisher.iteration_complete();
        Ok(())
    }

    fn run_leg(&mut self, leg: usize) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        self.legs[leg].setup_iteration();
        let seeds = self.legs[leg].take_seeds();
        let last_injected_round = seeds
            .iter()
            .map(|seed| seed.round)
            .max()
            .unwrap_or(0)
            .max(ctx.legs()[leg].access().max_number_of_rides());

        // Round 0 only has access legs and seeds.
        self.add_access(leg, 0, false)?;
        self.add_seeds(leg, &seeds, 0, None)?;
        let reached = std::mem::take(&mut self.destination.reached_in_round);
        self.legs[leg].round_tracker.round_complete(reached);

        loop {
            let state = &mut self.legs[leg];
            let has_arrivals = state.prepare_for_next_round(&self.arena);
            if !state.round_tracker.has_more_rounds() || (!has_arrivals && state.round_tracker.round() >= last_injected_round) {
                break;
            }
            self.check_cancellation()?;
            let round = self.legs[leg].round_tracker.next_round();
            log::trace!("Leg {leg} round {round}, boarding from {} arrivals.", self.legs[leg].previous_round().len());
            self.publisher.prepare_for_next_round(round);

            self.transit_for_round(leg, round)?;
            self.add_access(leg, round, true)?;
            self.add_seeds(leg, &seeds, round, Some(true))?;
            self.publisher.transits_for_round_complete();

            self.transfers_for_round(leg)?;
            self.publisher.transfers_for_round_complete();

            self.add_access(leg, round, false)?;
            self.add_seeds(leg, &seeds, round, Some(false))?;

            let reached = std::mem::take(&mut self.destination.reached_in_round);
            self.legs[leg].round_tracker.round_complete(reached);
            self.publisher.round_complete(reached);
        }
        Ok(())
    }

    fn check_cancellation(&self) -> Result<(), RaptorError> {
        if self.ctx.request().is_cancelled() {
            log::debug!("Search cancelled after {:?}.", self.started.elapsed());
            return Err(RaptorError::SearchCancelled);
        }
        if let Some(timeout) = self.ctx.tuning().search_timeout {
            if self.started.elapsed() >= timeout {
                log::debug!("Search timed out after {timeout:?}.");
                return Err(RaptorError::SearchTimedOut);
            }
        }
        Ok(())
    }

    fn add_access(&mut self, leg: usize, round: u32, on_board: bool) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let calculator = *ctx.calculator();
        let access = ctx.legs()[leg].access();
        let paths = if on_board {
            access.arrived_on_board_by_rides(round)
        } else {
            access.arrived_on_street_by_rides(round)
        };
        for path in paths {
            let Some(departure) = calculator.departure_time(path, self.iteration_time) else {
                continue;
            };
            let arrival = StopArrival {
                stop: path.stop,
                time: calculator.plus_duration(departure, path.duration),
                round,
                c1: if ctx.cost_calculator().is_some() { path.c1 } else { 0 },
                c2: ctx.c2_source().visit(0, path.stop),
                arrived_on_board: on_board,
                previous: None,
                kind: ArrivalKind::Access(*path),
            };
            self.add_stop_arrival(leg, arrival)?;
        }
        Ok(())
    }

    fn add_seeds(&mut self, leg: usize, seeds: &[StopArrival], round: u32, on_board: Option<bool>) -> Result<(), RaptorError> {
        for seed in seeds {
            if seed.round == round && on_board.map_or(true, |on_board| seed.arrived_on_board == on_board) {
                self.add_stop_arrival(leg, *seed)?;
            }
        }
        Ok(())
    }

    fn transit_for_round(&mut self, leg: usize, round: u32) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let transit = ctx.transit();
        let calculator = *ctx.calculator();
        debug_assert!(utils::is_zero(&self.marked_stops));

        let Self { legs, arena, marked_stops, marked_stop_list, prev_by_stop, .. } = self;
        for &id in legs[leg].previous_round() {
            let stop = arena.get(id).stop;
            if !marked_stops[stop as usize] {
                marked_stops[stop as usize] = true;
                marked_stop_list.push(stop);
            }
            prev_by_stop[stop as usize].push(id);
        }

        for &stop in &self.marked_stop_list {
            for &pattern in transit.patterns_for_stop(stop) {
                if self.first_marked_pos[pattern as usize].is_some() {
                    continue;
                }
                let stops = transit.pattern_stops(pattern);
                let from = if calculator.search_forward() { 0 } else { stops.len().saturating_sub(1) };
                let first = calculator
                    .stop_positions(stops.len(), from)
                    .find(|&pos| self.marked_stops[stops[pos] as usize]);
                self.first_marked_pos[pattern as usize] = first;
                self.touched_patterns.push(pattern);
            }
        }

        let mut result = Ok(());
        for i in 0..self.touched_patterns.len() {
            let pattern = self.touched_patterns[i];
            if let Some(start) = self.first_marked_pos[pattern as usize] {
                result = self.scan_pattern(leg, round, pattern, start);
                if result.is_err() {
                    break;
                }
            }
        }

        for &stop in &self.marked_stop_list {
            self.marked_stops[stop as usize] = false;
            self.prev_by_stop[stop as usize].clear();
        }
        self.marked_stop_list.clear();
        for &pattern in &self.touched_patterns {
            self.first_marked_pos[pattern as usize] = None;
        }
        self.touched_patterns.clear();
        result
    }

    fn scan_pattern(&mut self, leg: usize, round: u32, pattern: PatternIndex, start: usize) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let transit = ctx.transit();
        let calculator = *ctx.calculator();
        let stops = transit.pattern_stops(pattern);
        let slack_index = transit.slack_index(pattern);
        let board_slack = ctx.slack_provider().board_slack_in_round(pattern, slack_index, round)?;
        let alight_slack = ctx.slack_provider().alight_slack(pattern, slack_index)?;

        self.rides.clear();
        for pos in calculator.stop_positions(stops.len(), start) {
            let stop = stops[pos];
            if !self.rides.is_empty() && calculator.alighting_possible_at(transit, pattern, pos) {
                for i in 0..self.rides.len() {
                    let ride = self.rides.as_slice()[i];
                    self.alight(leg, round, pattern, &ride, pos, alight_slack)?;
                }
            }
            // Board after alighting, so a ride is never alighted where it was boarded.
            if self.marked_stops[stop as usize] && calculator.boarding_possible_at(transit, pattern, pos) {
                for i in 0..self.prev_by_stop[stop as usize].len() {
                    let prev = self.prev_by_stop[stop as usize][i];
                    self.board(round, pattern, pos, prev, board_slack);
                }
            }
        }
        Ok(())
    }

    fn board(&mut self, round: u32, pattern: PatternIndex, pos: usize, prev_id: ArrivalId, board_slack: Seconds) {
        let ctx = self.ctx;
        let transit = ctx.transit();
        let calculator = *ctx.calculator();
        let prev = *self.arena.get(prev_id);

        let earliest_board_time = calculator.plus_duration(prev.time, board_slack);
        // Later iterations only look one step ahead in the first round, so every trip belongs to
        // the latest iteration that can catch it.
        let window = (round == 1 && !self.first_iteration && !ctx.has_time_dependent_access())
            .then(|| calculator.iteration_step());
        let Some((trip, board_time)) = calculator.trip_search(transit, pattern, pos, earliest_board_time, window) else {
            return;
        };

        if let ArrivalKind::Via { min_wait, max_wait: Some(max_wait), .. } = prev.kind {
            let latest_board_time = calculator.plus_duration(prev.time, max_wait - min_wait + board_slack);
            if calculator.is_before(latest_board_time, board_time) {
                return;
            }
        }

        let (board_cost, relative_c1) = match ctx.cost_calculator() {
            Some(cost) => {
                let prev_time = if calculator.search_forward() {
                    self.arena.time_shifted_arrival_time(prev_id, calculator.minus_duration(board_time, board_slack))
                } else {
                    prev.time
                };
                let wait = calculator.duration_between(prev_time, board_time);
                let board_cost = cost.boarding_cost(prev.round == 0, wait, prev.stop);
                let relative = cost.on_trip_relative_riding_cost(calculator.relative_time(board_time), pattern);
                (board_cost, prev.c1 + board_cost + relative)
            }
            None => (0, 0),
        };

        self.rides.add(PatternRide {
            prev_arrival: prev_id.0,
            trip,
            board_pos: pos,
            board_time,
            board_cost,
            relative_c1,
            c2: ctx.c2_source().board(prev.c2, transit, pattern),
        });
    }

    fn alight(
        &mut self,
        leg: usize,
        round: u32,
        pattern: PatternIndex,
        ride: &PatternRide,
        pos: usize,
        alight_slack: Seconds,
    ) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let transit = ctx.transit();
        let calculator = *ctx.calculator();
        let stops = transit.pattern_stops(pattern);
        let stop = stops[pos];
        let previous = ArrivalId(ride.prev_arrival);
        let prev = self.arena.get(previous);

        let alight_time = calculator.alight_time(&transit.trip_times(pattern, ride.trip)[pos]);
        let c1 = ctx.cost_calculator().map_or(0, |cost| {
            let transit_time = calculator.duration_between(ride.board_time, alight_time);
            prev.c1 + cost.transit_arrival_cost(ride.board_cost, alight_slack, transit_time, pattern, stop)
        });

        let mut c2 = ride.c2;
        let source = ctx.c2_source();
        if matches!(source, C2Source::PassThrough(_)) {
            // Stops passed on board count as visited, in search order.
            if calculator.search_forward() {
                for &passed in &stops[ride.board_pos + 1..=pos] {
                    c2 = source.visit(c2, passed);
                }
            } else {
                for &passed in stops[pos..ride.board_pos].iter().rev() {
                    c2 = source.visit(c2, passed);
                }
            }
        }

        let arrival = StopArrival {
            stop,
            time: calculator.plus_duration(alight_time, alight_slack),
            round,
            c1,
            c2,
            arrived_on_board: true,
            previous: Some(previous),
            kind: ArrivalKind::Transit(TransitRide {
                pattern,
                trip: ride.trip,
                board_pos: ride.board_pos,
                alight_pos: pos,
                board_time: ride.board_time,
                alight_time,
            }),
        };
        self.add_stop_arrival(leg, arrival)?;
        Ok(())
    }

    fn transfers_for_round(&mut self, leg: usize) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let transit = ctx.transit();
        let calculator = *ctx.calculator();
        // Transfers added below are not transferred from again.
        let num_arrivals = self.legs[leg].current_round().len();
        for i in 0..num_arrivals {
            let id = self.legs[leg].current_round()[i];
            if !self.arena.is_alive(id) {
                continue;
            }
            let from = *self.arena.get(id);
            if !from.arrived_on_board {
                continue;
            }
            let transfers = if calculator.search_forward() {
                transit.transfers_from_stop(from.stop)
            } else {
                transit.transfers_to_stop(from.stop)
            };
            for transfer in transfers {
                if transfer.stop == from.stop {
                    continue;
                }
                let arrival = StopArrival {
                    stop: transfer.stop,
                    time: calculator.plus_duration(from.time, transfer.duration),
                    round: from.round,
                    c1: if ctx.cost_calculator().is_some() { from.c1 + transfer.c1 } else { 0 },
                    c2: ctx.c2_source().visit(from.c2, transfer.stop),
                    arrived_on_board: false,
                    previous: Some(id),
                    kind: ArrivalKind::Transfer(*transfer),
                };
                self.add_stop_arrival(leg, arrival)?;
            }
        }
        Ok(())
    }

    fn add_stop_arrival(&mut self, leg: usize, arrival: StopArrival) -> Result<Option<ArrivalId>, RaptorError> {
        let ctx = self.ctx;
        if ctx.calculator().exceeds_time_limit(arrival.time) {
            return Ok(None);
        }
        let Some(id) = self.legs[leg].add(&mut self.arena, arrival) else {
            return Ok(None);
        };
        if let Some(egress) = ctx.legs()[leg].egress() {
            self.add_destination_arrivals(egress, id)?;
        }
        Ok(Some(id))
    }

    fn add_destination_arrivals(&mut self, egress_paths: &EgressPaths, id: ArrivalId) -> Result<(), RaptorError> {
        let ctx = self.ctx;
        let calculator = *ctx.calculator();
        let arrival = *self.arena.get(id);
        for egress in egress_paths.egress_at(arrival.stop) {
            // Walking twice in a row is not allowed, but a flex egress can follow anything.
            if !egress.has_rides() && !arrival.arrived_on_board {
                continue;
            }
            let ready = if egress.has_rides() {
                calculator.plus_duration(arrival.time, ctx.slack_provider().transfer_slack())
            } else {
                arrival.time
            };
            let departure = if calculator.search_forward() {
                egress.earliest_departure_time(ready)
            } else {
                egress.latest_arrival_time(ready)
            };
            let Some(departure) = departure else {
                continue;
            };
            let arrival_time = calculator.plus_duration(departure, egress.duration);
            if calculator.exceeds_time_limit(arrival_time) || !ctx.accept_c2_at_destination(arrival.c2) {
                continue;
            }
            let c1 = ctx.cost_calculator().map_or(0, |cost| {
                arrival.c1 + cost.wait_cost(calculator.duration_between(arrival.time, departure)) + cost.egress_cost(egress)
            });
            self.add_destination(DestinationArrival {
                previous: id,
                egress: *egress,
                departure_time: departure,
                arrival_time,
                round: arrival.round + egress.rides,
                c1,
                c2: arrival.c2,
                iteration_time: self.iteration_time,
            })?;
        }
        Ok(())
    }

    fn add_destination(&mut self, arrival: DestinationArrival) -> Result<(), RaptorError> {
        let calculator = self.ctx.calculator();
        let improved = self.destination.best_time.map_or(true, |best| calculator.is_before(arrival.arrival_time, best));
        if improved {
            self.destination.best_time = Some(arrival.arrival_time);
        }
        if !self.ctx.profile().produces_paths() {
            self.destination.reached_in_round |= improved;
            return Ok(());
        }
        let path = self.mapper.map(&self.arena, &arrival)?;
        if self.destination.paths.add(path) {
            self.destination.reached_in_round = true;
        }
        Ok(())
    }

    fn hand_over_to_next_leg(&mut self, leg: usize) {
        let ctx = self.ctx;
        let Some(via) = ctx.legs()[leg].via_connections() else {
            return;
        };
        let calculator = *ctx.calculator();
        let has_cost = ctx.cost_calculator().is_some();
        let (current, next) = self.legs.split_at_mut(leg + 1);
        let Some(next) = next.first_mut() else {
            return;
        };

        let mut seeds = 0;
        for &id in current[leg].iteration_arrivals() {
            if !self.arena.is_alive(id) {
                continue;
            }
            let arrival = self.arena.get(id);
            for connection in via.from_stop(arrival.stop) {
                if !connection.is_same_stop() && !arrival.arrived_on_board {
                    continue;
                }
                let time = calculator.plus_duration(arrival.time, via.min_wait + connection.duration);
                if calculator.exceeds_time_limit(time) {
                    continue;
                }
                next.add_seed(StopArrival {
                    stop: connection.to_stop,
                    time,
                    round: arrival.round,
                    c1: if has_cost { arrival.c1 + connection.c1 } else { 0 },
                    c2: arrival.c2,
                    arrived_on_board: connection.is_same_stop() && arrival.arrived_on_board,
                    previous: Some(id),
                    kind: ArrivalKind::Via { connection: *connection, min_wait: via.min_wait, max_wait: via.max_wait },
                });
                seeds += 1;
            }
        }
        log::trace!("Via {}: {seeds} arrivals handed over to leg {}.", via.label, leg + 1);
    }

    fn into_response(self, iterations: usize) -> RaptorResponse {
        let calculator = self.ctx.calculator();
        let stop_arrivals = match self.legs.last() {
            Some(leg) => StopArrivals::from_leg(leg, calculator, self.destination.best_time),
            None => StopArrivals::default(),
        };
        let mut paths = self.destination.paths.into_vec();
        paths.sort_by_key(|path| (path.end_time(), path.number_of_transfers(), path.c1()));
        RaptorResponse { paths, stop_arrivals, iterations }
    }
}

/// Routes requests with shared tuning parameters. Each call builds its own context and worker,
/// so a service can be used from many threads at once.
#[derive(Clone, Debug, Default)]
pub struct RaptorService {
    tuning: RaptorTuningParameters,
}

impl RaptorService {
    pub fn new(tuning: RaptorTuningParameters) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &RaptorTuningParameters {
        &self.tuning
    }

    pub fn route<T: TransitDataProvider + ?Sized>(&self, request: &RaptorRequest, transit: &T) -> Result<RaptorResponse, RaptorError> {
        let mut ctx = SearchContext::of(request, &self.tuning, transit, None).build()?;
        let publisher = ctx.create_life_cycle_publisher()?;
        RangeRaptorWorker::new(&ctx, publisher).route()
    }
}

pub fn raptor_query<T: TransitDataProvider + ?Sized>(request: &RaptorRequest, transit: &T) -> Result<RaptorResponse, RaptorError> {
    RaptorService::default().route(request, transit)
}
