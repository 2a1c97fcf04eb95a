use crate::access_egress::AccessEgress;
use crate::context::SearchContext;
use crate::error::RaptorError;
use crate::journey::{PathLeg, PathLegKind, RaptorPath, TransitLeg};
use crate::state::{ArrivalArena, ArrivalId, ArrivalKind, DestinationArrival};
use crate::transit::{Cost, CostCalculator, PatternIndex, Seconds, SlackProvider, StopIndex, Timestamp, TransitDataProvider, TripIndex};

/// A leg between access and egress, in physical direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    Transit {
        pattern: PatternIndex,
        trip: TripIndex,
        board_pos: usize,
        alight_pos: usize,
        board_stop: StopIndex,
        alight_stop: StopIndex,
        board_time: Timestamp,
        alight_time: Timestamp,
    },
    Transfer { from_stop: StopIndex, to_stop: StopIndex, duration: Seconds, c1: Cost },
    // Minimum dwell at a via location.
    ViaWait { wait: Seconds },
}

struct PathSkeleton {
    access: AccessEgress,
    // Access times found by the search, used when there is no ride to align the access with.
    access_arrival: Timestamp,
    segments: Vec<Segment>,
    egress: AccessEgress,
}

/// Turns destination arrivals into paths. Both directions produce legs in chronological order.
pub(crate) struct PathMapper<'c, T: TransitDataProvider + ?Sized> {
    builder: PathBuilder<'c, T>,
    forward: bool,
    include_c2: bool,
}

impl<'c, T: TransitDataProvider + ?Sized> PathMapper<'c, T> {
    pub fn new(ctx: &'c SearchContext<'_, T>) -> Self {
        let transit = ctx.transit();
        Self {
            builder: PathBuilder {
                transit,
                slack: transit.slack_provider(),
                cost_calculator: ctx.cost_calculator(),
            },
            forward: ctx.calculator().search_forward(),
            include_c2: ctx.c2_source().is_active(),
        }
    }

    pub fn map(&self, arena: &ArrivalArena, destination: &DestinationArrival) -> Result<RaptorPath, RaptorError> {
        let skeleton = if self.forward {
            self.forward_skeleton(arena, destination)?
        } else {
            self.reverse_skeleton(arena, destination)?
        };
        let (legs, leg_c1) = self.builder.build(&skeleton)?;

        let c1 = if self.forward && self.builder.cost_calculator.is_some() {
            if leg_c1 != destination.c1 {
                log::error!(
                    "Path cost {} differs from search cost {} for arrival at {} in iteration {}.",
                    leg_c1,
                    destination.c1,
                    destination.arrival_time,
                    destination.iteration_time,
                );
            }
            destination.c1
        } else {
            leg_c1
        };
        Ok(RaptorPath::new(destination.iteration_time, c1, self.include_c2.then_some(destination.c2), legs))
    }

    // The chain runs from the egress stop back to the access, so it is collected and reversed.
    fn forward_skeleton(&self, arena: &ArrivalArena, destination: &DestinationArrival) -> Result<PathSkeleton, RaptorError> {
        let transit = self.builder.transit;
        let mut segments = Vec::new();
        let mut id = destination.previous;
        loop {
            let arrival = arena.get(id);
            match arrival.kind {
                ArrivalKind::Access(access) => {
                    segments.reverse();
                    return Ok(PathSkeleton {
                        access,
                        access_arrival: arrival.time,
                        segments,
                        egress: destination.egress,
                    });
                }
                ArrivalKind::Transit(ride) => segments.push(Segment::Transit {
                    pattern: ride.pattern,
                    trip: ride.trip,
                    board_pos: ride.board_pos,
                    alight_pos: ride.alight_pos,
                    board_stop: transit.pattern_stops(ride.pattern)[ride.board_pos],
                    alight_stop: arrival.stop,
                    board_time: ride.board_time,
                    alight_time: ride.alight_time,
                }),
                ArrivalKind::Transfer(transfer) => {
                    let from = arena.get(previous(arrival.previous, id)?);
                    segments.push(Segment::Transfer {
                        from_stop: from.stop,
                        to_stop: arrival.stop,
                        duration: transfer.duration,
                        c1: transfer.c1,
                    });
                }
                ArrivalKind::Via { connection, min_wait, .. } => {
                    if !connection.is_same_stop() {
                        segments.push(Segment::Transfer {
                            from_stop: connection.from_stop,
                            to_stop: connection.to_stop,
                            duration: connection.duration,
                            c1: connection.c1,
                        });
                    }
                    if min_wait > 0 {
                        segments.push(Segment::ViaWait { wait: min_wait });
                    }
                }
            }
            id = previous(arrival.previous, id)?;
        }
    }

    // A reverse search starts at the destination, so its chain is already in physical order. Rides
    // are boarded where they physically alight and via connections are flipped.
    fn reverse_skeleton(&self, arena: &ArrivalArena, destination: &DestinationArrival) -> Result<PathSkeleton, RaptorError> {
        let transit = self.builder.transit;
        let mut segments = Vec::new();
        let mut id = destination.previous;
        loop {
            let arrival = arena.get(id);
            match arrival.kind {
                ArrivalKind::Access(egress) => {
                    return Ok(PathSkeleton {
                        access: destination.egress,
                        access_arrival: destination.departure_time,
                        segments,
                        egress,
                    });
                }
                ArrivalKind::Transit(ride) => segments.push(Segment::Transit {
                    pattern: ride.pattern,
                    trip: ride.trip,
                    board_pos: ride.alight_pos,
                    alight_pos: ride.board_pos,
                    board_stop: arrival.stop,
                    alight_stop: transit.pattern_stops(ride.pattern)[ride.board_pos],
                    board_time: ride.alight_time,
                    alight_time: ride.board_time,
                }),
                ArrivalKind::Transfer(transfer) => {
                    let to = arena.get(previous(arrival.previous, id)?);
                    segments.push(Segment::Transfer {
                        from_stop: arrival.stop,
                        to_stop: to.stop,
                        duration: transfer.duration,
                        c1: transfer.c1,
                    });
                }
                ArrivalKind::Via { connection, min_wait, .. } => {
                    if min_wait > 0 {
                        segments.push(Segment::ViaWait { wait: min_wait });
                    }
                    if !connection.is_same_stop() {
                        segments.push(Segment::Transfer {
                            from_stop: connection.to_stop,
                            to_stop: connection.from_stop,
                            duration: connection.duration,
                            c1: connection.c1,
                        });
                    }
                }
            }
            id = previous(arrival.previous, id)?;
        }
    }
}

fn previous(previous: Option<ArrivalId>, id: ArrivalId) -> Result<ArrivalId, RaptorError> {
    previous.ok_or(RaptorError::BrokenArrivalChain(id.0))
}

/// Places the legs of a path in time and computes their cost, in physical direction.
pub(crate) struct PathBuilder<'c, T: TransitDataProvider + ?Sized> {
    transit: &'c T,
    slack: &'c dyn SlackProvider,
    cost_calculator: Option<&'c dyn CostCalculator>,
}

impl<T: TransitDataProvider + ?Sized> PathBuilder<'_, T> {
    fn board_slack(&self, pattern: PatternIndex) -> Result<Seconds, RaptorError> {
        let slack_index = self.transit.slack_index(pattern);
        self.slack.board_slack(slack_index).ok_or(RaptorError::MissingSlack { pattern, slack_index })
    }

    fn alight_slack(&self, pattern: PatternIndex) -> Result<Seconds, RaptorError> {
        let slack_index = self.transit.slack_index(pattern);
        self.slack.alight_slack(slack_index).ok_or(RaptorError::MissingSlack { pattern, slack_index })
    }

    // The access leg leaves as late as possible while still catching the first ride.
    fn access_arrival_time(&self, skeleton: &PathSkeleton) -> Result<Timestamp, RaptorError> {
        let Some(first_ride) = skeleton.segments.iter().position(|s| matches!(s, Segment::Transit { .. })) else {
            return Ok(skeleton.access_arrival);
        };
        let Segment::Transit { pattern, board_time, .. } = skeleton.segments[first_ride] else {
            return Ok(skeleton.access_arrival);
        };
        let mut latest = board_time - self.board_slack(pattern)?;
        if skeleton.access.has_rides() {
            latest -= self.slack.transfer_slack();
        }
        for segment in &skeleton.segments[..first_ride] {
            match segment {
                Segment::Transfer { duration, .. } => latest -= duration,
                Segment::ViaWait { wait } => latest -= wait,
                Segment::Transit { .. } => {}
            }
        }
        Ok(skeleton.access.latest_arrival_time(latest).unwrap_or(skeleton.access_arrival))
    }

    fn build(&self, skeleton: &PathSkeleton) -> Result<(Vec<PathLeg>, Cost), RaptorError> {
        let cost = self.cost_calculator;
        let mut legs = Vec::with_capacity(skeleton.segments.len() + 2);
        let mut total: Cost = 0;

        let access = skeleton.access;
        let access_arrival = self.access_arrival_time(skeleton)?;
        let c1 = if cost.is_some() { access.c1 } else { 0 };
        total += c1;
        legs.push(PathLeg {
            from_time: access_arrival - access.duration,
            to_time: access_arrival,
            c1,
            kind: PathLegKind::Access(access),
        });

        // `time` is when the traveller is ready to leave the current stop, `stop_arrival` is the
        // arrival time waits are measured from.
        let mut time = access_arrival;
        let mut stop_arrival = access_arrival;
        let mut rides = access.rides;
        for segment in &skeleton.segments {
            match *segment {
                Segment::Transit { pattern, trip, board_pos, alight_pos, board_stop, alight_stop, board_time, alight_time } => {
                    let alight_slack = self.alight_slack(pattern)?;
                    let c1 = cost.map_or(0, |cost| {
                        let board_cost = cost.boarding_cost(rides == 0, board_time - stop_arrival, board_stop);
                        cost.transit_arrival_cost(board_cost, alight_slack, alight_time - board_time, pattern, alight_stop)
                    });
                    total += c1;
                    legs.push(PathLeg {
                        from_time: board_time,
                        to_time: alight_time,
                        c1,
                        kind: PathLegKind::Transit(TransitLeg {
                            pattern,
                            trip,
                            label: self.transit.pattern_label(pattern).into(),
                            board_stop,
                            board_stop_pos: board_pos,
                            alight_stop,
                            alight_stop_pos: alight_pos,
                        }),
                    });
                    time = alight_time + alight_slack;
                    stop_arrival = time;
                    rides += 1;
                }
                Segment::Transfer { from_stop, to_stop, duration, c1 } => {
                    let c1 = if cost.is_some() { c1 } else { 0 };
                    total += c1;
                    legs.push(PathLeg {
                        from_time: time,
                        to_time: time + duration,
                        c1,
                        kind: PathLegKind::Transfer { from_stop, to_stop },
                    });
                    time += duration;
                    stop_arrival = time;
                }
                Segment::ViaWait { wait } => {
                    time += wait;
                    stop_arrival = time;
                }
            }
        }

        let egress = skeleton.egress;
        let ready = if egress.has_rides() { time + self.slack.transfer_slack() } else { time };
        let departure = egress.earliest_departure_time(ready).unwrap_or(ready);
        let c1 = cost.map_or(0, |cost| cost.wait_cost(departure - stop_arrival) + cost.egress_cost(&egress));
        total += c1;
        legs.push(PathLeg {
            from_time: departure,
            to_time: departure + egress.duration,
            c1,
            kind: PathLegKind::Egress(egress),
        });
        Ok((legs, total))
    }
}
