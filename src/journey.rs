use std::fmt::Display;

use crate::access_egress::AccessEgress;
use crate::multicriteria::PathCriteria;
use crate::transit::{Cost, PatternIndex, StopIndex, Timestamp, TripIndex};
use crate::utils;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitLeg {
    pub pattern: PatternIndex,
    pub trip: TripIndex,
    pub label: Box<str>,
    pub board_stop: StopIndex,
    pub board_stop_pos: usize,
    pub alight_stop: StopIndex,
    pub alight_stop_pos: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathLegKind {
    Access(AccessEgress),
    Transit(TransitLeg),
    Transfer { from_stop: StopIndex, to_stop: StopIndex },
    Egress(AccessEgress),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathLeg {
    pub from_time: Timestamp,
    pub to_time: Timestamp,
    pub c1: Cost,
    pub kind: PathLegKind,
}

impl PathLeg {
    pub fn duration(&self) -> i32 {
        self.to_time - self.from_time
    }

    pub fn from_stop(&self) -> Option<StopIndex> {
        match &self.kind {
            PathLegKind::Access(_) => None,
            PathLegKind::Transit(leg) => Some(leg.board_stop),
            PathLegKind::Transfer { from_stop, .. } => Some(*from_stop),
            PathLegKind::Egress(egress) => Some(egress.stop),
        }
    }

    pub fn to_stop(&self) -> Option<StopIndex> {
        match &self.kind {
            PathLegKind::Access(access) => Some(access.stop),
            PathLegKind::Transit(leg) => Some(leg.alight_stop),
            PathLegKind::Transfer { to_stop, .. } => Some(*to_stop),
            PathLegKind::Egress(_) => None,
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(self.kind, PathLegKind::Transit(_))
    }

    fn summary(&self, detailed: bool) -> String {
        let mut out = match &self.kind {
            PathLegKind::Access(leg) | PathLegKind::Egress(leg) => leg.to_string(),
            PathLegKind::Transfer { .. } => format!("Walk {}", utils::get_duration_str(self.duration())),
            PathLegKind::Transit(leg) => {
                let mut out =
                    format!("{} {} {}", leg.label, utils::get_time_str(self.from_time), utils::get_time_str(self.to_time));
                if detailed {
                    out.push(' ');
                    out.push_str(&utils::get_duration_str(self.duration()));
                }
                out
            }
        };
        if detailed {
            if !self.is_transit() {
                out.push_str(&format!(" {} {}", utils::get_time_str(self.from_time), utils::get_time_str(self.to_time)));
            }
            out.push_str(" C₁");
            out.push_str(&utils::get_cost_str(self.c1));
        }
        out
    }
}

/// A journey found by the search, with legs in chronological order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaptorPath {
    iteration_departure_time: Timestamp,
    start_time: Timestamp,
    end_time: Timestamp,
    number_of_transfers: u32,
    c1: Cost,
    c2: Option<Cost>,
    legs: Vec<PathLeg>,
}

impl RaptorPath {
    pub(crate) fn new(iteration_departure_time: Timestamp, c1: Cost, c2: Option<Cost>, legs: Vec<PathLeg>) -> Self {
        let start_time = legs.first().map(|leg| leg.from_time).unwrap_or(iteration_departure_time);
        let end_time = legs.last().map(|leg| leg.to_time).unwrap_or(iteration_departure_time);
        let rides: u32 = legs
            .iter()
            .map(|leg| match &leg.kind {
                PathLegKind::Access(street) | PathLegKind::Egress(street) => street.rides,
                PathLegKind::Transit(_) => 1,
                PathLegKind::Transfer { .. } => 0,
            })
            .sum();
        Self {
            iteration_departure_time,
            start_time,
            end_time,
            number_of_transfers: rides.saturating_sub(1),
            c1,
            c2,
            legs,
        }
    }

    pub fn legs(&self) -> &[PathLeg] {
        &self.legs
    }

    pub fn transit_legs(&self) -> impl Iterator<Item = &TransitLeg> {
        self.legs.iter().filter_map(|leg| match &leg.kind {
            PathLegKind::Transit(transit) => Some(transit),
            _ => None,
        })
    }

    pub fn access_leg(&self) -> Option<&PathLeg> {
        self.legs.first()
    }

    pub fn egress_leg(&self) -> Option<&PathLeg> {
        self.legs.last()
    }

    pub fn duration(&self) -> i32 {
        self.end_time - self.start_time
    }

    pub fn c2_value(&self) -> Option<Cost> {
        self.c2
    }

    /// The path with stop names, leg times, waits and per-leg costs.
    pub fn to_string_detailed(&self, stop_name: impl Fn(StopIndex) -> String) -> String {
        self.format(&stop_name, true)
    }

    pub fn to_string_with_names(&self, stop_name: impl Fn(StopIndex) -> String) -> String {
        self.format(&stop_name, false)
    }

    fn format(&self, stop_name: &dyn Fn(StopIndex) -> String, detailed: bool) -> String {
        let mut out = String::new();
        for (i, leg) in self.legs.iter().enumerate() {
            out.push_str(&leg.summary(detailed));
            let (Some(next), Some(stop)) = (self.legs.get(i + 1), leg.to_stop()) else {
                continue;
            };
            out.push_str(" ~ ");
            out.push_str(&stop_name(stop));
            let wait = next.from_time - leg.to_time;
            if detailed && wait != 0 {
                out.push(' ');
                out.push_str(&utils::get_duration_str(wait));
            }
            out.push_str(" ~ ");
        }
        out.push_str(&format!(
            " [{} {} {} Tₓ{} C₁{}",
            utils::get_time_str(self.start_time),
            utils::get_time_str(self.end_time),
            utils::get_duration_str(self.duration()),
            self.number_of_transfers,
            utils::get_cost_str(self.c1),
        ));
        if let Some(c2) = self.c2 {
            out.push_str(&format!(" C₂{c2}"));
        }
        out.push(']');
        out
    }
}

impl PathCriteria for RaptorPath {
    fn iteration_departure_time(&self) -> Timestamp {
        self.iteration_departure_time
    }

    fn start_time(&self) -> Timestamp {
        self.start_time
    }

    fn end_time(&self) -> Timestamp {
        self.end_time
    }

    fn number_of_transfers(&self) -> u32 {
        self.number_of_transfers
    }

    fn c1(&self) -> Cost {
        self.c1
    }

    fn c2(&self) -> Cost {
        self.c2.unwrap_or(0)
    }
}

impl Display for RaptorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_with_names(|stop| stop.to_string()))
    }
}
