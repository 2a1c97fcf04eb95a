#![allow(dead_code)]

use raptor::transit::DefaultCostCalculator;
use raptor::{AccessEgress, Network, NetworkBuilder, RaptorPath, RaptorRequestBuilder, StopIndex, TransitDataProvider};

pub const A: StopIndex = 0;
pub const B: StopIndex = 1;
pub const C: StopIndex = 2;
pub const D: StopIndex = 3;
pub const E: StopIndex = 4;

fn builder() -> NetworkBuilder {
    let mut builder = NetworkBuilder::new();
    builder.add_stops(&["A", "B", "C", "D", "E"]);
    builder
}

/// One route A-B-C-D with trips leaving A at 0:02 and 0:12.
pub fn line_network() -> Network {
    let mut builder = builder();
    builder.add_route("BUS R1", &["A", "B", "C", "D"], &["0:02 0:10 0:20 0:30", "0:12 0:20 0:30 0:40"]).unwrap();
    builder.slack(60, 0, 0).build()
}

/// The same line, with the default cost calculator.
pub fn costed_line_network() -> Network {
    let mut builder = builder();
    builder.add_route("BUS R1", &["A", "B", "C", "D"], &["0:02 0:10 0:20 0:30", "0:12 0:20 0:30 0:40"]).unwrap();
    builder.slack(60, 0, 0).cost_calculator(DefaultCostCalculator::default()).build()
}

/// A-B on R1, a 3 minute walk from B to C and C-D on R2.
pub fn transfer_network() -> Network {
    let mut builder = builder();
    builder.add_route("BUS R1", &["A", "B"], &["0:05 0:15"]).unwrap();
    builder.add_route("BUS R2", &["C", "D"], &["0:25 0:40"]).unwrap();
    builder.add_transfer("B", "C", "3m").unwrap();
    builder.slack(60, 0, 0).cost_calculator(DefaultCostCalculator::default()).build()
}

/// R1 and R2 both run A-D, R2 a minute slower. R1 is in transit group 1, R2 in group 2.
pub fn grouped_network() -> Network {
    let mut builder = builder();
    let r1 = builder.add_route("BUS R1", &["A", "D"], &["0:05 0:20"]).unwrap();
    let r2 = builder.add_route("BUS R2", &["A", "D"], &["0:05 0:21"]).unwrap();
    builder.set_transit_group(r1, 1);
    builder.set_transit_group(r2, 2);
    builder.slack(60, 0, 0).cost_calculator(DefaultCostCalculator::default()).build()
}

/// R1 runs A-D and R2 runs A-C, both in 15 minutes.
pub fn fork_network() -> Network {
    let mut builder = builder();
    builder.add_route("BUS R1", &["A", "D"], &["0:05 0:20"]).unwrap();
    builder.add_route("BUS R2", &["A", "C"], &["0:05 0:20"]).unwrap();
    builder.slack(60, 0, 0).cost_calculator(DefaultCostCalculator::default()).build()
}

/// R1 runs A-B-C twice, R2 runs C-D twice. E is only reached by walking from B.
pub fn via_network() -> Network {
    let mut builder = builder();
    builder.add_route("BUS R1", &["A", "B", "C"], &["0:05 0:10 0:15", "0:15 0:20 0:25"]).unwrap();
    builder.add_route("BUS R2", &["C", "D"], &["0:20 0:30", "0:30 0:40"]).unwrap();
    builder.add_route("BUS R3", &["E", "D"], &["0:20 0:35"]).unwrap();
    builder.add_transfer("B", "E", "2m").unwrap();
    builder.slack(60, 0, 0).build()
}

/// Walk a minute to A, from D and depart at 0:00.
pub fn request() -> RaptorRequestBuilder {
    RaptorRequestBuilder::new()
        .earliest_departure_time(0)
        .add_access_paths([AccessEgress::walk(A, 60)])
        .add_egress_paths([AccessEgress::walk(D, 60)])
}

pub fn path_str(network: &Network, path: &RaptorPath) -> String {
    path.to_string_with_names(|stop| network.stop_name(stop).to_owned())
}

pub fn detailed_str(network: &Network, path: &RaptorPath) -> String {
    path.to_string_detailed(|stop| network.stop_name(stop).to_owned())
}

pub fn path_strs(network: &Network, paths: &[RaptorPath]) -> Vec<String> {
    paths.iter().map(|path| path_str(network, path)).collect()
}
