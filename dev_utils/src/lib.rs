use rayon::prelude::*;

use raptor::transit::{DefaultCostCalculator, StopTime};
use raptor::{
    utils, AccessEgress, Network, NetworkBuilder, RaptorError, RaptorProfile, RaptorRequest, RaptorRequestBuilder,
    RaptorResponse, RaptorService, Seconds, StopIndex, Timestamp,
};

// Common example data for the demos and benchmarks.

pub const GRID_SIZE: usize = 12;

const FIRST_TRIP: Timestamp = 6 * 3600;
const LAST_TRIP: Timestamp = 10 * 3600;
const DWELL_TIME: Seconds = 20;

pub fn get_example_transfer_time() -> Seconds {
    2 * 60
}

fn stop_name(row: usize, col: usize) -> String {
    format!("R{row}C{col}")
}

/// A grid city with a bus line in both directions along every row and column. Travel times and
/// headways are drawn from `seed`, so the same seed always gives the same network.
pub fn build_example_network(seed: u64) -> Network {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut builder = NetworkBuilder::new();
    let mut grid = vec![vec![0; GRID_SIZE]; GRID_SIZE];
    for (row, stops) in grid.iter_mut().enumerate() {
        for (col, stop) in stops.iter_mut().enumerate() {
            *stop = builder.add_stop(&stop_name(row, col));
        }
    }

    let mut lines = Vec::new();
    for i in 0..GRID_SIZE {
        let row: Vec<StopIndex> = grid[i].clone();
        let col: Vec<StopIndex> = grid.iter().map(|stops| stops[i]).collect();
        lines.push((format!("BUS E{i}"), row.clone()));
        lines.push((format!("BUS W{i}"), row.into_iter().rev().collect()));
        lines.push((format!("BUS S{i}"), col.clone()));
        lines.push((format!("BUS N{i}"), col.into_iter().rev().collect()));
    }

    for (group, (label, stops)) in lines.iter().enumerate() {
        let travel_times: Vec<Seconds> = (1..stops.len()).map(|_| rng.i32(90..=240)).collect();
        let headway = rng.i32(6..=15) * 60;
        let mut trips = Vec::new();
        let mut departure = FIRST_TRIP + rng.i32(0..headway);
        while departure <= LAST_TRIP {
            let mut time = departure;
            let mut trip = vec![StopTime { arrival_time: time, departure_time: time }];
            for travel_time in &travel_times {
                time += travel_time;
                trip.push(StopTime { arrival_time: time, departure_time: time + DWELL_TIME });
                time += DWELL_TIME;
            }
            trips.push(trip);
            departure += headway;
        }
        // Every trip follows the same travel times, so none overtakes another.
        if let Ok(route) = builder.add_route_with_times(label, stops, trips) {
            builder.set_transit_group(route, (group % 4) as u32);
        }
    }

    // Diagonal walking shortcuts.
    for row in 0..GRID_SIZE - 1 {
        for col in 0..GRID_SIZE - 1 {
            let duration = rng.i32(4..=8) * 60;
            let (from, to) = (grid[row][col], grid[row + 1][col + 1]);
            builder.add_transfer_with_cost(from, to, duration, duration * 200);
            builder.add_transfer_with_cost(to, from, duration, duration * 200);
        }
    }

    builder
        .slack(get_example_transfer_time(), 0, 0)
        .cost_calculator(DefaultCostCalculator::default())
        .build()
}

pub fn get_example_start_time() -> Timestamp {
    8 * 3600 + 30 * 60
}

pub fn get_example_start_stop_idx(network: &Network) -> Option<StopIndex> {
    network.get_stop_idx_from_name(&stop_name(0, 0))
}

pub fn get_example_end_stop_idx(network: &Network) -> Option<StopIndex> {
    network.get_stop_idx_from_name(&stop_name(GRID_SIZE - 1, GRID_SIZE - 1))
}

pub fn get_example_scenario() -> (Network, StopIndex, Timestamp, StopIndex) {
    let network = build_example_network(7);
    let start = get_example_start_stop_idx(&network).unwrap();
    let end = get_example_end_stop_idx(&network).unwrap();
    (network, start, get_example_start_time(), end)
}

/// A request walking 2 minutes to `start` and 3 minutes from `end`, departing within the next
/// hour.
pub fn example_request(profile: RaptorProfile, start: StopIndex, start_time: Timestamp, end: StopIndex) -> RaptorRequest {
    RaptorRequestBuilder::new()
        .profile(profile)
        .earliest_departure_time(start_time)
        .search_window(3600)
        .add_access_paths([AccessEgress::walk(start, 120)])
        .add_egress_paths([AccessEgress::walk(end, 180)])
        .build()
        .unwrap()
}

/// Random origin/destination pairs over the grid, departing between 7:00 and 9:00.
pub fn random_requests(profile: RaptorProfile, count: usize, seed: u64) -> Vec<RaptorRequest> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let num_stops = (GRID_SIZE * GRID_SIZE) as StopIndex;
    (0..count)
        .map(|_| {
            let start = rng.u32(0..num_stops);
            let end = (start + rng.u32(1..num_stops)) % num_stops;
            let start_time = utils::parse_time("7:00").unwrap_or_default() + rng.i32(0..120) * 60;
            example_request(profile, start, start_time, end)
        })
        .collect()
}

/// Runs every request on the rayon thread pool. Results are in request order.
pub fn batch_query(service: &RaptorService, network: &Network, requests: &[RaptorRequest]) -> Vec<Result<RaptorResponse, RaptorError>> {
    requests.par_iter().map(|request| service.route(request, network)).collect()
}
