use raptor::multicriteria::RelaxFunction;
use raptor::{AccessEgress, RaptorRequestBuilder, RaptorService, RaptorTuningParameters, TransitDataProvider, ViaLocation};

use dev_utils::{get_example_scenario, GRID_SIZE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (network, start, start_time, end) = get_example_scenario();
    network.print_stats();

    // Pass by the middle of the grid and stay there for at least 5 minutes.
    let middle = network.get_stop_idx_from_name(&format!("R{0}C{0}", GRID_SIZE / 2)).ok_or("No middle stop")?;
    let request = RaptorRequestBuilder::new()
        .earliest_departure_time(start_time)
        .search_window(3600)
        .add_access_paths([AccessEgress::walk(start, 120)])
        .add_egress_paths([AccessEgress::walk(end, 180), AccessEgress::flex(end, 600, 1).with_c1(60_000)])
        .add_via_location(ViaLocation::stops("Middle", &[middle]).with_min_wait(300))
        .relax_c1_at_destination(RelaxFunction::new(1.1, 6_000))
        .build()?;

    let service = RaptorService::new(RaptorTuningParameters::default());
    let response = service.route(&request, &network)?;

    if response.is_empty() {
        println!("No journey found.");
    }
    for path in response.paths() {
        println!("{}", path.to_string_detailed(|stop| network.stop_name(stop).to_owned()));
    }
    println!("Searched {} departure minutes.", response.iterations());

    Ok(())
}
