use raptor::{raptor_query, RaptorProfile};

use dev_utils::{example_request, get_example_scenario};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (network, start, start_time, end) = get_example_scenario();
    network.print_stats();

    let request = example_request(RaptorProfile::Standard, start, start_time, end);
    let response = raptor_query(&request, &network)?;

    if response.is_empty() {
        println!("No journey found.");
    }
    for path in response.paths() {
        println!("{}", path.to_string_with_names(|stop| network.get_stop(stop as usize).name.to_string()));
    }

    Ok(())
}
