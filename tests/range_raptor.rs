mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use raptor::multicriteria::{PathCriteria, RelaxFunction};
use raptor::{
    raptor_query, AccessEgress, NetworkBuilder, PassThroughPoint, RaptorError, RaptorProfile, RaptorRequestBuilder, RaptorService,
    RaptorTuningParameters, SearchDirection,
};

#[test]
fn timetable_search_keeps_both_departures() {
    let network = line_network();
    let request = request().search_window(20 * 60).timetable(true).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(response.iterations(), 20);
    assert_eq!(
        path_strs(&network, response.paths()),
        [
            "Walk 1m ~ A ~ BUS R1 0:02 0:30 ~ D ~ Walk 1m [0:01 0:31 30m Tₓ0 C₁0]",
            "Walk 1m ~ A ~ BUS R1 0:12 0:40 ~ D ~ Walk 1m [0:11 0:41 30m Tₓ0 C₁0]",
        ]
    );
    // Each trip belongs to the latest departure minute catching it.
    assert_eq!(response.paths()[0].iteration_departure_time(), 60);
    assert_eq!(response.paths()[1].iteration_departure_time(), 660);
}

#[test]
fn arrival_time_search_keeps_only_the_earlier_trip() {
    let network = costed_line_network();
    let request = request().search_window(20 * 60).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:02 0:30 ~ D ~ Walk 1m [0:01 0:31 30m Tₓ0 C₁1_980]"]
    );
}

#[test]
fn timetable_search_with_costs_keeps_both_departures() {
    let network = costed_line_network();
    let request = request().search_window(20 * 60).timetable(true).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    let costs: Vec<_> = response.paths().iter().map(|path| path.c1()).collect();
    assert_eq!(costs, [198_000, 198_000]);
}

#[test]
fn path_cost_matches_search_cost() {
    let network = transfer_network();
    let response = raptor_query(&request().build().unwrap(), &network).unwrap();

    assert_eq!(response.paths().len(), 1);
    let path = &response.paths()[0];
    assert_eq!(
        detailed_str(&network, path),
        "Walk 1m 0:04 0:05 C₁120 ~ A ~ BUS R1 0:05 0:15 10m C₁660 ~ B ~ Walk 3m 0:15 0:18 C₁360 ~ C 7m ~ \
         BUS R2 0:25 0:40 15m C₁1_416 ~ D ~ Walk 1m 0:40 0:41 C₁120 [0:04 0:41 37m Tₓ1 C₁2_676]"
    );
    assert_eq!(path.legs().iter().map(|leg| leg.c1).sum::<i32>(), path.c1());
}

#[test]
fn standard_profile_finds_the_transfer_path_without_costs() {
    let network = transfer_network();
    let request = request().profile(RaptorProfile::Standard).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:05 0:15 ~ B ~ Walk 3m ~ C ~ BUS R2 0:25 0:40 ~ D ~ Walk 1m [0:04 0:41 37m Tₓ1 C₁0]"]
    );
}

#[test]
fn max_number_of_transfers_limits_rounds() {
    let network = transfer_network();
    let request = request().max_number_of_transfers(0).build().unwrap();
    assert!(raptor_query(&request, &network).unwrap().is_empty());
}

#[test]
fn best_time_profile_returns_arrival_times_only() {
    let network = line_network();
    let request = request().profile(RaptorProfile::BestTime).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert!(response.is_empty());
    let arrivals = response.stop_arrivals();
    assert_eq!(arrivals.best_time(A), Some(60));
    assert_eq!(arrivals.fewest_rides(A), Some(0));
    assert_eq!(arrivals.best_time(D), Some(1800));
    assert_eq!(arrivals.fewest_rides(D), Some(1));
    assert!(!arrivals.reached(E));
    assert_eq!(arrivals.best_destination_time(), Some(1860));
}

#[test]
fn latest_arrival_time_limits_forward_search() {
    let network = line_network();
    let too_early = request().latest_arrival_time(30 * 60).build().unwrap();
    assert!(raptor_query(&too_early, &network).unwrap().is_empty());

    let in_time = request().latest_arrival_time(31 * 60).build().unwrap();
    assert_eq!(raptor_query(&in_time, &network).unwrap().paths().len(), 1);
}

#[test]
fn flex_access_waits_for_opening_hours() {
    let network = line_network();
    let flex = AccessEgress::flex(A, 60, 1).with_opening_hours(10 * 60, 60 * 60);
    let request = RaptorRequestBuilder::new()
        .earliest_departure_time(0)
        .add_access_paths([flex])
        .add_egress_paths([AccessEgress::walk(D, 60)])
        .build()
        .unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(
        path_strs(&network, response.paths()),
        ["Flex 1m 1x Open(0:10 1:00) ~ A ~ BUS R1 0:12 0:40 ~ D ~ Walk 1m [0:10 0:41 31m Tₓ1 C₁0]"]
    );
    let path = &response.paths()[0];
    // The flex leg starts at opening, only the transfer slack is waited at A.
    assert_eq!((path.legs()[0].from_time, path.legs()[0].to_time), (600, 660));
    assert_eq!(path.legs()[1].from_time - path.legs()[0].to_time, 60);
    assert_eq!(path.duration(), path.end_time() - path.start_time());
}

fn flex_egress_request(flex: AccessEgress) -> RaptorRequestBuilder {
    RaptorRequestBuilder::new()
        .earliest_departure_time(0)
        .add_access_paths([AccessEgress::walk(A, 60)])
        .add_egress_paths([flex])
}

#[test]
fn flex_egress_waits_for_opening_hours() {
    let network = costed_line_network();
    let flex = AccessEgress::flex(D, 5 * 60, 1).with_opening_hours(45 * 60, 60 * 60);
    let request = flex_egress_request(flex).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:02 0:30 ~ D ~ Flex 5m 1x Open(0:45 1:00) [0:01 0:50 49m Tₓ1 C₁3_360]"]
    );
    let path = &response.paths()[0];
    let egress = &path.legs()[2];
    assert_eq!((egress.from_time, egress.to_time), (2700, 3000));
    // 15 minutes waited at D, after the transfer slack, plus the flex leg with board and transfer cost.
    assert_eq!(egress.c1, 900 * 80 + 60_000 + 6_000 + 12_000);
    assert_eq!(path.legs().iter().map(|leg| leg.c1).sum::<i32>(), path.c1());
    assert_eq!(path.number_of_transfers(), 1);
}

#[test]
fn flex_egress_needs_transfer_slack_before_closing() {
    let network = line_network();
    // Arriving at 0:30, the traveller is ready at 0:31 when the service has closed.
    let flex = AccessEgress::flex(D, 5 * 60, 1).with_opening_hours(0, 30 * 60 + 30);
    let request = flex_egress_request(flex).build().unwrap();
    assert!(raptor_query(&request, &network).unwrap().is_empty());

    let flex = AccessEgress::flex(D, 5 * 60, 1).with_opening_hours(0, 31 * 60);
    let request = flex_egress_request(flex).build().unwrap();
    assert_eq!(
        path_strs(&network, raptor_query(&request, &network).unwrap().paths()),
        ["Walk 1m ~ A ~ BUS R1 0:02 0:30 ~ D ~ Flex 5m 1x Open(0:00 0:31) [0:01 0:36 35m Tₓ1 C₁0]"]
    );
}

#[test]
fn reverse_search_finds_latest_departure() {
    let network = line_network();
    let request = RaptorRequestBuilder::new()
        .direction(SearchDirection::Reverse)
        .latest_arrival_time(45 * 60)
        .add_access_paths([AccessEgress::walk(A, 60)])
        .add_egress_paths([AccessEgress::walk(D, 60)])
        .build()
        .unwrap();
    let response = raptor_query(&request, &network).unwrap();

    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:12 0:40 ~ D ~ Walk 1m [0:11 0:41 30m Tₓ0 C₁0]"]
    );
    // In a reverse search the table holds the latest departure from each stop.
    assert_eq!(response.stop_arrivals().best_time(A), Some(720));
}

#[test]
fn pass_through_point_must_be_visited() {
    let mut builder = NetworkBuilder::new();
    builder.add_stops(&["A", "B", "C", "D"]);
    builder.add_route("BUS R1", &["A", "B", "D"], &["0:05 0:10 0:20"]).unwrap();
    builder.add_route("BUS R2", &["A", "C", "D"], &["0:06 0:11 0:16"]).unwrap();
    let network = builder.slack(60, 0, 0).build();

    let response = raptor_query(&request().build().unwrap(), &network).unwrap();
    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R2 0:06 0:16 ~ D ~ Walk 1m [0:05 0:17 12m Tₓ0 C₁0]"]
    );

    let request = request().add_pass_through_point(PassThroughPoint::new("B", &[B])).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();
    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:05 0:20 ~ D ~ Walk 1m [0:04 0:21 17m Tₓ0 C₁0 C₂1]"]
    );
}

#[test]
fn transit_group_priority_keeps_one_path_per_group() {
    let network = grouped_network();
    let response = raptor_query(&request().build().unwrap(), &network).unwrap();
    assert_eq!(
        path_strs(&network, response.paths()),
        ["Walk 1m ~ A ~ BUS R1 0:05 0:20 ~ D ~ Walk 1m [0:04 0:21 17m Tₓ0 C₁1_200]"]
    );

    let request = request().transit_group_priority(RelaxFunction::new(1.0, 0)).build().unwrap();
    let response = raptor_query(&request, &network).unwrap();
    assert_eq!(
        path_strs(&network, response.paths()),
        [
            "Walk 1m ~ A ~ BUS R1 0:05 0:20 ~ D ~ Walk 1m [0:04 0:21 17m Tₓ0 C₁1_200 C₂2]",
            "Walk 1m ~ A ~ BUS R2 0:05 0:21 ~ D ~ Walk 1m [0:04 0:22 18m Tₓ0 C₁1_260 C₂4]",
        ]
    );
}

#[test]
fn relaxed_c1_at_destination_keeps_slower_path() {
    let network = fork_network();
    let request = || request().add_egress_paths([AccessEgress::walk(C, 2 * 60)]);
    let fastest = "Walk 1m ~ A ~ BUS R1 0:05 0:20 ~ D ~ Walk 1m [0:04 0:21 17m Tₓ0 C₁1_200]";

    let response = raptor_query(&request().build().unwrap(), &network).unwrap();
    assert_eq!(path_strs(&network, response.paths()), [fastest]);

    // C₁1_320 is above C₁1_200 relaxed by 5%.
    let tight = request().relax_c1_at_destination(RelaxFunction::new(1.05, 0)).build().unwrap();
    let response = raptor_query(&tight, &network).unwrap();
    assert_eq!(path_strs(&network, response.paths()), [fastest]);

    let relaxed = request().relax_c1_at_destination(RelaxFunction::new(1.2, 0)).build().unwrap();
    let response = raptor_query(&relaxed, &network).unwrap();
    assert_eq!(
        path_strs(&network, response.paths()),
        [fastest, "Walk 1m ~ A ~ BUS R2 0:05 0:20 ~ C ~ Walk 2m [0:04 0:22 18m Tₓ0 C₁1_320]"]
    );
}

#[test]
fn invalid_requests_are_rejected() {
    let network = line_network();
    let request = request().add_access_paths([AccessEgress::walk(99, 60)]).build().unwrap();
    assert_eq!(raptor_query(&request, &network).unwrap_err(), RaptorError::InvalidAccessEgress { stop: 99, num_stops: 5 });
}

#[test]
fn cancelled_search_stops() {
    let network = line_network();
    let flag = Arc::new(AtomicBool::new(true));
    let request = request().cancellation(flag).build().unwrap();
    assert_eq!(raptor_query(&request, &network).unwrap_err(), RaptorError::SearchCancelled);
}

#[test]
fn search_times_out() {
    let network = line_network();
    let request = request().search_window(20 * 60).build().unwrap();
    let tuning = RaptorTuningParameters { search_timeout: Some(Duration::ZERO), ..Default::default() };
    assert_eq!(RaptorService::new(tuning).route(&request, &network).unwrap_err(), RaptorError::SearchTimedOut);

    let tuning = RaptorTuningParameters { search_timeout: Some(Duration::from_secs(60)), ..Default::default() };
    assert_eq!(RaptorService::new(tuning).route(&request, &network).unwrap().paths().len(), 1);
}

#[test]
fn concurrent_searches_share_the_network() {
    let network = transfer_network();
    let service = RaptorService::new(RaptorTuningParameters::default());
    let request = request().search_window(30 * 60).build().unwrap();
    let expected = service.route(&request, &network).unwrap().into_paths();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| service.route(&request, &network))).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().paths(), expected.as_slice());
        }
    });
}
