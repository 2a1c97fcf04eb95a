mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use raptor::{RangeRaptorWorker, RaptorTuningParameters, SearchContext};

#[test]
fn worker_publishes_rounds_in_order() {
    let network = line_network();
    let request = request().build().unwrap();
    let tuning = RaptorTuningParameters::default();
    let mut ctx = SearchContext::of(&request, &tuning, &network, None).build().unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = ctx.life_cycle().unwrap();
    let e = events.clone();
    subscriptions.on_route_search(move |forward| e.borrow_mut().push(format!("search forward={forward}")));
    let e = events.clone();
    subscriptions.on_setup_iteration(move |time| e.borrow_mut().push(format!("iteration {time}")));
    let e = events.clone();
    subscriptions.on_prepare_for_next_round(move |round| e.borrow_mut().push(format!("round {round}")));
    let e = events.clone();
    subscriptions.on_transits_for_round_complete(move || e.borrow_mut().push("transits".to_owned()));
    let e = events.clone();
    subscriptions.on_transfers_for_round_complete(move || e.borrow_mut().push("transfers".to_owned()));
    let e = events.clone();
    subscriptions.on_round_complete(move |reached| e.borrow_mut().push(format!("reached={reached}")));
    let e = events.clone();
    subscriptions.on_iteration_complete(move || e.borrow_mut().push("iteration done".to_owned()));

    let publisher = ctx.create_life_cycle_publisher().unwrap();
    assert!(ctx.life_cycle().is_none());
    let response = RangeRaptorWorker::new(&ctx, publisher).route().unwrap();
    assert_eq!(response.paths().len(), 1);

    assert_eq!(
        *events.borrow(),
        [
            "search forward=true",
            "iteration 0",
            "round 1",
            "transits",
            "transfers",
            "reached=true",
            "round 2",
            "transits",
            "transfers",
            "reached=false",
            "iteration done",
        ]
    );
}
