use crate::transit::Timestamp;

type Callback<'a, A> = Box<dyn FnMut(A) + 'a>;

/// Collects life-cycle callbacks before a search starts. Closing it produces the publisher the
/// worker notifies, after which no more subscriptions can be made.
#[derive(Default)]
pub struct LifeCycleSubscriptions<'a> {
    route_search: Vec<Callback<'a, bool>>,
    setup_iteration: Vec<Callback<'a, Timestamp>>,
    prepare_for_next_round: Vec<Callback<'a, u32>>,
    transits_for_round_complete: Vec<Callback<'a, ()>>,
    transfers_for_round_complete: Vec<Callback<'a, ()>>,
    round_complete: Vec<Callback<'a, bool>>,
    iteration_complete: Vec<Callback<'a, ()>>,
}

impl<'a> LifeCycleSubscriptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once before the first iteration, with `true` for a forward search.
    pub fn on_route_search(&mut self, callback: impl FnMut(bool) + 'a) {
        self.route_search.push(Box::new(callback));
    }

    pub fn on_setup_iteration(&mut self, callback: impl FnMut(Timestamp) + 'a) {
        self.setup_iteration.push(Box::new(callback));
    }

    pub fn on_prepare_for_next_round(&mut self, callback: impl FnMut(u32) + 'a) {
        self.prepare_for_next_round.push(Box::new(callback));
    }

    pub fn on_transits_for_round_complete(&mut self, mut callback: impl FnMut() + 'a) {
        self.transits_for_round_complete.push(Box::new(move |()| callback()));
    }

    pub fn on_transfers_for_round_complete(&mut self, mut callback: impl FnMut() + 'a) {
        self.transfers_for_round_complete.push(Box::new(move |()| callback()));
    }

    /// Called with `true` if a new destination arrival was found in the round.
    pub fn on_round_complete(&mut self, callback: impl FnMut(bool) + 'a) {
        self.round_complete.push(Box::new(callback));
    }

    pub fn on_iteration_complete(&mut self, mut callback: impl FnMut() + 'a) {
        self.iteration_complete.push(Box::new(move |()| callback()));
    }

    pub fn close(self) -> LifeCycleEventPublisher<'a> {
        LifeCycleEventPublisher { subscriptions: self }
    }
}

pub struct LifeCycleEventPublisher<'a> {
    subscriptions: LifeCycleSubscriptions<'a>,
}

fn notify<A: Copy>(callbacks: &mut [Callback<'_, A>], arg: A) {
    for callback in callbacks.iter_mut() {
        callback(arg);
    }
}

impl LifeCycleEventPublisher<'_> {
    pub fn route_search(&mut self, forward: bool) {
        notify(&mut self.subscriptions.route_search, forward);
    }

    pub fn setup_iteration(&mut self, iteration_time: Timestamp) {
        notify(&mut self.subscriptions.setup_iteration, iteration_time);
    }

    pub fn prepare_for_next_round(&mut self, round: u32) {
        notify(&mut self.subscriptions.prepare_for_next_round, round);
    }

    pub fn transits_for_round_complete(&mut self) {
        notify(&mut self.subscriptions.transits_for_round_complete, ());
    }

    pub fn transfers_for_round_complete(&mut self) {
        notify(&mut self.subscriptions.transfers_for_round_complete, ());
    }

    pub fn round_complete(&mut self, destination_reached: bool) {
        notify(&mut self.subscriptions.round_complete, destination_reached);
    }

    pub fn iteration_complete(&mut self) {
        notify(&mut self.subscriptions.iteration_complete, ());
    }
}
