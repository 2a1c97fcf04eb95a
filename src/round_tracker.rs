/// Keeps track of the current round and decides when the round loop stops.
#[derive(Clone, Debug)]
pub struct RoundTracker {
    round: u32,
    // Inclusive.
    round_max_limit: u32,
    number_of_additional_transfers: u32,
    destination_reached: bool,
}

impl RoundTracker {
    /// A search allowing `max_number_of_transfers` transfers needs that many plus one rides.
    pub fn new(max_number_of_transfers: u32, number_of_additional_transfers: u32) -> Self {
        Self {
            round: 0,
            round_max_limit: max_number_of_transfers + 1,
            number_of_additional_transfers,
            destination_reached: false,
        }
    }

    pub fn setup_iteration(&mut self) {
        self.round = 0;
    }

    pub fn has_more_rounds(&self) -> bool {
        self.round < self.round_max_limit
    }

    pub fn next_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn round_max_limit(&self) -> u32 {
        self.round_max_limit
    }

    /// The limit is lowered the first time the destination is reached, and stays for the rest of
    /// the search.
    pub fn round_complete(&mut self, destination_reached: bool) {
        if destination_reached && !self.destination_reached {
            self.round_max_limit = self.round_max_limit.min(self.round + self.number_of_additional_transfers);
            self.destination_reached = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_max_transfers() {
        let mut tracker = RoundTracker::new(2, 5);
        let mut rounds = Vec::new();
        while tracker.has_more_rounds() {
            rounds.push(tracker.next_round());
            tracker.round_complete(false);
        }
        assert_eq!(rounds, vec![1, 2, 3]);
    }

    #[test]
    fn additional_transfers_limit_rounds_after_destination_reached() {
        let mut tracker = RoundTracker::new(10, 2);
        tracker.next_round();
        tracker.round_complete(false);
        tracker.next_round();
        tracker.round_complete(true);
        assert_eq!(tracker.round_max_limit(), 4);

        // Reaching the destination again later does not move the limit.
        tracker.next_round();
        tracker.round_complete(true);
        assert_eq!(tracker.round_max_limit(), 4);

        tracker.setup_iteration();
        assert_eq!(tracker.round(), 0);
        assert_eq!(tracker.round_max_limit(), 4);
    }
}
