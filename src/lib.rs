pub mod transit;

pub use transit::{Cost, PatternIndex, Seconds, StopIndex, Timestamp, TransitDataProvider, TripIndex};

pub mod network;

pub use network::{Network, NetworkBuilder};

pub mod access_egress;

pub use access_egress::AccessEgress;

pub mod request;

pub use request::{
    PassThroughPoint, RaptorProfile, RaptorRequest, RaptorRequestBuilder, RaptorTuningParameters, SearchDirection, ViaConnection,
    ViaLocation,
};

pub mod error;

pub use error::{NetworkError, RaptorError};

pub mod journey;

pub use journey::{PathLeg, PathLegKind, RaptorPath};

pub mod raptor;

pub use raptor::{raptor_query, RangeRaptorWorker, RaptorResponse, RaptorService};

pub mod context;

pub use context::SearchContext;

pub mod calculator;
pub mod lifecycle;
pub mod multicriteria;
pub mod pareto;
pub mod round_tracker;
pub mod state;
pub mod utils;

mod path_mapper;
