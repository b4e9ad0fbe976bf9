// Process aggregation: logical name -> PIDs -> one aggregate -> rates

mod aggregate;
mod table;

pub use aggregate::{
    PidSample, ProcessAggregate, ProcessAggregator, ProcessRates, SystemContext, TrackState,
    read_pid_samples,
};
pub use table::{ProcessEntry, ProcessLister, ProcessTable, match_processes};
