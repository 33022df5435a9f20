pub mod c_api;
pub mod constants;
pub mod covering;
pub mod distribute;
#[cfg(feature = "mpi")]
pub mod distributed;
pub mod error;
pub mod hilbert;
pub mod lookup;
pub mod partition;
pub mod types;
pub mod weights;
