pub mod consts;
pub mod error;
pub mod group;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod response;
pub mod roi;
pub mod series;
pub mod tags;

pub use error::{DeltaError, Result};
pub use group::aggregate_by_group;
pub use io::source::load_series;
pub use normalize::compute_delta;
