pub mod clock;
pub mod detectors;
pub mod filters;
pub mod io;
pub mod metrics;
pub mod pacing;
pub mod plot;
pub mod session;
pub mod signal;
pub mod source;
pub mod stream;

pub use clock::*;
pub use detectors::*;
pub use metrics::*;
pub use session::*;
pub use signal::*;
pub use source::*;
