//! Request Routing
//!
//! The routing subsystem: registry of live backends, in-flight queue
//! tracking, and the selector that turns a request plus the effective
//! efficiency mode into a backend choice.
//!
//! ```text
//! +-------------+     +--------------+     +----------------------+
//! |  Registry   |     | QueueManager |     | EfficiencyController |
//! | (backends,  |     | (in-flight   |     | (effective mode)     |
//! |  health)    |     |  per backend)|     |                      |
//! +------+------+     +------+-------+     +----------+-----------+
//!        |                   |                        |
//!        +---------+---------+------------------------+
//!                  v
//!            +-----------+
//!            |  Router   |  filter -> score -> wrap
//!            +-----------+
//!                  |
//!                  v
//!          RoutedBackend (queue-tracking adapter)
//! ```

pub mod queue;
pub mod registry;
pub mod router;
pub mod weights;

#[cfg(test)]
pub mod test_utils;

pub use queue::{QueueManager, QueueState};
pub use registry::BackendRegistry;
pub use router::{QueueGuard, RoutedBackend, Router, TrackedStream};
pub use weights::Weights;
