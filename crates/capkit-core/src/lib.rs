//! capkit core - generic capability evaluation engine
//!
//! One engine serves every capability. A [`CapabilityConfig`] supplies the
//! collection and id field names, the recommendation type labels and the
//! routing map; the engine supplies everything else:
//!
//! - extracting and validating entities from an arbitrary JSON payload
//! - scoring each entity and classifying it as nominal, watch or critical
//! - aggregating a summary, posture and alerts
//! - deriving primary/guard/audit/publish recommendations
//! - converting recommendations into task requests for target agents
//!
//! [`CapabilityManager`] wraps a toolkit with an agent identity, a clock and a
//! bounded evaluation history.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod state;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, UuidIds};
pub use config::{CapabilityConfig, RecommendationRole, ReliabilityPolicy};
pub use engine::{CapabilityToolkit, DispatchOptions, Status};
pub use error::{CapabilityError, ConfigurationError, Result, ValidationError};
pub use protocol::{TaskPriority, TaskRequest, TaskResult};
pub use registry::CapabilityRegistry;
pub use report::{EvaluationReport, Recommendation, Summary};
pub use state::{CapabilityManager, HistoryEntry};
