pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod model;
pub mod normalize;
pub mod platform;
pub mod progress;
pub mod reconcile;
pub mod scanner;
pub mod shortcut;

pub use config::AppConfig;
pub use engine::{EnforcePlan, Engine, SaveResult};
pub use error::Error;
pub use executor::{ActionResult, ExecutionReport, Executor};
pub use model::{ConfigModel, FolderPath, ItemMetadata};
pub use progress::{ProgressReporter, SilentReporter};
pub use reconcile::{Action, Plan, PlanNote, ReconcileOptions, Reconciler};
