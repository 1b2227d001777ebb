//! Opportunity optimizer - the suggest, validate, learn, refine loop.

mod config;
mod errors;
mod optimizer;
mod result;
mod validation;

pub use config::{ApiCostModel, OptimizationConfig};
pub use errors::{IterationError, IterationFailureKind, OptimizerError};
pub use optimizer::{
    OpportunityOptimizer, ServiceBreakerConfigs, AI_SERVICE, INVENTORY_SERVICE, KEYWORD_SERVICE,
};
pub use result::{
    ApiCostBreakdown, IterationFailure, IterationResult, OptimizationResult, StopReason,
};
