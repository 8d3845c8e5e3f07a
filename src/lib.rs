pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod model;
pub mod openai;
pub mod server;
pub mod validation;

pub use config::AppConfig;
pub use error::ServiceError;
pub use generation::{BuiltResponse, ChunkStream, build};
pub use metrics::ServerMetrics;
pub use model::{ModelCatalog, ModelInfo};
pub use openai::{CompletionResponse, EndpointKind, GenerationRequest, StreamChunk};
pub use server::{build_router, build_router_with_metrics};
pub use validation::{FieldError, FieldErrorKind, ValidationErrors, validate};
