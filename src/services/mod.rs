pub mod classifier;
pub mod json_extract;
pub mod llm_gateway_client;

// Re-export for convenience
pub use classifier::{Classifier, ClassifierKind, LlmClassifier, ScoredDocument, VectorStore};
pub use llm_gateway_client::{GatewayError, GenerationRequest, LlmGateway, LlmGatewayClient};
