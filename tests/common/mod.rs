//! Common test utilities and helpers

use postcraft::config::PipelineConfig;
use postcraft::pipeline::{PipelineController, PipelineSteps};
use postcraft::testing::MockGenerationClient;
use std::sync::Arc;

/// Controller over a scripted backend, with default configuration
pub fn controller_with(mock: MockGenerationClient) -> (PipelineController, Arc<MockGenerationClient>) {
    controller_with_config(mock, &PipelineConfig::default())
}

pub fn controller_with_config(
    mock: MockGenerationClient,
    config: &PipelineConfig,
) -> (PipelineController, Arc<MockGenerationClient>) {
    let mock = Arc::new(mock);
    let steps = PipelineSteps::from_config(mock.clone(), config).expect("valid test config");
    (PipelineController::new(Arc::new(steps)), mock)
}
