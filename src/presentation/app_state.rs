// Application state for HTTP handlers
use crate::application::evaluation_service::EvaluationService;

#[derive(Clone)]
pub struct AppState {
    pub evaluation_service: EvaluationService,
}
