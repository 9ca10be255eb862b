use crate::config::AnalyzerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AnalyzerConfig,
}
