/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub environment: String,
    pub version: &'static str,
}
