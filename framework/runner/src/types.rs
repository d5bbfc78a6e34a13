/// Recommended error type for your scenario `main` function. Configuration problems are carried
/// as [stampede_core::prelude::ConfigError] and can be recovered with `downcast_ref`.
pub type StampedeResult<T> = anyhow::Result<T>;
