mod config;
mod models;
mod normalize;
mod translate;

pub use config::ConfigCommand;
pub use models::ModelsCommand;
pub use normalize::NormalizeCommand;
pub use translate::TranslateCommand;
