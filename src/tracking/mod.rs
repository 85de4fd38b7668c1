mod ledger;
mod settings;

pub use ledger::Ledger;
pub use settings::SettingsStore;
