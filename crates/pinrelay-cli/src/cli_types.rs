use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// Where relay mappings and guild preferences are kept.
pub enum CliSettingsBackend {
    Sqlite,
    /// Process-local; everything is lost on restart.
    Memory,
}
