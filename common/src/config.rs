/// Presentation flags shared by the CLI commands.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Suppresses the start-up banner.
    pub no_banner: bool,
    /// 0 prints everything, 1 drops decoration, 2 prints only the summary.
    pub quiet: u8,
    /// Raises the log filter to `debug`.
    pub verbose: bool,
}
