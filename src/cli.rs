// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "laptop-viewer")]
#[command(about = "Animated laptop model viewer", long_about = None)]
pub struct Cli {
    /// glTF / GLB model to display
    #[arg(long)]
    pub asset: Option<PathBuf>,

    /// JSON config file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial window height in logical pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Start with the window maximized
    #[arg(long, default_value = "false")]
    pub maximized: bool,
}
