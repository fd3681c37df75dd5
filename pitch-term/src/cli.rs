use clap::Parser;

use crate::capture::SourceKind;

#[derive(Parser, Debug)]
#[command(name = "pitchscope", about = "Real-time terminal tuner and pitch meter")]
pub struct Cli {
    /// Where audio comes from. Defaults to the last source used, then `device`
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Capture command for `--source command`; must write s16le mono PCM to
    /// stdout. `{rate}` is replaced with the sample rate
    #[arg(short, long)]
    pub command: Option<String>,

    /// Requested sample rate in Hz (devices may substitute their own)
    #[arg(short, long, default_value_t = 48000)]
    pub rate: u32,

    /// Samples per analysis frame
    #[arg(short = 'n', long, default_value_t = 4096)]
    pub frame_size: usize,

    /// Number of pseudo-spectrum bands. Saved for later runs
    #[arg(short, long)]
    pub bands: Option<usize>,

    /// Reference pitch for A4 in Hz (415-465). Saved for later runs
    #[arg(short = 'a', long)]
    pub reference: Option<f32>,

    /// Print one line per frame instead of redrawing in place
    #[arg(long)]
    pub lines: bool,
}
