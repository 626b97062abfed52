use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory for downloaded songs and history/metadata files
    #[arg(long, value_name = "PATH", default_value = "downloads")]
    pub dir: String,

    /// Tag filter for the query (empty matches everything)
    #[arg(long, default_value = "")]
    pub tags: String,

    /// Sort key for the query
    #[arg(long, default_value = "date")]
    pub sort: String,

    /// How many songs to download
    #[arg(long, default_value_t = 1)]
    pub limit: usize,

    /// Ascending instead of descending result order
    #[arg(long, default_value_t = false)]
    pub reverse: bool,

    /// License filter, e.g. "by"
    #[arg(long, default_value = "by")]
    pub license: String,

    /// Ignore download history and start from offset 0
    #[arg(long, default_value_t = false)]
    pub no_skip_previous: bool,

    /// Verbose logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

pub fn args() -> Args {
    Args::parse()
}
