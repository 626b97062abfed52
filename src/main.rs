mod cli;

use ccmdl::download::{DownloadOptions, Downloader};
use ccmdl::fetch::CcMixter;
use ccmdl::probe::SymphoniaProber;
use ccmdl::query::{QuerySignature, SortOrder};

fn main() -> anyhow::Result<()> {
    let args = cli::args();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let downloader = Downloader::new(CcMixter::new(), CcMixter::new(), SymphoniaProber);

    let songs = downloader.download(&DownloadOptions {
        dir: args.dir.into(),
        signature: QuerySignature::new(args.tags, args.sort),
        limit: args.limit,
        order: if args.reverse {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        },
        license: Some(args.license),
        skip_previous: !args.no_skip_previous,
    })?;

    println!("{}", serde_json::to_string_pretty(&songs)?);
    Ok(())
}
