use anyhow::Context;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Reports the duration of a local audio file.
pub trait MediaProber {
    /// Duration in milliseconds of the first decodable audio stream, or
    /// `None` when the file carries no usable length information.
    fn duration_ms(&self, path: &Path) -> anyhow::Result<Option<u64>>;
}

impl<T: MediaProber + ?Sized> MediaProber for &T {
    fn duration_ms(&self, path: &Path) -> anyhow::Result<Option<u64>> {
        (**self).duration_ms(path)
    }
}

/// Probes duration from the container/codec metadata via symphonia.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProber;

impl MediaProber for SymphoniaProber {
    fn duration_ms(&self, path: &Path) -> anyhow::Result<Option<u64>> {
        let src = std::fs::File::open(path)
            .with_context(|| format!("opening {} for probing", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = match symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        ) {
            Ok(probed) => probed,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file is not probeable audio");
                return Ok(None);
            }
        };

        let Some(track) = probed.format.default_track() else {
            tracing::warn!(path = %path.display(), "no audio track found");
            return Ok(None);
        };

        let params = &track.codec_params;
        let duration = params
            .time_base
            .zip(params.n_frames)
            .map(|(time_base, frames)| {
                let time = time_base.calc_time(frames);
                time.seconds * 1000 + (time.frac * 1000.0) as u64
            });

        Ok(duration)
    }
}
