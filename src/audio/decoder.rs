use crate::error::{AppError, AppResult};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

/// Symphonia probe + packet loop behind one seekable surface. Works the
/// same over a progressive HTTP source or a local cache file.
pub struct TrackDecoder {
    reader: Box<dyn symphonia::core::formats::FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    duration: Option<f64>,
}

pub struct DecodedBatch {
    /// Interleaved f32 samples.
    pub samples: Vec<f32>,
}

/// Container hint from the tail of a URL or file path. Query strings and
/// fragments are ignored.
pub fn extension_hint(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" | "m4a" | "mp4" | "aac" | "flac" | "wav" | "ogg" | "caf" => Some(ext),
        _ => None,
    }
}

impl TrackDecoder {
    pub fn new(source: Box<dyn MediaSource>, extension: Option<&str>) -> AppResult<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AppError::MediaDecode(format!("Unrecognized audio format: {}", e)))?;

        let reader = probed.format;
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AppError::MediaDecode("No decodable audio track".into()))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
        let duration = track
            .codec_params
            .n_frames
            .filter(|_| sample_rate > 0)
            .map(|frames| frames as f64 / sample_rate as f64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AppError::MediaDecode(format!("Unsupported codec: {}", e)))?;

        log::debug!(
            "Decoder ready: {} Hz, {} ch, duration {:?}",
            sample_rate,
            channels,
            duration
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Duration from container metadata, when the container carries one.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration
    }

    pub fn seek(&mut self, position_seconds: f64) -> AppResult<()> {
        let time = Time {
            seconds: position_seconds as u64,
            frac: position_seconds.fract(),
        };

        self.reader
            .seek(
                SeekMode::Coarse,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| AppError::MediaDecode(format!("Seek failed: {}", e)))?;

        // Codec state is stale after a container-level seek.
        self.decoder.reset();
        Ok(())
    }

    /// Next batch of interleaved samples; None at end of stream. Corrupt
    /// packets are skipped rather than ending the stream.
    pub fn decode_next(&mut self) -> AppResult<Option<DecodedBatch>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(AppError::MediaDecode(format!("Packet read failed: {}", e)))
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                    log::warn!("Skipping corrupt packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(AppError::MediaDecode(format!("Decode failed: {}", e))),
            };

            let spec = *decoded.spec();
            let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            buf.copy_interleaved_ref(decoded);

            return Ok(Some(DecodedBatch {
                samples: buf.samples().to_vec(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_hint_handles_urls_and_paths() {
        assert_eq!(
            extension_hint("https://cdn.example.com/audio/rain.mp3").as_deref(),
            Some("mp3")
        );
        assert_eq!(
            extension_hint("https://cdn.example.com/a.m4a?sig=abc.def#frag").as_deref(),
            Some("m4a")
        );
        assert_eq!(extension_hint("/cache/aud_42.flac").as_deref(), Some("flac"));
        assert_eq!(extension_hint("https://cdn.example.com/stream"), None);
        assert_eq!(extension_hint("archive.tar.gz"), None);
    }
}
