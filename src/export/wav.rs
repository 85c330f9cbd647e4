//! WAV file export functionality

use std::path::Path;

use crate::engine::StreamDecoder;
use crate::session::ReadStatus;
use crate::{Result, VagError};

/// Frames rendered per chunk; keeps memory flat regardless of duration.
const FRAMES_PER_CHUNK: usize = 4096;

/// Render a decoder to a 16-bit PCM WAV file.
///
/// Decodes from the decoder's current position to end of stream in fixed
/// chunks, so memory use is independent of the stream length.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use vagstream::export::export_to_wav;
/// use vagstream::session::VagSession;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data: Arc<[u8]> = std::fs::read("song.vag")?.into();
/// let mut session = VagSession::new();
/// session.open(data, 2)?;
/// export_to_wav(&mut session, "song.wav")?;
/// # Ok(())
/// # }
/// ```
pub fn export_to_wav<P: AsRef<Path>>(decoder: &mut dyn StreamDecoder, output_path: P) -> Result<()> {
    let format = decoder.format();
    let channels = usize::from(format.channel_count);

    let spec = hound::WavSpec {
        channels: u16::from(format.channel_count),
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path.as_ref(), spec)
        .map_err(|e| format!("Failed to create WAV file: {e}"))?;

    let mut buffer = vec![0i16; FRAMES_PER_CHUNK * channels];
    loop {
        let result = decoder.read_frames(&mut buffer);
        match result.status {
            ReadStatus::Ok => {
                let samples = result.frames_produced as usize * channels;
                for &sample in &buffer[..samples] {
                    writer
                        .write_sample(sample)
                        .map_err(|e| format!("Failed to write sample: {e}"))?;
                }
            }
            ReadStatus::Finished => break,
            ReadStatus::Error => {
                return Err(VagError::State("decoder error during export".into()));
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| format!("Failed to finalize WAV file: {e}"))?;

    Ok(())
}
