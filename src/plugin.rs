//! Host-facing plugin surface
//!
//! The playback host interacts with a decoder through a small lifecycle:
//! probe, create, open, a pull-based read loop, optional seek, close. This
//! module binds the [`VagSession`](crate::session::VagSession) core to that
//! lifecycle and adds the two ancillary services hosts expect: metadata
//! tagging and the scope-capture visualization extension.
//!
//! File I/O stays outside the core: the host hands in a [`FileLoader`]
//! service, and the loaded buffer is shared with the session by reference
//! counting — the plugin never copies or frees file bytes.

use std::sync::Arc;

use serde::Serialize;

use crate::adpcm::SAMPLES_PER_BLOCK;
use crate::scope::ScopeCapture;
use crate::session::{ReadResult, VagSession};
use crate::vag::{self, VagHeader, DEFAULT_SAMPLE_RATE};
use crate::{Result, VagError};

/// Resolves a URL to a loaded byte buffer.
///
/// The returned buffer is shared, not copied; sessions hold a reference for
/// their lifetime and the loader (or host) remains the owner.
pub trait FileLoader: Send + Sync {
    /// Load the complete contents behind `url`.
    fn load(&self, url: &str) -> std::io::Result<Arc<[u8]>>;
}

/// Filesystem-backed loader for hosts without their own I/O layer.
pub struct FsLoader;

impl FileLoader for FsLoader {
    fn load(&self, url: &str) -> std::io::Result<Arc<[u8]>> {
        std::fs::read(url).map(Arc::from)
    }
}

/// Services the host provides when creating a session.
#[derive(Clone)]
pub struct HostServices {
    /// URL-to-buffer resolver.
    pub loader: Arc<dyn FileLoader>,
}

impl HostServices {
    /// Services backed by the local filesystem.
    #[must_use]
    pub fn local() -> Self {
        Self {
            loader: Arc::new(FsLoader),
        }
    }
}

/// Key/value metadata sink provided by the host's tagging layer.
pub trait TagSink {
    /// Record one metadata tag.
    fn add_tag(&mut self, key: &str, value: &str);
}

/// Metadata extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackTags {
    /// Song title from the container name field; empty for raw streams.
    pub title: String,
    /// Authoring tool / format revision string.
    pub tool: String,
    /// Song type identifier.
    #[serde(rename = "songtype")]
    pub song_type: String,
    /// Play length in seconds.
    pub length_seconds: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Named subsongs; empty when the file holds a single track.
    pub subsongs: Vec<String>,
}

impl TrackTags {
    /// Emit these tags into a host sink.
    pub fn emit(&self, sink: &mut dyn TagSink) {
        if !self.title.is_empty() {
            sink.add_tag("title", &self.title);
        }
        if !self.tool.is_empty() {
            sink.add_tag("tool", &self.tool);
        }
        sink.add_tag("songtype", &self.song_type);
        sink.add_tag("length", &format!("{:.3}", self.length_seconds));
        sink.add_tag("samplerate", &self.sample_rate.to_string());
        for (index, name) in self.subsongs.iter().enumerate() {
            sink.add_tag(&format!("subsong{index}"), name);
        }
    }
}

/// Read metadata tags for a file without opening a full decode session.
///
/// Headerless raw streams are valid input everywhere else in the crate, so
/// they are valid here too: they yield an empty title and default-rate
/// length estimate instead of an error.
pub fn read_metadata(url: &str, services: &HostServices) -> Result<TrackTags> {
    let data = services.loader.load(url)?;
    if data.len() < vag::MIN_FILE_SIZE {
        return Err(VagError::ParseError(format!(
            "input too small: {} bytes",
            data.len()
        )));
    }

    let header = VagHeader::parse(&data);
    let body_len = data.len() - header.as_ref().map_or(0, |_| vag::HEADER_SIZE);
    let sample_rate = header
        .as_ref()
        .map_or(DEFAULT_SAMPLE_RATE, |h| h.sample_rate);
    let total_samples = (body_len / crate::adpcm::BLOCK_SIZE) * SAMPLES_PER_BLOCK;

    Ok(TrackTags {
        title: header.as_ref().map_or(String::new(), |h| h.name.clone()),
        tool: header
            .as_ref()
            .map_or(String::new(), |h| format!("VAGp v{}", h.version)),
        song_type: "PS-ADPCM".to_string(),
        length_seconds: total_samples as f32 / sample_rate as f32,
        sample_rate,
        subsongs: Vec::new(),
    })
}

/// Display names for the scope extension's channels.
const SCOPE_CHANNEL_NAMES: [&str; 2] = ["ADPCM L", "ADPCM R"];

/// One host-visible playback session.
///
/// Owns a [`VagSession`] plus the shared scope capture the visualization
/// extension reads from. Dropping the handle is `destroy`; `close` keeps
/// the handle reusable for the next file.
pub struct PluginSession {
    services: HostServices,
    session: VagSession,
    scope: Arc<ScopeCapture>,
    output_channels: u8,
}

impl PluginSession {
    /// Allocate session state against the host's services (mono output).
    #[must_use]
    pub fn create(services: HostServices) -> Self {
        Self::with_output_channels(services, 1)
    }

    /// Allocate session state with an explicit output channel count (1 or 2).
    #[must_use]
    pub fn with_output_channels(services: HostServices, output_channels: u8) -> Self {
        let output_channels = output_channels.clamp(1, 2);
        let scope = Arc::new(ScopeCapture::new(output_channels));
        let mut session = VagSession::new();
        session.set_scope(Arc::clone(&scope));
        Self {
            services,
            session,
            scope,
            output_channels,
        }
    }

    /// Open a file for playback.
    ///
    /// The URL is resolved through the host's loader service. VAG files
    /// carry a single track, so any nonzero `subsong` is rejected.
    pub fn open(&mut self, url: &str, subsong: usize) -> Result<()> {
        if subsong > 0 {
            return Err(VagError::Unsupported(format!(
                "subsong {subsong} requested, file format has a single track"
            )));
        }
        let data = self.services.loader.load(url)?;
        self.session.open(data, self.output_channels)
    }

    /// Access to the decode session (format, duration, state).
    #[must_use]
    pub fn session(&self) -> &VagSession {
        &self.session
    }

    /// Pull decoded frames. See [`VagSession::read`].
    pub fn read(&mut self, out: &mut [i16]) -> ReadResult {
        self.session.read(out)
    }

    /// Seek to a position in milliseconds.
    ///
    /// Returns the position reached, or `None` when the session is not in
    /// a seekable state — the host treats that as "keep playing".
    pub fn seek_ms(&mut self, ms: u32) -> Option<u32> {
        self.session.seek_ms(ms)
    }

    /// Close the current file, keeping the handle reusable.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Visualization extension: copy recent output samples for a channel.
    ///
    /// Capture is enabled lazily on the first request (which clears the
    /// buffer), so sessions without a visualizer pay nothing on the decode
    /// path. Returns the number of samples written, oldest first.
    pub fn scope_data(&self, channel: usize, out: &mut [f32]) -> usize {
        if !self.scope.is_enabled() {
            self.scope.set_enabled(true);
        }
        self.scope.read(channel, out)
    }

    /// Visualization extension: display names for the capture channels.
    #[must_use]
    pub fn scope_channel_names(&self) -> &'static [&'static str] {
        &SCOPE_CHANNEL_NAMES[..usize::from(self.output_channels)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adpcm::BLOCK_SIZE;
    use crate::session::ReadStatus;
    use crate::vag::HEADER_SIZE;
    use std::collections::HashMap;

    /// In-memory loader standing in for the host's I/O collaborator.
    struct MemLoader {
        files: HashMap<String, Arc<[u8]>>,
    }

    impl FileLoader for MemLoader {
        fn load(&self, url: &str) -> std::io::Result<Arc<[u8]>> {
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, url.to_string()))
        }
    }

    fn services_with(files: &[(&str, Vec<u8>)]) -> HostServices {
        let files = files
            .iter()
            .map(|(url, data)| ((*url).to_string(), Arc::from(data.as_slice())))
            .collect();
        HostServices {
            loader: Arc::new(MemLoader { files }),
        }
    }

    fn vag_file(sample_rate: u32, name: &str, block_count: usize) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(b"VAGp");
        data[4..8].copy_from_slice(&3u32.to_be_bytes());
        data[16..20].copy_from_slice(&sample_rate.to_be_bytes());
        data[32..32 + name.len()].copy_from_slice(name.as_bytes());
        for i in 0..block_count {
            let mut block = [0u8; BLOCK_SIZE];
            block[0] = 0x10;
            block[2..].fill(0x21 + (i as u8 % 4));
            data.extend_from_slice(&block);
        }
        data
    }

    #[derive(Default)]
    struct VecSink(Vec<(String, String)>);

    impl TagSink for VecSink {
        fn add_tag(&mut self, key: &str, value: &str) {
            self.0.push((key.to_string(), value.to_string()));
        }
    }

    #[test]
    fn test_lifecycle_create_open_read_close() {
        let services = services_with(&[("mem://boss.vag", vag_file(22_050, "BOSS", 4))]);
        let mut plugin = PluginSession::create(services);
        plugin.open("mem://boss.vag", 0).unwrap();

        assert_eq!(plugin.session().format().sample_rate, 22_050);
        let mut out = [0i16; 256];
        let result = plugin.read(&mut out);
        assert_eq!(result.status, ReadStatus::Ok);

        plugin.close();
        let result = plugin.read(&mut out);
        assert_eq!(result.status, ReadStatus::Error);

        // Reopen reuses the handle
        plugin.open("mem://boss.vag", 0).unwrap();
        assert_eq!(plugin.read(&mut out).status, ReadStatus::Ok);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let services = services_with(&[]);
        let mut plugin = PluginSession::create(services);
        assert!(plugin.open("mem://nope.vag", 0).is_err());
    }

    #[test]
    fn test_nonzero_subsong_is_rejected() {
        let services = services_with(&[("mem://a.vag", vag_file(22_050, "", 2))]);
        let mut plugin = PluginSession::create(services);
        assert!(matches!(
            plugin.open("mem://a.vag", 1),
            Err(VagError::Unsupported(_))
        ));
    }

    #[test]
    fn test_metadata_tags() {
        let services = services_with(&[("mem://tune.vag", vag_file(28_000, "CREDITS", 100))]);
        let tags = read_metadata("mem://tune.vag", &services).unwrap();
        assert_eq!(tags.title, "CREDITS");
        assert_eq!(tags.song_type, "PS-ADPCM");
        assert_eq!(tags.sample_rate, 28_000);
        // 100 blocks = 2800 samples at 28 kHz = 0.1 s
        assert!((tags.length_seconds - 0.1).abs() < 1e-6);
        assert!(tags.subsongs.is_empty());

        let mut sink = VecSink::default();
        tags.emit(&mut sink);
        assert!(sink.0.contains(&("title".into(), "CREDITS".into())));
        assert!(sink.0.contains(&("songtype".into(), "PS-ADPCM".into())));
        assert!(sink.0.contains(&("samplerate".into(), "28000".into())));
    }

    #[test]
    fn test_metadata_headerless_stream() {
        let services = services_with(&[("mem://raw", vec![0u8; 160])]);
        let tags = read_metadata("mem://raw", &services).unwrap();
        assert_eq!(tags.title, "");
        assert_eq!(tags.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_tags_serialize_to_json() {
        let services = services_with(&[("mem://t.vag", vag_file(44_100, "T", 1))]);
        let tags = read_metadata("mem://t.vag", &services).unwrap();
        let json = serde_json::to_string(&tags).unwrap();
        assert!(json.contains("\"songtype\""));
        assert!(json.contains("PS-ADPCM"));
    }

    #[test]
    fn test_scope_extension_lazy_enable() {
        // 16 blocks = 448 frames, so audio keeps flowing after the first
        // 128-frame stereo read
        let services = services_with(&[("mem://s.vag", vag_file(22_050, "", 16))]);
        let mut plugin = PluginSession::with_output_channels(services, 2);
        plugin.open("mem://s.vag", 0).unwrap();

        // Decode before any visualizer request: capture stays disabled
        let mut out = [0i16; 256];
        assert_eq!(plugin.read(&mut out).status, ReadStatus::Ok);
        let mut samples = [0.0f32; 64];
        assert_eq!(plugin.scope_data(0, &mut samples), 0);

        // First request enabled it; subsequent decodes are captured
        assert_eq!(plugin.read(&mut out).status, ReadStatus::Ok);
        assert!(plugin.scope_data(0, &mut samples) > 0);
        assert!(plugin.scope_data(1, &mut samples) > 0);
        assert_eq!(plugin.scope_channel_names(), ["ADPCM L", "ADPCM R"]);
    }

    #[test]
    fn test_scope_survives_close() {
        let services = services_with(&[("mem://s.vag", vag_file(22_050, "", 4))]);
        let mut plugin = PluginSession::create(services);
        plugin.open("mem://s.vag", 0).unwrap();

        let mut samples = [0.0f32; 16];
        plugin.scope_data(0, &mut samples); // enable
        let mut out = [0i16; 256];
        plugin.read(&mut out);
        plugin.close();

        // Post-mortem inspection still sees the captured tail
        assert!(plugin.scope_data(0, &mut samples) > 0);
    }
}
