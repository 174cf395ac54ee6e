//! Generic file sink (§4.7): open/rotate/size-cap/maxparts retention, with
//! the wire format (binary vs. text) supplied by a [`FileFormat`]
//! implementation so [`TextProtocol`](super::text_protocol) can reuse all of
//! this machinery.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};
use time::OffsetDateTime;

use crate::error::{SiError, SiResult};
use crate::options::LookupTable;
use crate::packet::Packet;
use crate::protocol::crypto::{self, StreamEncryptor, IV_LEN, KEY_LEN};
use crate::protocol::rotater::{FileRotater, RotateMode};
use crate::protocol::{is_base_option, BaseOptions, Protocol};

/// Per-packet-type serialization, plus the file's header/footer and default
/// filename: the extension point that turns this generic file protocol into
/// a binary (`.sil`) or text (`.log`) sink.
pub trait FileFormat: Send {
    fn default_filename(&self) -> &str;
    fn write_header(&mut self, file: &mut dyn Write, current_size: u64) -> io::Result<()>;
    fn write_footer(&mut self, file: &mut dyn Write) -> io::Result<()>;
    fn encode(&mut self, packet: &Packet) -> Vec<u8>;
}

/// Binary `.sil` files open with an 8-byte signature (`"SILF"` + `u32`
/// version) and are otherwise exactly the wire format (§6).
pub struct BinaryFileFormat {
    formatter: crate::wire::BinaryFormatter,
}

impl BinaryFileFormat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            formatter: crate::wire::BinaryFormatter::new(),
        }
    }
}

impl Default for BinaryFileFormat {
    fn default() -> Self {
        Self::new()
    }
}

const SIGNATURE: &[u8; 4] = b"SILF";
const SIGNATURE_VERSION: u32 = 1;

impl FileFormat for BinaryFileFormat {
    fn default_filename(&self) -> &str {
        "log.sil"
    }

    fn write_header(&mut self, file: &mut dyn Write, current_size: u64) -> io::Result<()> {
        if current_size == 0 {
            file.write_all(SIGNATURE)?;
            file.write_all(&SIGNATURE_VERSION.to_le_bytes())?;
        }
        Ok(())
    }

    fn write_footer(&mut self, _file: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn encode(&mut self, packet: &Packet) -> Vec<u8> {
        self.formatter.encode(packet).to_vec()
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Encrypted(BufWriter<File>, StreamEncryptor),
}

impl Sink {
    /// Writes `bytes` through the sink and returns how many bytes actually
    /// landed in the underlying file. For the plain sink this is
    /// `bytes.len()`; for the encrypted sink it is the ciphertext emitted by
    /// this call, which can be less than `bytes.len()` while a partial block
    /// is held back for the next call (§4.7: `maxsize` must account for
    /// encrypted, not plaintext, bytes).
    fn write_body(&mut self, bytes: &[u8]) -> io::Result<u64> {
        match self {
            Self::Plain(w) => {
                w.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            Self::Encrypted(w, enc) => {
                let ciphertext = enc.update(bytes);
                w.write_all(&ciphertext)?;
                Ok(ciphertext.len() as u64)
            }
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut w) => w.flush(),
            Self::Encrypted(mut w, enc) => {
                let tail = enc.finish();
                w.write_all(&tail)?;
                w.flush()
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Encrypted(w, _) => w.flush(),
        }
    }
}

/// The generic file sink. Rotation and size-cap checks run before every
/// write (§4.7); `F` supplies the wire format.
pub struct FileProtocol<F: FileFormat> {
    format: F,
    base: BaseOptions,
    filename: String,
    append: bool,
    rotater: FileRotater,
    maxsize: u64,
    maxparts: u64,
    key: Option<[u8; KEY_LEN]>,
    encrypt: bool,
    sink: Option<Sink>,
    current_path: Option<PathBuf>,
    current_size: u64,
}

impl<F: FileFormat> FileProtocol<F> {
    /// Builds a protocol from parsed options. `encrypt_allowed=false` lets
    /// [`TextProtocol`](super::text_protocol) reject `encrypt`/`key` per §4.7.
    pub fn from_table(mut format: F, table: &LookupTable, encrypt_allowed: bool) -> SiResult<Self> {
        let base = BaseOptions::from_table("file", table);
        let default_filename = format.default_filename().to_string();
        let filename = table.get_string("filename", &default_filename);
        let append = table.get_bool("append", false);
        let rotate = RotateMode::parse(&table.get_string("rotate", "none"));
        let maxsize = table.get_size("maxsize", 0);
        let maxparts = table.get_integer("maxparts", 2).max(0) as u64;
        let encrypt = table.get_bool("encrypt", false);

        if encrypt && !encrypt_allowed {
            return Err(SiError::Usage("text protocol does not support encrypt/key"));
        }
        let key = if encrypt {
            let bytes = table.get_bytes("key", KEY_LEN);
            let mut arr = [0u8; KEY_LEN];
            arr.copy_from_slice(&bytes);
            Some(arr)
        } else {
            None
        };

        Ok(Self {
            format,
            base,
            filename,
            append,
            rotater: FileRotater::new(rotate),
            maxsize,
            maxparts,
            key,
            encrypt,
            sink: None,
            current_path: None,
            current_size: 0,
        })
    }

    fn rotating(&self) -> bool {
        self.rotater.mode() != RotateMode::None || self.maxsize > 0
    }

    /// Builds the path for a new rotated file. Size-cap rotation can reopen
    /// several times within the same wall-clock second, so the second-
    /// granularity timestamp alone isn't enough to keep files distinct: if
    /// the stamped name already exists, an incrementing numeric suffix
    /// (`-1`, `-2`, ...) is appended until a free name is found, the same
    /// disambiguation the original SmartInspect uses.
    fn target_path(&self, now: OffsetDateTime) -> PathBuf {
        if !self.rotating() {
            return PathBuf::from(&self.filename);
        }
        let path = Path::new(&self.filename);
        let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
        let stem = path.with_extension("");
        let stamp = format!(
            "-{:04}-{:02}-{:02}-{:02}-{:02}-{:02}",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute(),
            now.second()
        );

        let build = |suffix: &str| {
            let mut name = stem.clone().into_os_string();
            name.push(&stamp);
            name.push(suffix);
            name.push(&ext);
            PathBuf::from(name)
        };

        let candidate = build("");
        if !candidate.exists() {
            return candidate;
        }
        let mut counter: u32 = 1;
        loop {
            let candidate = build(&format!("-{counter}"));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    fn open_at(&mut self, path: PathBuf) -> SiResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if self.append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        let file = options
            .open(&path)
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        let mut writer = BufWriter::new(file);
        self.format
            .write_header(&mut writer, current_size)
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;

        let mut current_size = current_size;
        self.sink = Some(if self.encrypt {
            let key = self.key.expect("encrypt implies key is set");
            let iv = crypto::random_iv();
            writer
                .write_all(&iv)
                .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;
            // the IV counts toward the file's size cap just like any other
            // encrypted-stream byte (§4.7: "maxsize accounts for encrypted
            // bytes").
            current_size += IV_LEN as u64;
            Sink::Encrypted(writer, StreamEncryptor::new(&key, &iv))
        } else {
            Sink::Plain(writer)
        });
        self.current_size = current_size;
        debug!("file sink {} opened {}", self.base.caption, path.display());
        self.current_path = Some(path);
        self.prune_old_parts();
        Ok(())
    }

    fn prune_old_parts(&self) {
        if self.maxparts == 0 || !self.rotating() {
            return;
        }
        let Some(current) = &self.current_path else { return };
        let Some(dir) = current.parent() else { return };
        let stem = Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let Ok(read_dir) = fs::read_dir(dir) else { return };
        let mut matches: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&format!("{stem}-")))
                    .unwrap_or(false)
            })
            .collect();
        // Lexical filename order breaks once a collision counter is
        // appended (`-00-1.ext` sorts before `-00.ext`), so order by actual
        // modification time instead; falls back to filename order for
        // filesystems that don't report it.
        matches.sort_by_key(|p| {
            let mtime = fs::metadata(p).and_then(|m| m.modified()).ok();
            (mtime, p.clone())
        });
        while matches.len() as u64 > self.maxparts {
            let oldest = matches.remove(0);
            trace!("pruning retired part {}", oldest.display());
            let _ = fs::remove_file(oldest);
        }
    }

    fn reopen(&mut self, now: OffsetDateTime) -> SiResult<()> {
        if let Some(sink) = self.sink.take() {
            let _ = sink.finish();
        }
        let path = self.target_path(now);
        self.open_at(path)
    }
}

impl<F: FileFormat> Protocol for FileProtocol<F> {
    fn name(&self) -> &str {
        "file"
    }

    fn caption(&self) -> &str {
        &self.base.caption
    }

    fn is_valid_option(&self, key: &str) -> bool {
        is_base_option(key)
            || matches!(
                key.to_ascii_lowercase().as_str(),
                "filename" | "append" | "buffer" | "rotate" | "maxsize" | "maxparts" | "key" | "encrypt"
            )
    }

    fn connect(&mut self) -> SiResult<()> {
        let now = OffsetDateTime::now_utc();
        self.reopen(now)
    }

    fn write_packet(&mut self, packet: &Packet) -> SiResult<()> {
        if !self.base.passes_level_gate(packet) {
            return Ok(());
        }
        if self.sink.is_none() {
            self.connect()?;
        }

        let now = OffsetDateTime::now_utc();
        if self.rotater.update(now) {
            self.reopen(now)?;
        }

        let bytes = self.format.encode(packet);
        if self.maxsize > 0 && self.current_size + bytes.len() as u64 > self.maxsize {
            self.reopen(now)?;
        }

        let sink = self.sink.as_mut().ok_or_else(|| SiError::Closed(self.base.caption.clone()))?;
        let written = sink.write_body(&bytes)?;
        sink.flush()?;
        self.current_size += written;
        Ok(())
    }

    fn disconnect(&mut self) -> SiResult<()> {
        if let Some(mut sink) = self.sink.take() {
            if let Sink::Plain(ref mut w) = sink {
                self.format.write_footer(w)?;
            }
            sink.finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::packet::LogEntry;
    use tempfile::tempdir;

    fn opts(pairs: &[(&str, &str)]) -> LookupTable {
        LookupTable::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn writes_binary_signature_on_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.sil");
        let table = opts(&[("filename", path.to_str().unwrap())]);
        let mut proto = FileProtocol::from_table(BinaryFileFormat::new(), &table, true).unwrap();
        proto.connect().unwrap();
        proto.write_packet(&Packet::from(LogEntry::new(0, "hi"))).unwrap();
        proto.disconnect().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"SILF");
    }

    #[test]
    fn level_gate_drops_below_threshold_packets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.sil");
        let table = opts(&[("filename", path.to_str().unwrap()), ("level", "warning")]);
        let mut proto = FileProtocol::from_table(BinaryFileFormat::new(), &table, true).unwrap();
        proto.connect().unwrap();
        let mut below = LogEntry::new(0, "dropped");
        below.level = Level::Debug;
        proto.write_packet(&Packet::from(below)).unwrap();
        proto.disconnect().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8); // signature + version only, no payload
    }

    #[test]
    fn maxparts_retention_keeps_only_newest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.sil");
        let table = opts(&[
            ("filename", path.to_str().unwrap()),
            ("rotate", "daily"),
            ("maxparts", "2"),
        ]);
        let mut proto = FileProtocol::from_table(BinaryFileFormat::new(), &table, true).unwrap();
        for day in 1..=4 {
            let now = time::macros::datetime!(2024-01-01 00:00:00 UTC) + time::Duration::days(day);
            proto.reopen(now).unwrap();
        }
        proto.disconnect().unwrap();

        let remaining: Vec<_> = fs::read_dir(dir.path()).unwrap().filter_map(Result::ok).collect();
        assert_eq!(remaining.len(), 2);
    }
}
