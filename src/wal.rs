use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::Event;

/// Largest frame payload. Writes above it are refused; on recovery a larger
/// length prefix is treated as corruption, not allocated.
pub(crate) const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "event too large"));
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "event too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Read until `buf` is full or EOF. Returns the number of bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Result of scanning a log file.
#[derive(Debug, Default)]
pub struct Recovered {
    pub events: Vec<Event>,
    /// Byte length of the intact prefix.
    pub valid_len: u64,
    /// Bytes after the intact prefix (a torn or corrupt tail).
    pub discarded: u64,
}

fn scan(path: &Path) -> io::Result<Recovered> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Recovered::default()),
        Err(e) => return Err(e),
    };
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut recovered = Recovered::default();

    loop {
        let mut len_buf = [0u8; 4];
        if read_full(&mut reader, &mut len_buf)? < len_buf.len() {
            break;
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            break;
        }

        let mut payload = vec![0u8; len];
        if read_full(&mut reader, &mut payload)? < len {
            break;
        }
        let mut crc_buf = [0u8; 4];
        if read_full(&mut reader, &mut crc_buf)? < crc_buf.len() {
            break;
        }
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            break;
        }
        let Ok(event) = bincode::deserialize::<Event>(&payload) else {
            break;
        };
        recovered.events.push(event);
        recovered.valid_len += (len + 8) as u64;
    }

    recovered.discarded = file_len - recovered.valid_len;
    Ok(recovered)
}

/// Append-only Write-Ahead Log.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - A torn last entry (crash mid-write) is cut off when the log is recovered.
///
/// Appends are staged in memory and written by [`Wal::commit`], so a batch
/// reaches the file whole or not at all.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Length of the durable, intact log.
    len: u64,
    staged: Vec<u8>,
    staged_count: u64,
    appends_since_compact: u64,
}

impl Wal {
    fn open_at(path: &Path, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
            staged: Vec::new(),
            staged_count: 0,
            appends_since_compact: 0,
        })
    }

    /// Open (or create) the WAL at `path`, returning every intact event.
    /// Anything after the last intact entry is truncated away so new appends
    /// never land behind garbage.
    pub fn recover(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let recovered = scan(path)?;
        let wal = Self::open_at(path, recovered.valid_len)?;
        if recovered.discarded > 0 {
            warn!(
                path = %path.display(),
                bytes = recovered.discarded,
                "truncating torn WAL tail"
            );
            wal.file.set_len(recovered.valid_len)?;
            wal.file.sync_all()?;
        }
        Ok((wal, recovered.events))
    }

    /// Replay the WAL from disk without opening it for writing.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Ok(scan(path)?.events)
    }

    /// Stage an event for the next commit. Nothing touches the file yet.
    pub fn stage(&mut self, event: &Event) -> io::Result<()> {
        let mark = self.staged.len();
        if let Err(e) = encode_event(&mut self.staged, event) {
            self.staged.truncate(mark);
            return Err(e);
        }
        self.staged_count += 1;
        Ok(())
    }

    /// Drop everything staged since the last commit.
    pub fn discard(&mut self) {
        self.staged.clear();
        self.staged_count = 0;
    }

    /// Write and fsync everything staged. On failure the file is cut back to
    /// its last durable length and the staged events are dropped.
    pub fn commit(&mut self) -> io::Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let result = self
            .file
            .write_all(&self.staged)
            .and_then(|()| self.file.sync_data());
        match result {
            Ok(()) => {
                self.len += self.staged.len() as u64;
                self.appends_since_compact += self.staged_count;
                self.discard();
                Ok(())
            }
            Err(e) => {
                self.discard();
                if let Err(rollback) = self.file.set_len(self.len) {
                    warn!(path = %self.path.display(), "WAL rollback failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    /// Stage and commit a single event.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.stage(event)?;
        self.commit()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log with `events`: written to a temp file, fsynced, then
    /// renamed over the live log.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let len = fs::metadata(&self.path)?.len();
        *self = Self::open_at(&self.path, len)?;
        Ok(())
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }
}
