//! Init-mode argv/env transport: a length-prefixed reader over a paravirtual
//! character device (§4.2). Out of scope in container modes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::time::Duration;

use tracing::{debug, error, warn};

/// Well-known serial/virtio-port device the host writes argv/env to.
const TRANSPORT_DEVICE: &str = "/dev/vport0p1";

/// Per-entry and per-block bounds guarding the length-prefixed reads against
/// a corrupted or hostile channel (Design Notes, Ownership of buffers).
const MAX_ENTRY_LEN: u32 = 1 << 20;
const MAX_ENTRIES: u32 = 65536;

/// The fallback argv used when the transport device can't be opened or the
/// wire violates the length bounds. Developer escape hatch only.
fn debug_fallback_argv() -> Vec<String> {
    vec![
        "sandbox".to_string(),
        "--verbose".to_string(),
        "--workspace".to_string(),
        "9p/workspace:/workspace".to_string(),
        "/bin/bash".to_string(),
    ]
}

pub struct LaunchSpec {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Read a single `u32` LE, retrying on short reads.
fn read_u32(f: &mut File) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_patient(f, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Like `Read::read_exact`, but tolerant of short reads from a character
/// device: loop until the full count is accumulated, sleeping briefly
/// between partial reads instead of treating them as EOF/error.
fn read_exact_patient(f: &mut File, buf: &mut [u8]) -> std::io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match f.read(&mut buf[filled..]) {
            Ok(0) => std::thread::sleep(Duration::from_millis(10)),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn read_length_prefixed_block(f: &mut File, max_entries: u32) -> std::io::Result<Vec<String>> {
    let count = read_u32(f)?;
    if count > max_entries {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("transport block claims {count} entries, exceeds bound {max_entries}"),
        ));
    }
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = read_u32(f)?;
        if len > MAX_ENTRY_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("transport entry claims {len} bytes, exceeds bound {MAX_ENTRY_LEN}"),
            ));
        }
        let mut bytes = vec![0u8; len as usize];
        read_exact_patient(f, &mut bytes)?;
        out.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(out)
}

fn read_spec(f: &mut File) -> std::io::Result<LaunchSpec> {
    let mut argv = vec!["sandbox".to_string()];
    argv.extend(read_length_prefixed_block(f, MAX_ENTRIES)?);

    let env_entries = read_length_prefixed_block(f, MAX_ENTRIES)?;
    let env = env_entries
        .into_iter()
        .filter_map(|entry| entry.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect();

    f.write_all(&[0u8])?;
    Ok(LaunchSpec { argv, env })
}

/// Read argv/env from the transport device, falling back to the debug argv
/// on open failure or a malformed wire.
pub fn read_launch_spec() -> LaunchSpec {
    match OpenOptions::new().read(true).write(true).open(TRANSPORT_DEVICE) {
        Ok(mut f) => match read_spec(&mut f) {
            Ok(spec) => {
                debug!(argv = ?spec.argv, env_count = spec.env.len(), "read launch spec from transport");
                spec
            }
            Err(e) => {
                error!(error = %e, "malformed transport wire, falling back to debug argv");
                LaunchSpec {
                    argv: debug_fallback_argv(),
                    env: Vec::new(),
                }
            }
        },
        Err(e) => {
            warn!(error = %e, device = TRANSPORT_DEVICE, "could not open transport device, falling back to debug argv");
            LaunchSpec {
                argv: debug_fallback_argv(),
                env: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, SeekFrom};

    // read_length_prefixed_block/read_u32 take a `File`; exercise the pure
    // parsing logic directly against an in-memory buffer instead.
    fn parse_block(bytes: &[u8], max_entries: u32) -> std::io::Result<Vec<String>> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut count_buf = [0u8; 4];
        cursor.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf);
        if count > max_entries {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "too many entries"));
        }
        let mut out = Vec::new();
        for _ in 0..count {
            let mut len_buf = [0u8; 4];
            cursor.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf);
            if len > MAX_ENTRY_LEN {
                return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "entry too long"));
            }
            let mut data = vec![0u8; len as usize];
            cursor.read_exact(&mut data)?;
            out.push(String::from_utf8_lossy(&data).into_owned());
        }
        let _ = cursor.seek(SeekFrom::Current(0));
        Ok(out)
    }

    #[test]
    fn parses_two_entries() {
        let mut bytes = vec![2, 0, 0, 0];
        for s in ["hello", "world"] {
            bytes.extend((s.len() as u32).to_le_bytes());
            bytes.extend(s.as_bytes());
        }
        let parsed = parse_block(&bytes, MAX_ENTRIES).unwrap();
        assert_eq!(parsed, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn rejects_entry_count_over_bound() {
        let bytes = (MAX_ENTRIES + 1).to_le_bytes().to_vec();
        assert!(parse_block(&bytes, MAX_ENTRIES).is_err());
    }

    #[test]
    fn debug_fallback_has_expected_shape() {
        let argv = debug_fallback_argv();
        assert_eq!(argv[0], "sandbox");
        assert!(argv.contains(&"--verbose".to_string()));
        assert_eq!(argv.last().unwrap(), "/bin/bash");
    }
}
