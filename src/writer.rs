//! CSV output.
//!
//! The file starts with a UTF-8 byte-order mark so spreadsheet tools pick
//! the right encoding for non-ASCII camera names.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::normalize::CameraRecord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialize `records` to `out`, header row first.
pub fn write_csv<W: Write>(mut out: W, records: &[CameraRecord]) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut wtr = csv::Writer::from_writer(out);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create or truncate `path` and write `records` to it.
pub fn write_records(path: &Path, records: &[CameraRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(branch: &str, name: &str) -> CameraRecord {
        CameraRecord {
            branch:       branch.into(),
            camera_id:    "101".into(),
            camera_name:  name.into(),
            enabled:      "true".into(),
            codec:        "H.264".into(),
            resolution:   "1920*1080".into(),
            last_checked: "2024-03-01T09:30:15.000042".into(),
        }
    }

    #[test]
    fn bom_header_and_rows() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[record("München", "Camera Tür"), record("Köln", "Hof, Süd")]).unwrap();

        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Branch,CameraID,CameraName,Enabled,Codec,Resolution,LastChecked"
        );
        assert_eq!(
            lines[1],
            "München,101,Camera Tür,true,H.264,1920*1080,2024-03-01T09:30:15.000042"
        );
        assert!(lines[2].starts_with("Köln,101,\"Hof, Süd\","));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale contents that are longer than nothing\n".repeat(50)).unwrap();

        write_records(&path, &[record("A", "x")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("stale"));
    }
}
