use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DEFAULT_OUTPUT_STEM: &str = "converted_tana_paste";

fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Writes one unit as `<stem>.txt`, several as `<stem>.zip` with `<name>_part_<n>.txt` entries.
pub fn write_units(units: &[String], stem: &Path) -> Result<PathBuf> {
    if units.is_empty() {
        bail!("empty input: nothing to write");
    }
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating output dir: {}", parent.display()))?;
    }

    if let [unit] = units {
        let path = with_extension(stem, "txt");
        fs::write(&path, unit).with_context(|| format!("writing output file: {}", path.display()))?;
        return Ok(path);
    }

    let path = with_extension(stem, "zip");
    let entry_base = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT_STEM.to_string());
    let file = File::create(&path).with_context(|| format!("creating archive: {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (i, unit) in units.iter().enumerate() {
        let name = format!("{}_part_{}.txt", entry_base, i + 1);
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("adding {} to archive", name))?;
        zip.write_all(unit.as_bytes())?;
    }
    zip.finish().context("finishing archive")?;
    Ok(path)
}
