use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use fx_algo_core::Bar;
use std::fs::File;
use std::path::Path;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes bars to a CSV file.
    ///
    /// Format: time,open,high,low,close,tick_volume,spread,real_volume
    /// with `time` in unix seconds. Rows are written oldest first.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_bars(path: impl AsRef<Path>, bars: &[Bar]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|b| b.time);

        for bar in &sorted {
            writer.serialize(bar)?;
        }

        writer.flush()?;
        tracing::debug!(path = %path.display(), rows = sorted.len(), "Wrote bars");
        Ok(())
    }

    /// Reads bars from a CSV file, sorted ascending by time.
    ///
    /// `tick_volume`, `spread` and `real_volume` are optional columns and
    /// read as 0 when absent.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row fails to parse
    pub fn read_bars(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<Bar>().enumerate() {
            let bar = record.with_context(|| {
                format!("Failed to parse row {} of {}", line + 1, path.display())
            })?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.time);
        tracing::debug!(path = %path.display(), rows = bars.len(), "Read bars");
        Ok(bars)
    }
}
