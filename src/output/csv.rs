//! CSV input and output for the batch driver.

use crate::error::{Error, Result};
use crate::processing::{allocate_batch, Allocator, BatchResult, BatchRow};
use std::io::{Read, Write};
use std::path::Path;

const NAME_COLUMN: &str = "customer_name";
const HOSTS_COLUMN: &str = "num_hosts";

/// Read `customer_name,num_hosts` rows.
///
/// Only a bad header fails the whole read. A short or undecodable record
/// still yields a row, marked unreadable, so every input line gets a result.
pub fn read_requests<R: Read>(input: R) -> Result<Vec<BatchRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::InvalidRequest(format!("input has no '{name}' column")))
    };
    let name_at = column(NAME_COLUMN)?;
    let hosts_at = column(HOSTS_COLUMN)?;

    let mut rows = Vec::new();
    for (i, record) in reader.byte_records().enumerate() {
        let record = record?;
        let row = match (record.get(name_at), record.get(hosts_at)) {
            (Some(name), Some(hosts)) => {
                match (std::str::from_utf8(name), std::str::from_utf8(hosts)) {
                    (Ok(name), Ok(hosts)) => BatchRow::new(name, hosts),
                    _ => BatchRow::unreadable(
                        &lossy(Some(name)),
                        &lossy(Some(hosts)),
                        format!("record {} is not valid UTF-8", i + 1),
                    ),
                }
            }
            (name, hosts) => BatchRow::unreadable(
                &lossy(name),
                &lossy(hosts),
                format!("record {} has {} fields", i + 1, record.len()),
            ),
        };
        if let Some(reason) = &row.unreadable {
            log::warn!("Unreadable input row: {reason}");
        }
        rows.push(row);
    }
    Ok(rows)
}

fn lossy(field: Option<&[u8]>) -> String {
    field
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .unwrap_or_default()
}

/// Write `customer_name,num_hosts,allocated_subnet` rows with a header.
pub fn write_results<W: Write>(output: W, results: &[BatchResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    if results.is_empty() {
        writer.write_record(["customer_name", "num_hosts", "allocated_subnet"])?;
    }
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// Default output file name, stamped with today's date.
pub fn default_output_file() -> String {
    let now = chrono::Local::now();
    format!("allocations_{}.csv", now.format("%Y-%m-%d"))
}

/// Allocate every request in `input` from a fresh local allocator over `parent`
/// and write the results to `output`.
pub async fn run_batch_files(parent: &str, input: &Path, output: &Path) -> Result<Vec<BatchResult>> {
    log::info!(
        "Batch allocating from {parent}: {} -> {}",
        input.display(),
        output.display()
    );
    let allocator = Allocator::local(parent)?;
    let rows = read_requests(std::fs::File::open(input)?)?;
    log::info!("Read {} requests from {}", rows.len(), input.display());

    let results = allocate_batch(&allocator, rows).await;
    write_results(std::fs::File::create(output)?, &results)?;
    log::info!("Allocation results saved to {}", output.display());
    Ok(results)
}
