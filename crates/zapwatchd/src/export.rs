//! CSV export of error logs

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Local};
use zapwatch_common::ErrorLogRecord;

/// Column order of every export, written even when there are no rows
pub const CSV_HEADER: [&str; 6] = [
    "id",
    "zap_name",
    "error_message",
    "explanation",
    "timestamp",
    "status",
];

/// Render `records` as CSV with a header row
pub fn render_csv(records: &[ErrorLogRecord]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}

/// Attachment name, e.g. `zapier_logs_20240501_093000.csv`
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("zapier_logs_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("CSV export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use zapwatch_common::LogStatus;

    fn record(id: i64, explanation: Option<&str>) -> ErrorLogRecord {
        ErrorLogRecord {
            id,
            source_name: "Sync CRM".to_string(),
            error_message: "Field \"email\", missing".to_string(),
            explanation: explanation.map(str::to_string),
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            status: LogStatus::Dismissed,
        }
    }

    #[test]
    fn test_empty_export_has_header() {
        let csv = String::from_utf8(render_csv(&[]).unwrap()).unwrap();
        assert_eq!(
            csv,
            "id,zap_name,error_message,explanation,timestamp,status\n"
        );
    }

    #[test]
    fn test_rows_follow_header() {
        let csv = String::from_utf8(render_csv(&[record(3, Some("Check mappings")), record(1, None)]).unwrap())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "3,Sync CRM,\"Field \"\"email\"\", missing\",Check mappings,2024-05-01 09:30:00,dismissed"
        );
        // Null explanation is an empty field
        assert_eq!(
            lines[2],
            "1,Sync CRM,\"Field \"\"email\"\", missing\",,2024-05-01 09:30:00,dismissed"
        );
    }

    #[test]
    fn test_export_filename() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(export_filename(now), "zapier_logs_20240501_090307.csv");
    }
}
