use std::io::Write;

use serde::Serialize;

use super::repository::ApplicationRecord;

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write application export: {}", err),
            ExportError::Csv(err) => write!(f, "invalid application export data: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Serialize)]
struct ApplicationRow<'a> {
    #[serde(rename = "Application ID")]
    id: &'a str,
    #[serde(rename = "Company ID")]
    company_id: &'a str,
    #[serde(rename = "Applicant")]
    applicant: String,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Phone")]
    phone: &'a str,
    #[serde(rename = "License")]
    license: String,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Background Check")]
    background_check: &'static str,
    #[serde(rename = "Submitted At")]
    submitted_at: String,
}

impl<'a> From<&'a ApplicationRecord> for ApplicationRow<'a> {
    fn from(record: &'a ApplicationRecord) -> Self {
        Self {
            id: &record.id.0,
            company_id: &record.company_id.0,
            applicant: record.profile.full_name(),
            email: &record.profile.email,
            phone: &record.profile.phone,
            license: format!(
                "{} {}",
                record.profile.license_state, record.profile.license_number
            )
            .trim()
            .to_string(),
            status: record.status.label(),
            background_check: record.background_check.status.label(),
            submitted_at: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Write one CSV row per application, header first.
pub fn write_applications_csv<W: Write>(
    writer: W,
    records: &[ApplicationRecord],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    if records.is_empty() {
        csv_writer.write_record([
            "Application ID",
            "Company ID",
            "Applicant",
            "Email",
            "Phone",
            "License",
            "Status",
            "Background Check",
            "Submitted At",
        ])?;
    }

    for record in records {
        csv_writer.serialize(ApplicationRow::from(record))?;
    }

    csv_writer.flush()?;
    Ok(())
}
