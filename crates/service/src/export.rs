//! Credential sheets as `.xlsx` workbooks.

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::debug;

use crate::artifacts::{ArtifactStore, FileId};
use crate::credentials::GeneratedCredential;
use crate::errors::ServiceError;

pub const HEADER: [&str; 2] = ["Username", "Password"];
const COLUMN_WIDTH: f64 = 20.0;

/// Credential rows that fit under the header of one worksheet.
pub const MAX_DATA_ROWS: u64 = 1_048_575;

impl From<XlsxError> for ServiceError {
    fn from(e: XlsxError) -> Self {
        ServiceError::Internal(format!("workbook rendering failed: {e}"))
    }
}

/// One worksheet: header row, then one `username, password` row per credential.
pub fn render_workbook(credentials: &[GeneratedCredential]) -> Result<Vec<u8>, ServiceError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_column_width(0, COLUMN_WIDTH)?;
    sheet.set_column_width(1, COLUMN_WIDTH)?;
    sheet.write_string(0, 0, HEADER[0])?;
    sheet.write_string(0, 1, HEADER[1])?;

    for (i, cred) in credentials.iter().enumerate() {
        let row = u32::try_from(i + 1).map_err(|_| ServiceError::validation("too many rows for one worksheet"))?;
        sheet.write_string(row, 0, &cred.username)?;
        sheet.write_string(row, 1, &cred.password)?;
    }
    Ok(workbook.save_to_buffer()?)
}

/// Render and hand the workbook to `store`.
pub async fn export_credentials(
    store: &dyn ArtifactStore,
    credentials: &[GeneratedCredential],
) -> Result<FileId, ServiceError> {
    let bytes = render_workbook(credentials)?;
    store_workbook(store, bytes).await
}

pub(crate) async fn store_workbook(store: &dyn ArtifactStore, bytes: Vec<u8>) -> Result<FileId, ServiceError> {
    let size = bytes.len();
    let id = store.put(bytes).await?;
    debug!(file_id = %id, size, "workbook stored");
    Ok(id)
}
