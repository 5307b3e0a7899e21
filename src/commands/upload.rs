use crate::console::PushConsole;
use crate::upload::{AlignmentSubmission, CenterPosition, TemplateFile, UploadOutcome};

/// Put a file from disk into the template slot
pub async fn select_template_file(console: &PushConsole, path: String) -> Result<String, String> {
    let file = TemplateFile::from_path(&path).map_err(|e| {
        log::error!("Failed to read template {}: {}", path, e);
        format!("Failed to read template: {}", e)
    })?;

    let filename = file.filename.clone();
    console.select_template(file).await;
    Ok(filename)
}

/// Upload the selected template, downsampled when `compress` is set
pub async fn upload_template(console: &PushConsole, compress: bool) -> Result<UploadOutcome, String> {
    console
        .upload_template(compress)
        .await
        .map_err(|e| e.to_string())
}

pub async fn submit_alignment(
    console: &PushConsole,
    person_ratio_percent: f64,
    center_position: String,
    face_center_offset_deg: f64,
) -> Result<UploadOutcome, String> {
    let center_position: CenterPosition = center_position.parse()?;

    console
        .submit_alignment(AlignmentSubmission {
            person_ratio_percent,
            center_position,
            face_center_offset_deg,
        })
        .await
        .map_err(|e| e.to_string())
}
