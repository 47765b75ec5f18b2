use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut types = Vec::new();

    // Channel and platform enums
    types.push(clean_type(MailChannel::export_to_string()?));
    types.push(clean_type(Platform::export_to_string()?));

    // Reservation types
    types.push(clean_type(ReservationRecord::export_to_string()?));
    types.push(clean_type(ReservationsResponse::export_to_string()?));

    // Sync run types
    types.push(clean_type(RunSummary::export_to_string()?));
    types.push(clean_type(SyncRunStatus::export_to_string()?));
    types.push(clean_type(SyncRun::export_to_string()?));
    types.push(clean_type(SyncRunsResponse::export_to_string()?));

    let output_dir = Path::new("../dashboard/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // SyncRun imports RunSummary and SyncRunStatus
    let lines: Vec<&str> = type_def.lines().collect();
    let has_import = lines
        .iter()
        .any(|line| line.trim().starts_with("import type"));

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with("import type") {
                return has_import;
            }
            // Filter out the generated comment line
            !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .cloned()
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
