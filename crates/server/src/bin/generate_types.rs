//! Run with: cargo run --package server --bin generate-types --features typescript

use std::fs;
use std::path::Path;

fn main() {
    println!("Generating TypeScript types...");

    let out_dir = Path::new("frontend/src/types/generated");

    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    #[cfg(feature = "typescript")]
    {
        if let Err(e) = export_all(out_dir) {
            eprintln!("Failed to export types: {}", e);
            std::process::exit(1);
        }
        println!("Types exported to {}", out_dir.display());

        if let Err(e) = generate_index(out_dir) {
            eprintln!("Failed to write index.ts: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "typescript"))]
    {
        eprintln!("Error: typescript feature is not enabled");
        eprintln!("Run with: cargo run --package server --bin generate-types --features typescript");
        std::process::exit(1);
    }
}

#[cfg(feature = "typescript")]
const EXPORTED: &[&str] = &[
    "Participant",
    "RoundPhase",
    "SessionStatus",
    "SessionSnapshot",
    "EntryKind",
    "TranscriptEntry",
    "ObserverMessage",
    "WinnerResponse",
];

#[cfg(feature = "typescript")]
fn export_all(out_dir: &Path) -> Result<(), ts_rs::ExportError> {
    use ts_rs::TS;

    arena_core::Participant::export_all_to(out_dir)?;
    arena_core::RoundPhase::export_all_to(out_dir)?;
    arena_core::SessionStatus::export_all_to(out_dir)?;
    arena_core::SessionSnapshot::export_all_to(out_dir)?;
    arena_core::EntryKind::export_all_to(out_dir)?;
    arena_core::TranscriptEntry::export_all_to(out_dir)?;

    events::ObserverMessage::export_all_to(out_dir)?;

    server::routes::WinnerResponse::export_all_to(out_dir)?;
    Ok(())
}

#[cfg(feature = "typescript")]
fn generate_index(out_dir: &Path) -> std::io::Result<()> {
    let index_path = out_dir.join("index.ts");

    let mut exports = String::from(
        "// Auto-generated - regenerate with: cargo run --package server --bin generate-types --features typescript\n\n",
    );
    for name in EXPORTED {
        exports.push_str(&format!("export * from './{}';\n", name));
    }

    fs::write(&index_path, exports)?;
    println!("Generated {}", index_path.display());
    Ok(())
}
