//! Types command - List supported infrastructure types.

use anyhow::Result;

use iacgenius_core::InfraType;

pub fn execute() -> Result<()> {
    println!("Supported infrastructure types:");
    for infra_type in InfraType::ALL {
        println!(
            "  {:<14} {:<28} {}",
            infra_type.id(),
            infra_type.display_name(),
            infra_type.file_extension()
        );
    }
    Ok(())
}
