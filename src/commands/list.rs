//! List commands implementation

use avrisp_core::part::{PartDatabase, PartFlags};

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();

    for p in programmers::available_programmers() {
        println!("  {:10} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", p.aliases.join(", "));
        }
    }
}

/// List all parts in the database
pub fn list_parts(db: &PartDatabase, filter: Option<&str>) {
    println!("Known parts:");
    println!();
    println!("{:<8} {:<14} {:>10} {:>12}  Interface", "Id", "Name", "Signature", "Erase delay");
    println!("{}", "-".repeat(60));

    for part in db.iter() {
        if let Some(filter) = filter {
            let filter = filter.to_lowercase();
            if !part.id.to_lowercase().contains(&filter)
                && !part.name.to_lowercase().contains(&filter)
            {
                continue;
            }
        }

        let sig = format!(
            "{:02X}{:02X}{:02X}",
            part.signature[0], part.signature[1], part.signature[2]
        );
        let delay = format!("{} us", part.chip_erase_delay.as_micros());

        println!(
            "{:<8} {:<14} {:>10} {:>12}  {}",
            part.id,
            part.name,
            sig,
            delay,
            interface_name(part.flags)
        );
    }
}

fn interface_name(flags: PartFlags) -> &'static str {
    if flags.contains(PartFlags::TPI) {
        "TPI"
    } else if flags.contains(PartFlags::PDI) {
        "PDI"
    } else if flags.contains(PartFlags::UPDI) {
        "UPDI"
    } else {
        "ISP"
    }
}
