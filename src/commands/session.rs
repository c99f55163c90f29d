//! Commands that talk to a target

use avrisp_core::part::Part;
use avrisp_core::programmer::AvrProgrammer;
use avrisp_core::protocol::avr;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Bring the target into programming mode, run `f`, then release the
/// programmer
///
/// The programmer is closed whatever `f` returns; closing never replaces
/// the error that ended the session.
pub fn with_session<P, F>(pgm: &mut P, part: &Part, f: F) -> CmdResult
where
    P: AvrProgrammer + ?Sized,
    F: FnOnce(&mut P, &Part) -> CmdResult,
{
    pgm.display("");
    pgm.enable();
    pgm.powerup();

    let result = match pgm.initialize(part) {
        Ok(()) => {
            log::info!("AVR device initialized and ready to accept instructions");
            f(pgm, part)
        }
        Err(e) => Err(e.into()),
    };

    pgm.powerdown();
    pgm.disable();
    pgm.close();

    result
}

/// Read the signature and compare it with the part
fn verify_signature<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part, force: bool) -> CmdResult {
    let sig = avr::read_signature(pgm, part)?;
    println!(
        "Device signature = {:02X} {:02X} {:02X}",
        sig[0], sig[1], sig[2]
    );

    match avr::check_signature(part, sig) {
        Ok(()) => {
            println!("Found {}", part.name);
            Ok(())
        }
        Err(e) if force => {
            log::warn!("{} (continuing because of --force)", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Enter programming mode and check the device signature
pub fn run_probe<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part, force: bool) -> CmdResult {
    with_session(pgm, part, |pgm, part| verify_signature(pgm, part, force))
}

/// Erase the chip
pub fn run_erase<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part, force: bool) -> CmdResult {
    with_session(pgm, part, |pgm, part| {
        verify_signature(pgm, part, force)?;
        log::info!("Erasing chip");
        pgm.chip_erase(part)?;
        println!("Chip erased");
        Ok(())
    })
}

/// Show signature, fuses and lock byte
pub fn run_info<P: AvrProgrammer + ?Sized>(pgm: &mut P, part: &Part) -> CmdResult {
    with_session(pgm, part, |pgm, part| {
        verify_signature(pgm, part, true)?;
        let fuses = avr::read_fuses(pgm, part)?;

        let show = |name: &str, value: Option<u8>| match value {
            Some(v) => println!("{:<10} 0x{:02X}", name, v),
            None => println!("{:<10} -", name),
        };
        show("lfuse", fuses.low);
        show("hfuse", fuses.high);
        show("efuse", fuses.ext);
        show("lock", fuses.lock);
        println!("{:<10} {}", "ops", op_names(part));
        Ok(())
    })
}

/// Names of the operations the part has templates for
fn op_names(part: &Part) -> String {
    part.ops()
        .map(|(op, _)| op.name())
        .collect::<Vec<_>>()
        .join(", ")
}
