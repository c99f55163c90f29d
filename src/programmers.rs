//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion, and opens a programmer from its command line
//! option string.

use avrisp_core::programmer::AvrProgrammer;
use std::collections::HashSet;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linuxspi", "linux-spi"],
        description:
            "Linux spidev + sysfs GPIO reset (dev=/dev/spidevX.Y,reset=<gpio>,baudrate=<Hz>)",
    });

    programmers
}

/// Parsed programmer parameters
#[derive(Debug)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters, in command line order
    pub params: Vec<(String, String)>,
}

impl ProgrammerParams {
    /// Parameters as borrowed pairs, the form backends take
    pub fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut seen = HashSet::new();
    let mut params = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            let Some((key, value)) = opt.split_once('=') else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            };
            if !seen.insert(key) {
                return Err(format!("Parameter '{}' given more than once", key).into());
            }
            params.push((key.to_string(), value.to_string()));
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a programmer from its command line option string
///
/// # Example
/// ```ignore
/// let mut pgm = open_programmer("linux_spi:dev=/dev/spidev0.0,reset=25")?;
/// pgm.initialize(part)?;
/// ```
pub fn open_programmer(
    programmer: &str,
) -> Result<Box<dyn AvrProgrammer>, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    #[allow(unused_variables)]
    let options = params.as_pairs();

    match params.name.as_str() {
        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linuxspi" | "linux-spi" => avrisp_linux_spi::open_linux_spi(&options),

        _ => Err(format!("Unknown programmer: {}", params.name).into()),
    }
}
