//! Part database for runtime loading and lookup
//!
//! Parts are described in RON. A copy of the stock database is compiled
//! into the crate and parsed on first use.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use ron::extensions::Extensions;

use super::flags::PartFlags;
use super::opcode::OpcodeTemplate;
use super::types::{AvrOp, Part};

/// Stock part definitions shipped with the crate
const BUILTIN_PARTS: &str = include_str!("../../parts/avr.ron");

static BUILTIN: Lazy<Result<PartDatabase, String>> =
    Lazy::new(|| PartDatabase::from_ron_str(BUILTIN_PARTS).map_err(|e| e.to_string()));

/// Error type for part database operations
#[derive(Debug)]
pub enum PartDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// Validation error
    Validation(String),
}

impl From<io::Error> for PartDbError {
    fn from(e: io::Error) -> Self {
        PartDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for PartDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        PartDbError::Parse(e)
    }
}

impl fmt::Display for PartDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartDbError::Io(e) => write!(f, "I/O error: {}", e),
            PartDbError::Parse(e) => write!(f, "Parse error: {}", e),
            PartDbError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for PartDbError {}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Interface flags (RON format)
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(default)]
struct FlagsDef {
    tpi: bool,
    pdi: bool,
    updi: bool,
}

impl From<FlagsDef> for PartFlags {
    fn from(def: FlagsDef) -> Self {
        let mut f = PartFlags::empty();
        if def.tpi {
            f |= PartFlags::TPI;
        }
        if def.pdi {
            f |= PartFlags::PDI;
        }
        if def.updi {
            f |= PartFlags::UPDI;
        }
        f
    }
}

/// Op-code templates (RON format), one string per operation
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct OpsDef {
    pgm_enable: Option<String>,
    chip_erase: Option<String>,
    read_sig: Option<String>,
    read_lfuse: Option<String>,
    read_hfuse: Option<String>,
    read_efuse: Option<String>,
    read_lock: Option<String>,
}

impl OpsDef {
    fn get(&self, op: AvrOp) -> Option<&str> {
        match op {
            AvrOp::ProgramEnable => self.pgm_enable.as_deref(),
            AvrOp::ChipErase => self.chip_erase.as_deref(),
            AvrOp::ReadSignature => self.read_sig.as_deref(),
            AvrOp::ReadLowFuse => self.read_lfuse.as_deref(),
            AvrOp::ReadHighFuse => self.read_hfuse.as_deref(),
            AvrOp::ReadExtFuse => self.read_efuse.as_deref(),
            AvrOp::ReadLock => self.read_lock.as_deref(),
        }
    }
}

/// Single part definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct PartDef {
    id: String,
    name: String,
    signature: Vec<u8>,
    #[serde(default)]
    chip_erase_delay_us: u64,
    #[serde(default)]
    flags: FlagsDef,
    #[serde(default)]
    ops: OpsDef,
}

impl TryFrom<PartDef> for Part {
    type Error = PartDbError;

    fn try_from(def: PartDef) -> Result<Self, Self::Error> {
        let signature: [u8; 3] = def.signature.as_slice().try_into().map_err(|_| {
            PartDbError::Validation(format!(
                "{}: signature must be 3 bytes, got {}",
                def.id,
                def.signature.len()
            ))
        })?;

        let mut part = Part::new(def.id.clone(), def.name, signature)
            .with_flags(def.flags.into())
            .with_chip_erase_delay(Duration::from_micros(def.chip_erase_delay_us));

        for op in AvrOp::ALL {
            if let Some(text) = def.ops.get(op) {
                let template: OpcodeTemplate = text.parse().map_err(|e| {
                    PartDbError::Validation(format!("{}: {}: {}", def.id, op, e))
                })?;
                part = part.with_op(op, template);
            }
        }

        Ok(part)
    }
}

/// Top-level RON document
#[derive(Debug, Clone, serde::Deserialize)]
struct PartsDef {
    parts: Vec<PartDef>,
}

// ============================================================================
// Part database
// ============================================================================

/// Runtime part database
#[derive(Debug, Clone, Default)]
pub struct PartDatabase {
    parts: Vec<Part>,
}

impl PartDatabase {
    /// Create an empty part database
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// The stock database compiled into the crate
    pub fn builtin() -> Result<&'static PartDatabase, PartDbError> {
        BUILTIN
            .as_ref()
            .map_err(|msg| PartDbError::Validation(format!("built-in part database: {}", msg)))
    }

    /// Parse a database from a RON string
    pub fn from_ron_str(content: &str) -> Result<Self, PartDbError> {
        let mut db = Self::new();
        db.load_ron(content)?;
        Ok(db)
    }

    /// Load part definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, PartDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load part definitions from a RON string
    ///
    /// Op-code fields may be written as bare strings. Nothing is added to
    /// the database unless every definition in `content` is valid.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, PartDbError> {
        let defs: PartsDef = ron::Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .from_str(content)?;

        let mut parts: Vec<Part> = Vec::with_capacity(defs.parts.len());
        for def in defs.parts {
            let part = Part::try_from(def)?;
            let taken = self.find(&part.id).is_some()
                || parts.iter().any(|p| p.id.eq_ignore_ascii_case(&part.id));
            if taken {
                return Err(PartDbError::Validation(format!(
                    "duplicate part id '{}'",
                    part.id
                )));
            }
            log::trace!("Loaded part {} ({})", part.id, part.name);
            parts.push(part);
        }

        let count = parts.len();
        self.parts.extend(parts);
        Ok(count)
    }

    /// Get the number of parts in the database
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Find a part by id or name (case-insensitive exact match)
    pub fn find(&self, id_or_name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| {
            p.id.eq_ignore_ascii_case(id_or_name) || p.name.eq_ignore_ascii_case(id_or_name)
        })
    }

    /// Find a part by its signature
    pub fn find_by_signature(&self, signature: [u8; 3]) -> Option<&Part> {
        self.parts.iter().find(|p| p.signature == signature)
    }

    /// Iterate over all parts
    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_ron() {
        let ron = r#"
        (
            parts: [
                (
                    id: "m8",
                    name: "ATmega8",
                    signature: [0x1E, 0x93, 0x07],
                    chip_erase_delay_us: 10000,
                    ops: (
                        pgm_enable: "1 0 1 0 1 1 0 0 0 1 0 1 0 0 1 1 x x x x x x x x x x x x x x x x",
                    ),
                ),
                (
                    id: "t4",
                    name: "ATtiny4",
                    signature: [0x1E, 0x8F, 0x0A],
                    flags: (tpi: true),
                ),
            ],
        )
        "#;

        let db = PartDatabase::from_ron_str(ron).unwrap();
        assert_eq!(db.len(), 2);

        let m8 = db.find("atmega8").unwrap();
        assert_eq!(m8.id, "m8");
        assert_eq!(m8.chip_erase_delay, Duration::from_millis(10));
        assert!(m8.op(AvrOp::ProgramEnable).is_some());
        assert!(m8.op(AvrOp::ChipErase).is_none());
        assert!(!m8.has_tpi());

        let t4 = db.find_by_signature([0x1E, 0x8F, 0x0A]).unwrap();
        assert!(t4.has_tpi());
    }

    #[test]
    fn test_rejects_bad_signature() {
        let ron = r#"(parts: [(id: "x", name: "X", signature: [0x1E, 0x93])])"#;
        assert!(matches!(
            PartDatabase::from_ron_str(ron),
            Err(PartDbError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let ron = r#"(parts: [
            (id: "x", name: "X", signature: [1, 2, 3]),
            (id: "X", name: "Y", signature: [4, 5, 6]),
        ])"#;
        assert!(matches!(
            PartDatabase::from_ron_str(ron),
            Err(PartDbError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_bad_template() {
        let ron = r#"(parts: [(id: "x", name: "X", signature: [1, 2, 3], ops: (chip_erase: "1 0"))])"#;
        assert!(matches!(
            PartDatabase::from_ron_str(ron),
            Err(PartDbError::Validation(_))
        ));
    }

    #[test]
    fn test_failed_load_keeps_database() {
        let mut db = PartDatabase::from_ron_str(r#"(parts: [(id: "a", name: "A", signature: [1, 2, 3])])"#)
            .unwrap();

        let ron = r#"(parts: [
            (id: "b", name: "B", signature: [4, 5, 6]),
            (id: "c", name: "C", signature: [7, 8]),
        ])"#;
        assert!(db.load_ron(ron).is_err());
        assert_eq!(db.len(), 1);
        assert!(db.find("b").is_none());

        let ron = r#"(parts: [(id: "d", name: "D", signature: [9, 9, 9]), (id: "A", name: "A2", signature: [1, 1, 1])])"#;
        assert!(db.load_ron(ron).is_err());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_ops_accept_explicit_some() {
        let ron = r#"(parts: [(id: "x", name: "X", signature: [1, 2, 3], ops: (
            chip_erase: Some("1 0 1 0 1 1 0 0 1 0 0 x x x x x x x x x x x x x x x x x x x x x"),
            read_lock: None,
        ))])"#;
        let db = PartDatabase::from_ron_str(ron).unwrap();
        let x = db.find("x").unwrap();
        assert!(x.op(AvrOp::ChipErase).is_some());
        assert!(x.op(AvrOp::ReadLock).is_none());
    }

    #[test]
    fn test_builtin_database() {
        let db = PartDatabase::builtin().unwrap();
        assert!(!db.is_empty());

        let m328p = db.find("m328p").unwrap();
        assert_eq!(m328p.signature, [0x1E, 0x95, 0x0F]);
        assert_eq!(
            m328p.op(AvrOp::ProgramEnable).unwrap().frame(),
            [0xAC, 0x53, 0x00, 0x00]
        );
        assert_eq!(
            m328p.op(AvrOp::ChipErase).unwrap().frame(),
            [0xAC, 0x80, 0x00, 0x00]
        );

        let t10 = db.find("ATtiny10").unwrap();
        assert!(t10.has_tpi());
    }
}
