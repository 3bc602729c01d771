//! Deterministic names for engine-owned database objects.
//!
//! Constraint and index names hash the owning table and the participating
//! fields, so reloading the same descriptors yields the same names. Only
//! objects carrying one of these prefixes are considered engine-owned.

pub const PRIMARY_KEY_PREFIX: &str = "PK_";
pub const UNIQUE_KEY_PREFIX: &str = "UK_";
pub const INDEX_PREFIX: &str = "IK_";
pub const FOREIGN_KEY_PREFIX: &str = "FK_";
pub const CHECK_PREFIX: &str = "CK_";
pub const TRIGGER_PREFIX: &str = "TR_";

pub const EXTENSION_SUFFIX: &str = "_EXT";
pub const TRANSLATION_SUFFIX: &str = "_TRAN";
pub const STATE_SUFFIX: &str = "_STATE";
pub const AUDIT_SUFFIX: &str = "_AUDIT";
pub const BACKUP_SUFFIX: &str = "_BAK";

const SUFFIXES: [&str; 5] = [
    EXTENSION_SUFFIX,
    TRANSLATION_SUFFIX,
    STATE_SUFFIX,
    AUDIT_SUFFIX,
    BACKUP_SUFFIX,
];

/// Upper-case hex CRC32 of the concatenated parts.
pub fn crc32<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = crc32fast::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:X}", hasher.finalize())
}

pub fn object_name<'a>(
    prefix: &str,
    table: &'a str,
    parts: impl IntoIterator<Item = &'a str>,
) -> String {
    format!(
        "{prefix}{}",
        crc32(std::iter::once(table).chain(parts))
    )
}

/// Whether `name` belongs to an object the engine manages.
pub fn is_engine_owned(name: &str) -> bool {
    [
        PRIMARY_KEY_PREFIX,
        UNIQUE_KEY_PREFIX,
        INDEX_PREFIX,
        FOREIGN_KEY_PREFIX,
        CHECK_PREFIX,
        TRIGGER_PREFIX,
    ]
    .iter()
    .any(|prefix| has_prefix(name, prefix))
}

pub fn has_prefix(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

pub fn extension_table(table: &str) -> String {
    format!("{table}{EXTENSION_SUFFIX}")
}

pub fn translation_table(table: &str) -> String {
    format!("{table}{TRANSLATION_SUFFIX}")
}

pub fn state_table(table: &str) -> String {
    format!("{table}{STATE_SUFFIX}")
}

pub fn audit_table(table: &str) -> String {
    format!("{table}{AUDIT_SUFFIX}")
}

pub fn backup_table(table: &str) -> String {
    format!("{table}{BACKUP_SUFFIX}")
}

/// Column of a translation table that points back at the owner row.
pub fn translation_owner_field(table: &str) -> String {
    format!("{table}ID")
}

/// Column `n` of a state's bitmask.
pub fn state_column(state: &str, n: usize) -> String {
    format!("{state}{n}")
}

/// Whether `name` could be mistaken for a satellite table of some other
/// table. Such names are rejected at load time.
pub fn is_reserved_table_name(name: &str) -> bool {
    SUFFIXES.iter().any(|suffix| {
        name.len() > suffix.len()
            && name
                .get(name.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
    })
}
