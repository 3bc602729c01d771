use super::name;

use serde::{Deserialize, Serialize};

/// Bits per state column.
pub const STATE_BITS: u64 = 64;

/// A rights category backed by a bitmask column set in the state table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: String,

    /// Bits may be set per user.
    #[serde(default)]
    pub users: bool,

    /// Bits may be set per role.
    #[serde(default)]
    pub roles: bool,

    /// A checked state passes unless the principal's bit is set. An
    /// unchecked state passes only when the bit is set.
    #[serde(default)]
    pub checked: bool,
}

impl State {
    pub const VIEW: &'static str = "VIEW";
    pub const EDIT: &'static str = "EDIT";
    pub const DELETE: &'static str = "DELETE";

    pub fn new(name: impl Into<String>, users: bool, roles: bool, checked: bool) -> State {
        State {
            name: name.into(),
            users,
            roles,
            checked,
        }
    }

    /// Column names holding this state's bits.
    pub fn columns(&self, state_columns: usize) -> Vec<String> {
        (0..state_columns)
            .map(|n| name::state_column(&self.name, n))
            .collect()
    }

    /// Groups the bits of `principals` by state column. Principals are
    /// 1-based; non-positive ids and ids beyond the configured column count
    /// are skipped.
    pub fn masks(&self, principals: &[i64], state_columns: usize) -> Vec<(String, i64)> {
        let mut masks: Vec<(usize, u64)> = vec![];

        for &principal in principals {
            if principal <= 0 {
                continue;
            }
            let pos = (principal - 1) as u64;
            let column = (pos / STATE_BITS) as usize;
            if column >= state_columns {
                continue;
            }
            let bit = 1u64 << (pos % STATE_BITS);

            match masks.iter_mut().find(|(c, _)| *c == column) {
                Some((_, mask)) => *mask |= bit,
                None => masks.push((column, bit)),
            }
        }

        masks.sort_by_key(|(column, _)| *column);
        masks
            .into_iter()
            .map(|(column, mask)| (name::state_column(&self.name, column), mask as i64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_group_principals_by_column() {
        let state = State::new("VIEW", true, true, false);
        let masks = state.masks(&[1, 3, 65, 0, -2], 2);
        assert_eq!(
            masks,
            vec![("VIEW0".to_string(), 0b101), ("VIEW1".to_string(), 1)]
        );
    }

    #[test]
    fn high_bit_wraps_to_negative() {
        let state = State::new("EDIT", true, false, true);
        assert_eq!(state.masks(&[64], 1), vec![("EDIT0".to_string(), i64::MIN)]);
    }

    #[test]
    fn principals_beyond_columns_are_skipped() {
        let state = State::new("VIEW", true, false, false);
        assert!(state.masks(&[65], 1).is_empty());
    }
}
