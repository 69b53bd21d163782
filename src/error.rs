use thiserror::Error;

use crate::menu::MenuId;

/// Why a setting edit was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("setting is read-only")]
    ReadOnly,
    #[error("setting cannot be stepped")]
    Unsupported,
    #[error("value outside the setting's range")]
    OutOfRange,
}

/// Which part of a menu descriptor failed the integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("guard tag is not a menu tag")]
    BadTag,
    #[error("guard checksum {found:#06x}, expected {expected:#06x}")]
    ChecksumMismatch { expected: u16, found: u16 },
    #[error("entries do not end with a terminator")]
    MissingTerminator,
    #[error("terminator at index {index} is not the last entry")]
    MisplacedTerminator { index: usize },
}

/// Diagnostics the navigation engine raises. None of these leave the engine as a
/// failure; they are reported through [`crate::nav::Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("menu {menu} failed integrity check: {violation}")]
    StructuralViolation { menu: MenuId, violation: Violation },
    #[error("menu {menu} is already open further up the stack")]
    CycleDetected { menu: MenuId },
    #[error("menu nesting exceeds {max} levels")]
    DepthExceeded { max: usize },
    #[error("no menu with id {menu}")]
    UnknownMenu { menu: MenuId },
    #[error("edit rejected: {0}")]
    Rejected(#[from] Rejected),
}

/// Failure reported by a [`crate::settings::SettingsStore`] write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown setting")]
    UnknownSetting,
    #[error("setting is read-only")]
    ReadOnly,
    #[error("value does not match the setting's type")]
    TypeMismatch,
    #[error("value outside the setting's range")]
    OutOfRange,
    #[error("persisting settings failed: {0}")]
    Persist(String),
}

impl From<StoreError> for Rejected {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ReadOnly => Rejected::ReadOnly,
            StoreError::TypeMismatch | StoreError::UnknownSetting | StoreError::Persist(_) => {
                Rejected::Unsupported
            }
            StoreError::OutOfRange => Rejected::OutOfRange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_edit_rejections() {
        assert_eq!(Rejected::from(StoreError::ReadOnly), Rejected::ReadOnly);
        assert_eq!(Rejected::from(StoreError::OutOfRange), Rejected::OutOfRange);
        assert_eq!(Rejected::from(StoreError::TypeMismatch), Rejected::Unsupported);
        assert_eq!(
            Rejected::from(StoreError::Persist("flash busy".into())),
            Rejected::Unsupported
        );
    }

    #[test]
    fn violations_render_through_nav_error() {
        let err = NavError::StructuralViolation {
            menu: MenuId(3),
            violation: Violation::ChecksumMismatch {
                expected: 0x1234,
                found: 0x00ff,
            },
        };
        assert_eq!(
            err.to_string(),
            "menu #3 failed integrity check: guard checksum 0x00ff, expected 0x1234"
        );
        assert_eq!(
            Violation::MisplacedTerminator { index: 2 }.to_string(),
            "terminator at index 2 is not the last entry"
        );
    }
}
