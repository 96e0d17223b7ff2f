//! MIPS settings.

use crate::result::BuildError;
use crate::settings::{self, PredicateView, SettingGroup, SettingGroupBuilder};
use core::fmt;
use std::sync::Arc;

/// Define the settings group for MIPS.
pub fn define() -> Result<SettingGroup, BuildError> {
    let mut group = SettingGroupBuilder::new("mips");
    let supports_lext = group.add_bool(
        "supports_lext",
        "CPU supports the Loongson multimedia extension integer instructions.",
        false,
    );
    let enable_lext = group.add_bool(
        "enable_lext",
        "Use the Loongson extension instructions when they are supported.",
        true,
    );
    group.add_predicate("use_lext", supports_lext.and(enable_lext));
    group.build()
}

/// Create a settings builder for the MIPS settings group.
pub fn builder() -> Result<settings::Builder, BuildError> {
    Ok(settings::Builder::new(Arc::new(define()?)))
}

/// Frozen MIPS settings.
#[derive(Clone)]
pub struct Flags {
    flags: settings::Flags,
    supports_lext: usize,
    enable_lext: usize,
    use_lext: usize,
}

impl Flags {
    /// Freeze the values collected by `builder`.
    pub fn new(builder: settings::Builder) -> Result<Self, BuildError> {
        let flags = settings::Flags::new(builder);
        let number = |name: &'static str| {
            flags
                .template()
                .predicate_number(name)
                .map(usize::from)
                .ok_or(BuildError::UnknownPredicate(name))
        };
        Ok(Self {
            supports_lext: number("supports_lext")?,
            enable_lext: number("enable_lext")?,
            use_lext: number("use_lext")?,
            flags,
        })
    }

    /// CPU supports the Loongson multimedia extension integer instructions.
    pub fn supports_lext(&self) -> bool {
        self.flags.numbered_predicate(self.supports_lext)
    }

    /// Use the Loongson extension instructions when they are supported.
    pub fn enable_lext(&self) -> bool {
        self.flags.numbered_predicate(self.enable_lext)
    }

    /// Computed predicate `supports_lext && enable_lext`.
    pub fn use_lext(&self) -> bool {
        self.flags.numbered_predicate(self.use_lext)
    }

    /// Get a view of the boolean predicates.
    pub fn predicate_view(&self) -> PredicateView<'_> {
        self.flags.predicate_view()
    }

    /// The generic settings object.
    pub fn flags(&self) -> &settings::Flags {
        &self.flags
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.flags, f)
    }
}
