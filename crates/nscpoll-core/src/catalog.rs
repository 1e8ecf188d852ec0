// ── Query catalog ──
//
// Maps every known check to its agent endpoint and payload parser.
// Adding a check type means adding a variant here.

use std::borrow::Cow;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use nscpoll_api::{INFO_PATH, command_path};

use crate::parser::{IdentityParser, PayloadParser, PerformanceParser};

/// A named remote query.
///
/// Declaration order is the order checks run within a poll cycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    Info,
    CheckCpu,
    CheckDrivesize,
    CheckMemory,
}

impl CheckKind {
    /// The catalog name, e.g. `"check_cpu"`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// URL path of the endpoint serving this check.
    pub fn path(self) -> Cow<'static, str> {
        match self {
            Self::Info => Cow::Borrowed(INFO_PATH),
            _ => Cow::Owned(command_path(self.name())),
        }
    }

    /// Parser for this check's payload.
    pub fn parser(self) -> &'static dyn PayloadParser {
        match self {
            Self::Info => &IdentityParser,
            Self::CheckCpu | Self::CheckDrivesize | Self::CheckMemory => &PerformanceParser,
        }
    }
}
