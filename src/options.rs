use std::fmt::{self, Display, Formatter};

use crate::engine::ScoreUnit;
use crate::error::InvalidOptionError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptionName {
    MaxPlies,
    QPlies,
    PStab,
    PDead,
    MoveError,
    BlunderError,
    BlunderPercent,
}

const OPTION_COUNT: usize = 7;

pub const ALL_OPTIONS: [OptionName; OPTION_COUNT] = [
    OptionName::MaxPlies,
    OptionName::QPlies,
    OptionName::PStab,
    OptionName::PDead,
    OptionName::MoveError,
    OptionName::BlunderError,
    OptionName::BlunderPercent,
];

impl OptionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionName::MaxPlies => "maxplies",
            OptionName::QPlies => "qplies",
            OptionName::PStab => "pstab",
            OptionName::PDead => "pdead",
            OptionName::MoveError => "MoveError",
            OptionName::BlunderError => "BlunderError",
            OptionName::BlunderPercent => "BlunderPercent",
        }
    }

    /// UCI option names are matched case-insensitively.
    pub fn from_name(name: &str) -> Option<OptionName> {
        ALL_OPTIONS
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(name))
    }

    pub fn default_value(&self) -> i64 {
        match self {
            OptionName::MaxPlies => 1,
            OptionName::QPlies => 3,
            OptionName::PStab => 2,
            OptionName::PDead => 1,
            OptionName::MoveError | OptionName::BlunderError | OptionName::BlunderPercent => 0,
        }
    }

    pub fn min(&self) -> i64 {
        0
    }

    pub fn max(&self) -> i64 {
        match self {
            OptionName::BlunderPercent => 100,
            _ => 1024,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for OptionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Splits the arguments of `setoption name <name> value <value>`.
pub fn parse_set_option(args: &str) -> Result<(&str, &str), InvalidOptionError> {
    let args = args.trim();
    let Some(rest) = args.strip_prefix("name ") else {
        return Err(InvalidOptionError::UnknownOption(args.into()));
    };

    match rest.split_once(" value ") {
        Some((name, value)) => Ok((name.trim(), value.trim())),
        None => Err(InvalidOptionError::MissingValue(
            rest.trim_end_matches(" value").trim().into(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    values: [i64; OPTION_COUNT],
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            values: ALL_OPTIONS.map(|o| o.default_value()),
        }
    }
}

impl EngineOptions {
    pub fn get(&self, name: OptionName) -> i64 {
        self.values[name.index()]
    }

    pub fn max_plies(&self) -> usize {
        self.get(OptionName::MaxPlies) as usize
    }

    pub fn q_plies(&self) -> usize {
        self.get(OptionName::QPlies) as usize
    }

    pub fn set(&mut self, name: OptionName, value: i64) -> i64 {
        let value = value.clamp(name.min(), name.max());
        self.values[name.index()] = value;
        value
    }

    /// Parses and stores `value`, returning what was actually stored.
    ///
    /// GUIs send `pstab` on the centipawn scale; backends that score in whole
    /// pawns store it divided by 10.
    pub fn set_from_str(
        &mut self,
        name: &str,
        value: &str,
        unit: ScoreUnit,
    ) -> Result<(OptionName, i64), InvalidOptionError> {
        let option =
            OptionName::from_name(name).ok_or(InvalidOptionError::UnknownOption(name.into()))?;

        let mut parsed: i64 = value
            .trim()
            .parse()
            .map_err(|_| InvalidOptionError::InvalidValue {
                name: name.into(),
                value: value.into(),
            })?;

        if option == OptionName::PStab && unit == ScoreUnit::Pawns {
            parsed /= 10;
        }

        Ok((option, self.set(option, parsed)))
    }

    /// One `option name ... type spin ...` declaration per configurable option.
    pub fn declarations() -> impl Iterator<Item = String> {
        ALL_OPTIONS.iter().map(|o| {
            format!(
                "option name {} type spin default {} min {} max {}",
                o,
                o.default_value(),
                o.min(),
                o.max()
            )
        })
    }
}
