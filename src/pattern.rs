use serde::Deserialize;
use std::fmt;

/// Signed semitone offset from a base pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Interval(i8);

impl Interval {
    pub const UNISON: Interval = Interval(0);
    pub const MAJOR_SECOND: Interval = Interval(2);
    pub const MAJOR_THIRD: Interval = Interval(4);
    pub const FOURTH: Interval = Interval(5);
    pub const FIFTH: Interval = Interval(7);
    pub const MAJOR_SIXTH: Interval = Interval(9);
    pub const OCTAVE: Interval = Interval(12);

    pub const fn new(semitones: i8) -> Self {
        Interval(semitones)
    }

    pub fn semitones(self) -> i8 {
        self.0
    }
}

/// Intervals played in order after a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Pattern(Vec<Interval>);

impl Pattern {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Pattern(intervals)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&[Interval]> for Pattern {
    fn from(intervals: &[Interval]) -> Self {
        Pattern(intervals.to_vec())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.0.iter().map(|i| i.0.to_string()).collect();
        write!(f, "[{}]", steps.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pattern {name:?}, expected one of: {}", names().collect::<Vec<_>>().join(", "))]
pub struct UnknownPattern {
    pub name: String,
}

pub const DEFAULT_PATTERN: &str = "1-3-5-8-5-3-1";

use Interval as I;

const CATALOG: &[(&str, &[Interval])] = &[
    (
        "5-4-3-2-1",
        &[I::FIFTH, I::FOURTH, I::MAJOR_THIRD, I::MAJOR_SECOND, I::UNISON],
    ),
    (
        "1-3-5-3-1",
        &[I::UNISON, I::MAJOR_THIRD, I::FIFTH, I::MAJOR_THIRD, I::UNISON],
    ),
    (
        "1-3-5-8-5-3-1",
        &[
            I::UNISON,
            I::MAJOR_THIRD,
            I::FIFTH,
            I::OCTAVE,
            I::FIFTH,
            I::MAJOR_THIRD,
            I::UNISON,
        ],
    ),
    (
        "1-2-3-4-5-4-3-2-1",
        &[
            I::UNISON,
            I::MAJOR_SECOND,
            I::MAJOR_THIRD,
            I::FOURTH,
            I::FIFTH,
            I::FOURTH,
            I::MAJOR_THIRD,
            I::MAJOR_SECOND,
            I::UNISON,
        ],
    ),
    (
        "5-6-5-4-5-4-3-4-3-2-3-2-1",
        &[
            I::FIFTH,
            I::MAJOR_SIXTH,
            I::FIFTH,
            I::FOURTH,
            I::FIFTH,
            I::FOURTH,
            I::MAJOR_THIRD,
            I::FOURTH,
            I::MAJOR_THIRD,
            I::MAJOR_SECOND,
            I::MAJOR_THIRD,
            I::MAJOR_SECOND,
            I::UNISON,
        ],
    ),
];

pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

pub fn get(name: &str) -> Option<&'static [Interval]> {
    CATALOG
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, intervals)| *intervals)
}

pub fn select(name: &str) -> Result<Pattern, UnknownPattern> {
    get(name).map(Pattern::from).ok_or_else(|| UnknownPattern {
        name: name.to_owned(),
    })
}
