use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EntityKind, GradebookError, Result};

macro_rules! id_type {
    ($name:ident, $repr:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse::<$repr>().map($name)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                i64::from(id.0)
            }
        }
    };
}

id_type!(AccountId, i64);
id_type!(ClassroomId, i32);
id_type!(AssignmentId, i32);

pub const ACCOUNT_ID_MIN: i64 = 1_000_000_000;
pub const ACCOUNT_ID_MAX: i64 = 9_999_999_999;
pub const CLASSROOM_ID_MIN: i32 = 100_000;
pub const CLASSROOM_ID_MAX: i32 = 999_999;
pub const ASSIGNMENT_ID_MIN: i32 = 10_000_000;
pub const ASSIGNMENT_ID_MAX: i32 = 99_999_999;

/// Draws from `[min, max]` until `is_taken` rejects nothing.
///
/// `taken_count` is how many values of the range are already in use; when it
/// covers the whole range there is nothing left to find and the draw loop
/// would never end.
pub fn allocate<T, R>(
    rng: &mut R,
    kind: EntityKind,
    min: T,
    max: T,
    taken_count: usize,
    is_taken: impl Fn(T) -> bool,
) -> Result<T>
where
    T: SampleUniform + PartialOrd + Copy + Into<i64>,
    R: Rng + ?Sized,
{
    let span = max.into() - min.into() + 1;
    if span <= 0 || taken_count as i64 >= span {
        return Err(GradebookError::DuplicateAllocation { kind });
    }
    loop {
        let candidate = rng.gen_range(min..=max);
        if !is_taken(candidate) {
            return Ok(candidate);
        }
    }
}

pub fn allocate_account_id<R: Rng + ?Sized>(
    rng: &mut R,
    kind: EntityKind,
    taken_count: usize,
    is_taken: impl Fn(AccountId) -> bool,
) -> Result<AccountId> {
    allocate(rng, kind, ACCOUNT_ID_MIN, ACCOUNT_ID_MAX, taken_count, |raw| {
        is_taken(AccountId(raw))
    })
    .map(AccountId)
}

pub fn allocate_classroom_id<R: Rng + ?Sized>(
    rng: &mut R,
    taken_count: usize,
    is_taken: impl Fn(ClassroomId) -> bool,
) -> Result<ClassroomId> {
    allocate(
        rng,
        EntityKind::Classroom,
        CLASSROOM_ID_MIN,
        CLASSROOM_ID_MAX,
        taken_count,
        |raw| is_taken(ClassroomId(raw)),
    )
    .map(ClassroomId)
}

pub fn allocate_assignment_id<R: Rng + ?Sized>(
    rng: &mut R,
    taken_count: usize,
    is_taken: impl Fn(AssignmentId) -> bool,
) -> Result<AssignmentId> {
    allocate(
        rng,
        EntityKind::Assignment,
        ASSIGNMENT_ID_MIN,
        ASSIGNMENT_ID_MAX,
        taken_count,
        |raw| is_taken(AssignmentId(raw)),
    )
    .map(AssignmentId)
}
