use crate::model::UNGRADED;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeAverage {
    /// Mean of graded values, or `UNGRADED` when nothing was graded.
    pub mean: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

impl GradeAverage {
    pub fn has_grades(&self) -> bool {
        self.graded_count > 0
    }
}

/// Averages grades, skipping the `UNGRADED` sentinel.
///
/// A graded value can legitimately equal -1 (grades are not bounded), so
/// callers that need to tell "no data" apart should check `graded_count`.
pub fn grade_average<I>(grades: I) -> GradeAverage
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut graded_count = 0usize;
    let mut ungraded_count = 0usize;

    for g in grades {
        if g == UNGRADED {
            ungraded_count += 1;
        } else {
            graded_count += 1;
            sum += g;
        }
    }

    let mean = if graded_count > 0 {
        sum / (graded_count as f64)
    } else {
        UNGRADED
    };

    GradeAverage {
        mean,
        graded_count,
        ungraded_count,
    }
}

/// Mean of per-student averages over the whole roster.
///
/// Students with nothing graded count as 0 and still widen the divisor.
/// An empty roster yields `UNGRADED` rather than dividing by zero.
pub fn class_average<I>(student_averages: I) -> f64
where
    I: IntoIterator<Item = GradeAverage>,
{
    let mut total = 0.0;
    let mut roster = 0usize;
    for avg in student_averages {
        roster += 1;
        if avg.has_grades() {
            total += avg.mean;
        }
    }
    if roster == 0 {
        return UNGRADED;
    }
    total / (roster as f64)
}
