use crate::dates::{weekday_of, DateKey};
use crate::habits::{Frequency, Habit};

/// Decides whether a `custom` frequency habit is due on a date.
pub trait CustomSchedule: Send + Sync {
    fn is_due(&self, habit: &Habit, date: DateKey) -> bool;
}

/// Treats every day as due. Custom schedules carry no per-day rules yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct EveryDay;

impl CustomSchedule for EveryDay {
    fn is_due(&self, _habit: &Habit, _date: DateKey) -> bool {
        true
    }
}

impl<F> CustomSchedule for F
where
    F: Fn(&Habit, DateKey) -> bool + Send + Sync,
{
    fn is_due(&self, habit: &Habit, date: DateKey) -> bool {
        self(habit, date)
    }
}

/// Whether `habit` is scheduled on `date`. Archived habits are the caller's
/// concern.
pub fn is_due_on(habit: &Habit, date: DateKey) -> bool {
    is_due_on_with(habit, date, &EveryDay)
}

pub fn is_due_on_with(habit: &Habit, date: DateKey, custom: &dyn CustomSchedule) -> bool {
    match habit.frequency {
        Frequency::Daily => true,
        Frequency::Weekly => match &habit.target_days {
            Some(days) => days.contains(&weekday_of(date)),
            None => true,
        },
        Frequency::Custom => custom.is_due(habit, date),
    }
}
