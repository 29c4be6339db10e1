//! Half-open date ranges `[check_in, check_out)` shared by the ledger,
//! pricing and bookings.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    /// Fails unless `check_out` is strictly after `check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_out <= check_in {
            return Err(DomainError::Validation(format!(
                "check-out {} must be after check-in {}",
                check_out, check_in
            )));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Every night of the stay, i.e. every date except check-out.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.check_out;
        self.check_in.iter_days().take_while(move |d| *d < end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.check_in && date < self.check_out
    }

    /// Nights falling on a Friday or Saturday.
    pub fn weekend_nights(&self) -> i64 {
        self.dates()
            .filter(|d| matches!(d.weekday(), Weekday::Fri | Weekday::Sat))
            .count() as i64
    }
}

impl std::fmt::Display for StayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(StayRange::new(d(2027, 3, 1), d(2027, 3, 1)).is_err());
        assert!(StayRange::new(d(2027, 3, 2), d(2027, 3, 1)).is_err());
    }

    #[test]
    fn dates_exclude_check_out() {
        let stay = StayRange::new(d(2027, 2, 27), d(2027, 3, 2)).unwrap();
        let dates: Vec<_> = stay.dates().collect();
        assert_eq!(dates, vec![d(2027, 2, 27), d(2027, 2, 28), d(2027, 3, 1)]);
        assert_eq!(stay.nights(), 3);
        assert!(!stay.contains(d(2027, 3, 2)));
    }

    #[test]
    fn counts_friday_and_saturday_nights() {
        // 2027-03-12 is a Friday
        let stay = StayRange::new(d(2027, 3, 11), d(2027, 3, 15)).unwrap();
        assert_eq!(stay.weekend_nights(), 2);
    }
}
