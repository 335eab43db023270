//! Simulated availability for the calendar.
//!
//! There is no scheduling backend behind the widget: a day is bookable when it
//! is a weekday that has not passed yet, minus a random share standing in for
//! days that are already fully booked.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{CitasError, Result};
use crate::meeting::MeetingType;

pub const DEFAULT_BOOKED_FRACTION: f64 = 0.3;

/// Day-of-month numbers (1..=31) that can be picked.
pub type AvailableDaySet = BTreeSet<u32>;

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn first_of_month(month: u32, year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CitasError::InvalidMonth { month, year })
}

/// Every date of the given month, in order.
pub fn month_days(month: u32, year: i32) -> Result<Vec<NaiveDate>> {
    let first = first_of_month(month, year)?;
    Ok(first.iter_days().take_while(|d| d.month() == month).collect())
}

/// Weekdays of the month that are not strictly before `today`.
pub fn candidate_days(month: u32, year: i32, today: NaiveDate) -> Result<Vec<u32>> {
    Ok(month_days(month, year)?
        .into_iter()
        .filter(|d| !is_weekend(*d) && *d >= today)
        .map(|d| d.day())
        .collect())
}

#[derive(Debug, Clone, Copy)]
pub struct AvailabilityCalculator {
    booked_fraction: f64,
}

impl Default for AvailabilityCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKED_FRACTION)
    }
}

impl AvailabilityCalculator {
    pub fn new(booked_fraction: f64) -> Self {
        Self {
            booked_fraction: booked_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn available_days(
        &self,
        month: u32,
        year: i32,
        meeting_type: Option<MeetingType>,
        today: NaiveDate,
    ) -> Result<AvailableDaySet> {
        self.available_days_with_rng(month, year, meeting_type, today, &mut rand::rng())
    }

    /// Same as `available_days` with the booking simulation driven by `rng`.
    /// Without a meeting type nothing is available.
    pub fn available_days_with_rng<R: Rng + ?Sized>(
        &self,
        month: u32,
        year: i32,
        meeting_type: Option<MeetingType>,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<AvailableDaySet> {
        let Some(meeting_type) = meeting_type else {
            first_of_month(month, year)?;
            return Ok(AvailableDaySet::new());
        };

        let mut candidates = candidate_days(month, year, today)?;
        let booked = (candidates.len() as f64 * self.booked_fraction).floor() as usize;
        candidates.shuffle(rng);
        let available: AvailableDaySet = candidates.into_iter().skip(booked).collect();

        debug!(
            month,
            year,
            meeting = meeting_type.as_str(),
            booked,
            available = available.len(),
            "computed available days"
        );
        Ok(available)
    }
}
