//! Month grid for picking an appointment date.
//!
//! Grids always hold 6 weeks of 7 days starting on the Monday on or before
//! the 1st, so the layout never changes height between months.

use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

use crate::availability::{first_of_month, is_weekend, AvailabilityCalculator, AvailableDaySet};
use crate::error::{CitasError, Result};
use crate::meeting::MeetingType;

pub const GRID_ROWS: usize = 6;
pub const GRID_COLUMNS: usize = 7;
pub const GRID_CELLS: usize = GRID_ROWS * GRID_COLUMNS;

pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

pub const WEEKDAY_LABELS: [&str; GRID_COLUMNS] = ["Lun", "Mar", "Mié", "Jue", "Vie", "Sáb", "Dom"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub is_weekend: bool,
    pub is_past: bool,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    month: u32,
    year: i32,
    meeting_type: Option<MeetingType>,
    cells: Vec<CalendarCell>,
}

impl CalendarGrid {
    /// Lay out the month of `reference` with the given availability.
    pub fn build(
        reference: NaiveDate,
        meeting_type: Option<MeetingType>,
        today: NaiveDate,
        available: &AvailableDaySet,
    ) -> Result<Self> {
        let first = first_of_month(reference.month(), reference.year())?;
        let lead = u64::from(first.weekday().num_days_from_monday());
        let start = first
            .checked_sub_days(Days::new(lead))
            .ok_or(CitasError::InvalidMonth {
                month: first.month(),
                year: first.year(),
            })?;

        let cells = start
            .iter_days()
            .take(GRID_CELLS)
            .map(|date| {
                let in_current_month = date.month() == first.month() && date.year() == first.year();
                let is_weekend = is_weekend(date);
                let is_past = date < today;
                CalendarCell {
                    date,
                    in_current_month,
                    is_today: date == today,
                    is_weekend,
                    is_past,
                    is_available: in_current_month
                        && !is_weekend
                        && !is_past
                        && available.contains(&date.day()),
                }
            })
            .collect();

        Ok(Self {
            month: first.month(),
            year: first.year(),
            meeting_type,
            cells,
        })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn meeting_type(&self) -> Option<MeetingType> {
        self.meeting_type
    }

    pub fn cells(&self) -> &[CalendarCell] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(GRID_COLUMNS)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&CalendarCell> {
        self.cells.iter().find(|c| c.date == date)
    }

    pub fn available_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_available).count()
    }

    /// First selectable date, used to place the cursor.
    pub fn first_available(&self) -> Option<NaiveDate> {
        self.cells.iter().find(|c| c.is_available).map(|c| c.date)
    }

    /// "Marzo 2024"
    pub fn title(&self) -> String {
        let name = MONTH_NAMES
            .get(self.month as usize - 1)
            .copied()
            .unwrap_or_default();
        format!("{} {}", name, self.year)
    }
}

/// What the calendar panel shows after a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarState {
    Grid(CalendarGrid),
    /// No meeting type known yet, so nothing could be selected.
    NeedsMeetingType,
}

/// `day/month/year` without zero padding, as the bot expects it.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Calendar panel state for one widget: the displayed month, the meeting type
/// it was opened for and the last grid built.
#[derive(Debug, Clone)]
pub struct CalendarView {
    displayed: NaiveDate,
    meeting_type: Option<MeetingType>,
    calculator: AvailabilityCalculator,
    state: Option<CalendarState>,
}

impl CalendarView {
    pub fn new(today: NaiveDate, calculator: AvailabilityCalculator) -> Self {
        Self {
            displayed: today.with_day(1).unwrap_or(today),
            meeting_type: None,
            calculator,
            state: None,
        }
    }

    pub fn displayed_month(&self) -> NaiveDate {
        self.displayed
    }

    pub fn meeting_type(&self) -> Option<MeetingType> {
        self.meeting_type
    }

    pub fn set_meeting_type(&mut self, meeting_type: Option<MeetingType>) {
        self.meeting_type = meeting_type;
    }

    pub fn state(&self) -> Option<&CalendarState> {
        self.state.as_ref()
    }

    pub fn grid(&self) -> Option<&CalendarGrid> {
        match &self.state {
            Some(CalendarState::Grid(grid)) => Some(grid),
            _ => None,
        }
    }

    /// Rebuild the displayed month. Availability is computed once per build.
    pub fn build(&mut self, today: NaiveDate) -> Result<&CalendarState> {
        let state = match self.meeting_type {
            None => CalendarState::NeedsMeetingType,
            Some(kind) => {
                let available = self.calculator.available_days(
                    self.displayed.month(),
                    self.displayed.year(),
                    Some(kind),
                    today,
                )?;
                let grid = CalendarGrid::build(self.displayed, Some(kind), today, &available)?;
                debug!(
                    month = grid.month(),
                    year = grid.year(),
                    meeting = kind.as_str(),
                    available = grid.available_count(),
                    "built calendar grid"
                );
                CalendarState::Grid(grid)
            }
        };
        let state = self.state.insert(state);
        Ok(&*state)
    }

    pub fn prev_month(&mut self, today: NaiveDate) -> Result<&CalendarState> {
        self.displayed = self
            .displayed
            .checked_sub_months(Months::new(1))
            .ok_or(self.out_of_range())?;
        self.build(today)
    }

    pub fn next_month(&mut self, today: NaiveDate) -> Result<&CalendarState> {
        self.displayed = self
            .displayed
            .checked_add_months(Months::new(1))
            .ok_or(self.out_of_range())?;
        self.build(today)
    }

    /// The formatted date for a click on `date`, or `None` when that cell is
    /// not selectable in the grid currently shown.
    pub fn select(&self, date: NaiveDate) -> Option<String> {
        self.grid()
            .and_then(|grid| grid.cell(date))
            .filter(|cell| cell.is_available)
            .map(|cell| format_date(cell.date))
    }

    fn out_of_range(&self) -> CitasError {
        CitasError::InvalidMonth {
            month: self.displayed.month(),
            year: self.displayed.year(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn whole_month(month: u32, year: i32) -> AvailableDaySet {
        (1..=31)
            .filter(|d| NaiveDate::from_ymd_opt(year, month, *d).is_some())
            .collect()
    }

    #[test]
    fn test_grid_starts_on_monday_before_first() {
        let today = date(2024, 3, 1);
        let grid = CalendarGrid::build(today, Some(MeetingType::Video), today, &whole_month(3, 2024))
            .unwrap();

        assert_eq!(grid.cells().len(), GRID_CELLS);
        let first = grid.cells()[0];
        assert_eq!(first.date, date(2024, 2, 26));
        assert_eq!(first.date.weekday(), Weekday::Mon);
        assert!(!first.in_current_month);

        let march_first = grid.cell(date(2024, 3, 1)).unwrap();
        assert!(march_first.in_current_month);
        assert!(!march_first.is_weekend);
        assert!(march_first.is_today);
        assert!(march_first.is_available);
    }

    #[test]
    fn test_month_starting_on_monday_starts_there() {
        // April 2024 begins on a Monday.
        let reference = date(2024, 4, 17);
        let grid = CalendarGrid::build(reference, None, reference, &AvailableDaySet::new()).unwrap();
        assert_eq!(grid.cells()[0].date, date(2024, 4, 1));
        assert_eq!(grid.rows().count(), GRID_ROWS);
    }

    #[test]
    fn test_every_grid_is_contiguous_and_monday_aligned() {
        let today = date(2024, 1, 1);
        for year in [2023, 2024, 2025] {
            for month in 1..=12 {
                let grid = CalendarGrid::build(
                    date(year, month, 15),
                    Some(MeetingType::InPerson),
                    today,
                    &whole_month(month, year),
                )
                .unwrap();
                assert_eq!(grid.cells().len(), 42);
                assert_eq!(grid.cells()[0].date.weekday(), Weekday::Mon);
                for pair in grid.cells().windows(2) {
                    assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
                }
            }
        }
    }

    #[test]
    fn test_availability_flags() {
        let today = date(2024, 3, 13);
        let available: AvailableDaySet = [12, 13, 14, 16, 20].into_iter().collect();
        let grid = CalendarGrid::build(today, Some(MeetingType::Phone), today, &available).unwrap();

        let past = grid.cell(date(2024, 3, 12)).unwrap();
        assert!(past.is_past && !past.is_available);

        assert!(grid.cell(date(2024, 3, 13)).unwrap().is_available);
        assert!(grid.cell(date(2024, 3, 14)).unwrap().is_available);

        let saturday = grid.cell(date(2024, 3, 16)).unwrap();
        assert!(saturday.is_weekend && !saturday.is_available);

        assert!(!grid.cell(date(2024, 3, 15)).unwrap().is_available);
        assert_eq!(grid.available_count(), 3);
        assert_eq!(grid.first_available(), Some(date(2024, 3, 13)));
    }

    #[test]
    fn test_out_of_month_cells_never_available() {
        let today = date(2024, 2, 1);
        let grid = CalendarGrid::build(date(2024, 3, 1), Some(MeetingType::Video), today, &whole_month(3, 2024))
            .unwrap();
        // April 1st appears in the trailing row and its day number is in the set.
        let april_first = grid.cell(date(2024, 4, 1)).unwrap();
        assert!(!april_first.in_current_month);
        assert!(!april_first.is_available);
    }

    #[test]
    fn test_title_and_format() {
        let today = date(2024, 12, 2);
        let grid = CalendarGrid::build(today, None, today, &AvailableDaySet::new()).unwrap();
        assert_eq!(grid.title(), "Diciembre 2024");
        assert_eq!(format_date(date(2024, 3, 5)), "5/3/2024");
    }

    #[test]
    fn test_view_without_meeting_type_prompts() {
        let today = date(2024, 3, 1);
        let mut view = CalendarView::new(today, AvailabilityCalculator::default());
        assert_eq!(view.build(today).unwrap(), &CalendarState::NeedsMeetingType);
        assert!(view.grid().is_none());
        assert_eq!(view.select(today), None);
    }

    #[test]
    fn test_navigation_keeps_meeting_type_and_wraps_years() {
        let today = date(2024, 12, 10);
        let mut view = CalendarView::new(today, AvailabilityCalculator::default());
        view.set_meeting_type(Some(MeetingType::Video));

        let next = view.next_month(today).unwrap();
        let CalendarState::Grid(grid) = next else {
            panic!("expected a grid");
        };
        assert_eq!((grid.month(), grid.year()), (1, 2025));
        assert_eq!(grid.meeting_type(), Some(MeetingType::Video));

        view.prev_month(today).unwrap();
        view.prev_month(today).unwrap();
        assert_eq!(view.displayed_month(), date(2024, 11, 1));
        assert_eq!(view.meeting_type(), Some(MeetingType::Video));
        // November is entirely in the past relative to today.
        assert_eq!(view.grid().unwrap().available_count(), 0);
    }

    #[test]
    fn test_select_only_available_cells() {
        let today = date(2024, 3, 4);
        let mut view = CalendarView::new(today, AvailabilityCalculator::new(0.0));
        view.set_meeting_type(Some(MeetingType::InPerson));
        view.build(today).unwrap();

        assert_eq!(view.select(date(2024, 3, 5)), Some("5/3/2024".to_string()));
        assert_eq!(view.select(date(2024, 3, 9)), None, "saturday");
        assert_eq!(view.select(date(2024, 3, 1)), None, "past");
        assert_eq!(view.select(date(2024, 4, 1)), None, "next month");
    }
}
