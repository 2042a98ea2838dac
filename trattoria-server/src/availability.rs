//! Reservation time-slot availability
//!
//! Pure computation: the handler loads blocking events and overlapping
//! bookings for the service window, this module decides which start times
//! can still take the requested party. All wall-clock times are interpreted
//! in the restaurant timezone; everything else is Unix millis.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{SlotUnavailableReason, TimeSlot};

const MINUTE_MS: i64 = 60_000;

/// Booking rules for the dining room
#[derive(Debug, Clone)]
pub struct ReservationPolicy {
    pub timezone: Tz,
    /// First seating
    pub open: NaiveTime,
    /// Kitchen close; the last seating ends here
    pub close: NaiveTime,
    pub slot_minutes: u32,
    pub seating_minutes: u32,
    /// Covers that may be seated during any overlapping interval
    pub max_covers: i32,
    pub max_party_size: i32,
    /// Minimum notice before a slot starts
    pub lead_minutes: i64,
    /// How many days ahead bookings are accepted
    pub horizon_days: i64,
    pub closed_weekdays: Vec<Weekday>,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Rome,
            open: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            seating_minutes: 90,
            max_covers: 40,
            max_party_size: 10,
            lead_minutes: 60,
            horizon_days: 60,
            closed_weekdays: vec![Weekday::Mon],
        }
    }
}

impl ReservationPolicy {
    pub fn seating_ms(&self) -> i64 {
        i64::from(self.seating_minutes) * MINUTE_MS
    }

    pub fn is_closed_on(&self, date: NaiveDate) -> bool {
        self.closed_weekdays.contains(&date.weekday())
    }

    /// Service window `[open, close)` of a day in Unix millis, used to load
    /// the bookings and events that can collide with any slot of that day.
    pub fn service_window(&self, date: NaiveDate) -> Option<Window> {
        let start = resolve_local(date, self.open, self.timezone)?;
        let end = resolve_local(date, self.close, self.timezone)
            .unwrap_or(start + self.minutes_between_open_and_close() * MINUTE_MS);
        Some(Window { start, end })
    }

    fn minutes_between_open_and_close(&self) -> i64 {
        i64::from(minute_of_day(self.close)) - i64::from(minute_of_day(self.open))
    }

    pub fn validate_party_size(&self, party_size: i32) -> AppResult<()> {
        if party_size < 1 || party_size > self.max_party_size {
            return Err(AppError::with_message(
                ErrorCode::PartySizeInvalid,
                format!("Party size must be between 1 and {}", self.max_party_size),
            )
            .with_detail("max_party_size", self.max_party_size));
        }
        Ok(())
    }

    /// Reject dates before today or beyond the booking horizon (restaurant tz).
    pub fn validate_date(&self, date: NaiveDate, now_ms: i64) -> AppResult<()> {
        let today = local_today(now_ms, self.timezone);
        let last = today + chrono::Duration::days(self.horizon_days);
        if date < today || date > last {
            return Err(AppError::with_message(
                ErrorCode::ReservationDateOutOfRange,
                format!("Reservations are accepted from {today} to {last}"),
            ));
        }
        Ok(())
    }
}

/// Half-open interval `[start, end)` in Unix millis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Existing booking occupying covers
#[derive(Debug, Clone, Copy)]
pub struct Booking {
    pub window: Window,
    pub party_size: i32,
}

/// Compute every candidate slot of `date` for a party of `party_size`.
///
/// Closed weekdays yield no slots. Local start times that fall in a DST gap
/// are skipped; ambiguous ones resolve to the earlier instant.
pub fn compute_slots(
    policy: &ReservationPolicy,
    date: NaiveDate,
    party_size: i32,
    now_ms: i64,
    blocking_events: &[Window],
    bookings: &[Booking],
) -> Vec<TimeSlot> {
    if policy.is_closed_on(date) || policy.slot_minutes == 0 {
        return Vec::new();
    }

    let open = minute_of_day(policy.open);
    let close = minute_of_day(policy.close);
    let Some(last_start) = close.checked_sub(policy.seating_minutes) else {
        return Vec::new();
    };
    if last_start < open {
        return Vec::new();
    }

    let earliest_start = now_ms + policy.lead_minutes * MINUTE_MS;
    let mut slots = Vec::new();

    for minute in (open..=last_start).step_by(policy.slot_minutes as usize) {
        let Some(time) = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0) else {
            continue;
        };
        let Some(start) = resolve_local(date, time, policy.timezone) else {
            continue;
        };
        let window = Window {
            start,
            end: start + policy.seating_ms(),
        };

        let reason = if start < earliest_start {
            Some(SlotUnavailableReason::Past)
        } else if blocking_events.iter().any(|e| e.overlaps(&window)) {
            Some(SlotUnavailableReason::Event)
        } else if covers_in_use(bookings, &window) + party_size > policy.max_covers {
            Some(SlotUnavailableReason::Full)
        } else {
            None
        };

        slots.push(TimeSlot {
            time: time.format("%H:%M").to_string(),
            starts_at: start,
            available: reason.is_none(),
            reason,
        });
    }

    slots
}

fn covers_in_use(bookings: &[Booking], window: &Window) -> i32 {
    bookings
        .iter()
        .filter(|b| b.window.overlaps(window))
        .map(|b| b.party_size)
        .sum()
}

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::invalid_field("date", format!("Invalid date format: {date}")))
}

/// Parse a wall-clock time (HH:MM)
pub fn parse_time(time: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| AppError::invalid_field("time", format!("Invalid time format: {time}")))
}

/// Local date + time → Unix millis, `None` inside a DST gap.
pub fn resolve_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<i64> {
    date.and_time(time)
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

fn local_today(now_ms: i64, tz: Tz) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
