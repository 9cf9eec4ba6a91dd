use crate::types::schedule::{Frequency, ReminderDefinition, ReminderWindow};

use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use rand::Rng;
use rand::rngs::OsRng;
use time::{Duration, OffsetDateTime};

const DELIVERY_COOLDOWN: Duration = Duration::hours(1);
const TIME_MATCH_TOLERANCE_MINUTES: i64 = 15;
const WAKE_WINDOW_HOURS: std::ops::Range<u32> = 6..22;
const DEFAULT_WEEKLY_DAY: u8 = 1; // days count from Sunday = 0

pub fn is_due(reminder: &ReminderDefinition, timezone: &str, now: OffsetDateTime) -> bool {
    if let Some(last_sent) = reminder.last_sent
        && now - last_sent < DELIVERY_COOLDOWN
    {
        return false;
    }

    let Some(local) = local_civil_time(timezone, now) else {
        return false;
    };

    if matches!(reminder.frequency, Frequency::Daily | Frequency::Multiple)
        && !WAKE_WINDOW_HOURS.contains(&local.hour)
    {
        return false;
    }

    if !matches_scheduled_time(&reminder.times, local.hour, local.minute) {
        return false;
    }

    match reminder.frequency {
        Frequency::Daily | Frequency::Multiple => true,
        Frequency::Weekly => local.weekday == reminder.day_of_week.unwrap_or(DEFAULT_WEEKLY_DAY),
        Frequency::Monthly => local.day_of_month == 1,
    }
}

struct LocalCivilTime {
    hour: u32,
    minute: u32,
    weekday: u8,
    day_of_month: u32,
}

fn local_civil_time(timezone: &str, now: OffsetDateTime) -> Option<LocalCivilTime> {
    let zone: Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    let utc = chrono::DateTime::from_timestamp(now.unix_timestamp(), 0)?;
    let local = utc.with_timezone(&zone);
    Some(LocalCivilTime {
        hour: local.hour(),
        minute: local.minute(),
        weekday: local.weekday().num_days_from_sunday() as u8,
        day_of_month: local.day(),
    })
}

fn matches_scheduled_time(times: &[String], hour: u32, minute: u32) -> bool {
    times
        .iter()
        .filter_map(|raw| parse_clock_time(raw))
        .any(|(scheduled_hour, scheduled_minute)| {
            scheduled_hour == hour
                && (i64::from(scheduled_minute) - i64::from(minute)).abs()
                    < TIME_MATCH_TOLERANCE_MINUTES
        })
}

fn parse_clock_time(raw: &str) -> Option<(u32, u32)> {
    let (hour, minute) = raw.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

fn window_minutes(window: ReminderWindow) -> std::ops::Range<u32> {
    match window {
        ReminderWindow::Morning => 6 * 60..11 * 60,
        ReminderWindow::Midday => 11 * 60..14 * 60,
        ReminderWindow::Afternoon => 14 * 60..18 * 60,
        ReminderWindow::Evening => 18 * 60..22 * 60,
    }
}

pub fn generate_times(
    frequency: Frequency,
    windows: &[ReminderWindow],
    times_per_day: u32,
) -> Vec<String> {
    let mut rng = OsRng;
    generate_times_with_rng(&mut rng, frequency, windows, times_per_day)
}

pub fn generate_times_with_rng<R: Rng>(
    rng: &mut R,
    frequency: Frequency,
    windows: &[ReminderWindow],
    times_per_day: u32,
) -> Vec<String> {
    let selected: &[ReminderWindow] = if windows.is_empty() {
        &[ReminderWindow::Morning]
    } else {
        windows
    };

    let mut minutes: Vec<u32> = match frequency {
        Frequency::Multiple => {
            let count = times_per_day.clamp(1, 24) as usize;
            (0..count)
                .map(|slot| {
                    let window = selected[slot % selected.len()];
                    rng.gen_range(window_minutes(window))
                })
                .collect()
        }
        _ => selected
            .iter()
            .map(|window| rng.gen_range(window_minutes(*window)))
            .collect(),
    };

    minutes.sort_unstable();
    minutes
        .into_iter()
        .map(|minute_of_day| format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60))
        .collect()
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use time::format_description::well_known::Rfc3339;

    fn at(stamp: &str) -> OffsetDateTime {
        OffsetDateTime::parse(stamp, &Rfc3339).expect("timestamp")
    }

    fn reminder(frequency: Frequency, times: &[&str]) -> ReminderDefinition {
        ReminderDefinition {
            id: "r-1".to_string(),
            frequency,
            times: times.iter().map(|raw| raw.to_string()).collect(),
            day_of_week: None,
            times_per_day: None,
            reminder_windows: Vec::new(),
            last_sent: None,
        }
    }

    #[test]
    fn is_due__should_match_daily_time_within_tolerance() {
        let daily = reminder(Frequency::Daily, &["09:00"]);

        assert!(is_due(&daily, "UTC", at("2025-01-13T09:02:00Z")));
        assert!(is_due(&daily, "UTC", at("2025-01-13T09:14:00Z")));
    }

    #[test]
    fn is_due__should_reject_minute_difference_of_fifteen() {
        let daily = reminder(Frequency::Daily, &["09:00"]);

        assert!(!is_due(&daily, "UTC", at("2025-01-13T09:15:00Z")));
    }

    #[test]
    fn is_due__should_not_match_across_hour_boundaries() {
        // 09:50 and 10:02 are twelve minutes apart but in different hours
        let daily = reminder(Frequency::Daily, &["09:50"]);

        assert!(!is_due(&daily, "UTC", at("2025-01-13T10:02:00Z")));
    }

    #[test]
    fn is_due__should_respect_delivery_cooldown() {
        // Given
        let mut daily = reminder(Frequency::Daily, &["09:00"]);
        let now = at("2025-01-13T09:02:00Z");

        // When a dispatch happened half an hour ago
        daily.last_sent = Some(now - Duration::minutes(30));

        // Then
        assert!(!is_due(&daily, "UTC", now));

        // When the last dispatch is older than an hour
        daily.last_sent = Some(now - Duration::minutes(61));
        assert!(is_due(&daily, "UTC", now));
    }

    #[test]
    fn is_due__should_suppress_daily_reminders_outside_wake_hours() {
        let early = reminder(Frequency::Daily, &["05:45"]);
        let late = reminder(Frequency::Daily, &["22:00"]);

        assert!(!is_due(&early, "UTC", at("2025-01-13T05:50:00Z")));
        assert!(!is_due(&late, "UTC", at("2025-01-13T22:05:00Z")));
    }

    #[test]
    fn is_due__should_not_apply_wake_hours_to_weekly_reminders() {
        // Monday 05:02, explicitly scheduled before the usual wake window
        let weekly = reminder(Frequency::Weekly, &["05:00"]);

        assert!(is_due(&weekly, "UTC", at("2025-01-13T05:02:00Z")));
    }

    #[test]
    fn is_due__should_default_weekly_reminders_to_monday() {
        let weekly = reminder(Frequency::Weekly, &["10:00"]);

        // 2025-01-13 is a Monday, 2025-01-14 a Tuesday
        assert!(is_due(&weekly, "UTC", at("2025-01-13T10:05:00Z")));
        assert!(!is_due(&weekly, "UTC", at("2025-01-14T10:05:00Z")));
    }

    #[test]
    fn is_due__should_use_explicit_weekly_day() {
        let mut weekly = reminder(Frequency::Weekly, &["10:00"]);
        weekly.day_of_week = Some(0);

        // 2025-01-12 is a Sunday
        assert!(is_due(&weekly, "UTC", at("2025-01-12T10:05:00Z")));
        assert!(!is_due(&weekly, "UTC", at("2025-01-13T10:05:00Z")));
    }

    #[test]
    fn is_due__should_fire_monthly_reminders_on_the_first() {
        let monthly = reminder(Frequency::Monthly, &["09:00"]);

        assert!(is_due(&monthly, "UTC", at("2024-03-01T09:05:00Z")));
        assert!(!is_due(&monthly, "UTC", at("2024-03-02T09:05:00Z")));
    }

    #[test]
    fn is_due__should_evaluate_in_the_reminder_timezone() {
        // Given a Sydney subscriber in southern-hemisphere summer (UTC+11)
        let daily = reminder(Frequency::Daily, &["09:00"]);

        // 22:02 UTC on the 11th is 09:02 on the 12th in Sydney
        assert!(is_due(&daily, "Australia/Sydney", at("2025-01-11T22:02:00Z")));
        assert!(!is_due(&daily, "UTC", at("2025-01-11T22:02:00Z")));
    }

    #[test]
    fn is_due__should_fall_back_to_utc_for_unknown_timezones() {
        let daily = reminder(Frequency::Daily, &["09:00"]);

        assert!(is_due(&daily, "Mars/Olympus_Mons", at("2025-01-13T09:02:00Z")));
    }

    #[test]
    fn is_due__should_skip_unparseable_time_entries() {
        let mixed = reminder(Frequency::Daily, &["soon", "09:00"]);
        let broken = reminder(Frequency::Daily, &["99:00"]);

        assert!(is_due(&mixed, "UTC", at("2025-01-13T09:02:00Z")));
        assert!(!is_due(&broken, "UTC", at("2025-01-13T09:02:00Z")));
    }

    #[test]
    fn is_due__should_treat_multiple_like_daily_for_matching() {
        let multiple = reminder(Frequency::Multiple, &["09:00", "15:00"]);

        assert!(is_due(&multiple, "UTC", at("2025-01-13T15:10:00Z")));
        assert!(!is_due(&multiple, "UTC", at("2025-01-13T12:00:00Z")));
    }

    fn minute_of_day(raw: &str) -> u32 {
        let (hour, minute) = parse_clock_time(raw).expect("generated time parses");
        hour * 60 + minute
    }

    #[test]
    fn generate_times_with_rng__should_pick_one_time_per_window_for_daily() {
        // Given
        let mut rng = StdRng::from_seed([9u8; 32]);
        let windows = [ReminderWindow::Morning, ReminderWindow::Evening];

        // When
        let times = generate_times_with_rng(&mut rng, Frequency::Daily, &windows, 1);

        // Then
        assert_eq!(times.len(), 2);
        assert!(windows
            .iter()
            .any(|window| window_minutes(*window).contains(&minute_of_day(&times[0]))));
        assert!(windows
            .iter()
            .any(|window| window_minutes(*window).contains(&minute_of_day(&times[1]))));
        assert!(minute_of_day(&times[0]) <= minute_of_day(&times[1]));
    }

    #[test]
    fn generate_times_with_rng__should_spread_multiple_across_windows() {
        // Given
        let mut rng = StdRng::from_seed([9u8; 32]);
        let windows = [ReminderWindow::Morning];

        // When
        let times = generate_times_with_rng(&mut rng, Frequency::Multiple, &windows, 5);

        // Then
        assert_eq!(times.len(), 5);
        for raw in &times {
            assert!(window_minutes(ReminderWindow::Morning).contains(&minute_of_day(raw)));
        }
    }

    #[test]
    fn generate_times_with_rng__should_default_to_morning_and_clamp_count() {
        let mut rng = StdRng::from_seed([9u8; 32]);

        let times = generate_times_with_rng(&mut rng, Frequency::Multiple, &[], 0);

        assert_eq!(times.len(), 1);
        assert!(window_minutes(ReminderWindow::Morning).contains(&minute_of_day(&times[0])));
    }

    #[test]
    fn generate_times_with_rng__should_zero_pad_entries() {
        let mut rng = StdRng::from_seed([9u8; 32]);

        let times = generate_times_with_rng(&mut rng, Frequency::Daily, &[], 1);

        assert_eq!(times[0].len(), 5);
        assert_eq!(&times[0][2..3], ":");
    }
}
