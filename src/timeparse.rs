use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_english::{parse_date_string, Dialect};

use crate::error::BotError;
use crate::models::{display_tz, LAYOUT_REMIND_AT};

/// Превращает пользовательский ввод в момент срабатывания напоминания.
///
/// Порядок разбора:
/// 1. строгий формат `YYYY-MM-DD HH:mm` в таймзоне отображения;
/// 2. компактная длительность ("30m", "24h", "730h"), прибавляемая к `now`;
/// 3. голое время "HH:mm" — сегодня, либо завтра, если время уже прошло;
/// 4. естественный язык ("tomorrow 19:00", "in 2 hours",
///    "next wednesday at 15:00").
///
/// Результат всегда в UTC с точностью до минуты. Нераспознанный ввод — это
/// `BotError::Parse`: вызывающая сторона переспрашивает пользователя, а не падает.
pub fn resolve(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, BotError> {
    let input = input.trim();
    let tz = display_tz();
    let local_now = now.with_timezone(&tz);

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, LAYOUT_REMIND_AT) {
        if let Some(remind_at) = tz.from_local_datetime(&naive).single() {
            return Ok(truncate_to_minute(remind_at.with_timezone(&Utc)));
        }
    }

    if let Some(delta) = parse_compact_duration(input) {
        return Ok(truncate_to_minute(now + delta));
    }

    if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
        if let Some(mut remind_at) = tz
            .from_local_datetime(&local_now.date_naive().and_time(time))
            .single()
        {
            // время уже прошло — значит, речь про завтра
            if remind_at < truncate_to_minute(local_now) {
                remind_at += Duration::hours(24);
            }
            return Ok(truncate_to_minute(remind_at.with_timezone(&Utc)));
        }
    }

    if let Some(remind_at) = resolve_natural(input, local_now) {
        return Ok(truncate_to_minute(remind_at.with_timezone(&Utc)));
    }

    log::debug!("can't parse remind_at {input:?}");
    Err(BotError::Parse(input.to_string()))
}

/// Ветка естественного языка. chrono-english понимает даты, но не время
/// вида "HH:MM", и паникует на срезе многобайтовых слов, поэтому не-ASCII
/// ввод отклоняется сразу, а относительные фразы и хвостовое "at HH:MM"
/// разбираются до делегирования.
fn resolve_natural(
    input: &str,
    local_now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    if !input.is_ascii() {
        return None;
    }

    if let Some(delta) = parse_relative_phrase(input) {
        return Some(local_now + delta);
    }

    let (date_part, time) = split_trailing_time(input);
    let parsed = parse_date_string(date_part, local_now, Dialect::Uk).ok()?;

    match time {
        Some(time) => local_now
            .timezone()
            .from_local_datetime(&parsed.date_naive().and_time(time))
            .single(),
        None => Some(parsed),
    }
}

/// "in 2 hours", "in 30 minutes" и тому подобное.
fn parse_relative_phrase(input: &str) -> Option<Duration> {
    let mut words = input.split_whitespace();
    if words.next()? != "in" {
        return None;
    }
    let value: i64 = words.next()?.parse().ok()?;
    let unit = words.next()?;
    if words.next().is_some() {
        return None;
    }

    match unit.trim_end_matches('s') {
        "second" => Duration::try_seconds(value),
        "minute" => Duration::try_minutes(value),
        "hour" => Duration::try_hours(value),
        "day" => Duration::try_days(value),
        "week" => Duration::try_weeks(value),
        _ => None,
    }
}

/// Отделяет хвостовое "HH:MM" (с необязательным "at" перед ним) от
/// датовой части: "next wednesday at 15:00" -> ("next wednesday", 15:00).
fn split_trailing_time(input: &str) -> (&str, Option<NaiveTime>) {
    let Some((prefix, last)) = input.rsplit_once(char::is_whitespace) else {
        return (input, None);
    };

    let Ok(time) = NaiveTime::parse_from_str(last, "%H:%M") else {
        return (input, None);
    };

    let prefix = prefix.trim_end();
    (prefix.strip_suffix(" at").unwrap_or(prefix), Some(time))
}

fn truncate_to_minute<Tz: TimeZone>(dt: DateTime<Tz>) -> DateTime<Tz> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or_else(|| dt.clone())
}

/// Длительность вида "30m", "24h", "1h30m". Единицы: s, m, h, d, w.
fn parse_compact_duration(s: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut seen_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let value: i64 = digits.parse().ok()?;
        digits.clear();

        let part = match ch {
            's' => Duration::try_seconds(value),
            'm' => Duration::try_minutes(value),
            'h' => Duration::try_hours(value),
            'd' => Duration::try_days(value),
            'w' => Duration::try_weeks(value),
            _ => return None,
        }?;

        total = total.checked_add(&part)?;
        seen_unit = true;
    }

    if !digits.is_empty() || !seen_unit {
        return None;
    }

    Some(total)
}
