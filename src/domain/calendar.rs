use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT).ok()
}

/// Calendar day of `now` in `timezone`, or in the host timezone when none is set.
pub fn local_date(now: DateTime<Utc>, timezone: Option<Tz>) -> NaiveDate {
    match timezone {
        Some(tz) => now.with_timezone(&tz).date_naive(),
        None => now.with_timezone(&Local).date_naive(),
    }
}

/// Sunday on or before `anchor`.
pub fn start_of_week(anchor: NaiveDate) -> NaiveDate {
    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_sunday()))
}

#[derive(Clone)]
pub struct StudyClock {
    now_provider: NowProvider,
    timezone: Option<Tz>,
}

impl StudyClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self {
            now_provider: Arc::new(Utc::now),
            timezone,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn today(&self) -> NaiveDate {
        local_date(self.now(), self.timezone)
    }

    pub fn today_key(&self) -> String {
        date_key(self.today())
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }
}

impl Default for StudyClock {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for StudyClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyClock")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
