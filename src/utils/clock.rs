use chrono::{DateTime, Local, Utc};

/// Represents an entity responsible for providing dates across the
/// application. This allows decision logic to stay deterministic in tests.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Timezone designation of the local clock at this moment. Captured once
    /// per observation and stored verbatim, never reprocessed later.
    fn timezone(&self) -> String;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone(&self) -> String {
        Local::now().format("%Z").to_string()
    }
}
