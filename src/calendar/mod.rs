//! Calendar events: dated, owner-scoped entries created explicitly or from chat

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::UserId;
use crate::store::StoreAdapter;
use crate::utils::errors::AstraError;
use crate::Result;

/// A scheduled event; never mutated in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub owner: UserId,
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Calendar day the event falls on
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Date-only values are committed at noon so display offsets never shift the day
pub fn at_noon(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(noon()).and_utc()
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// First and last instant of a month, both inclusive
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AstraError::invalid_date(format!("{:04}-{:02}", year, month)))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AstraError::invalid_date(format!("{:04}-{:02}", year, month)))?;

    let start = first.and_time(NaiveTime::MIN).and_utc();
    let end = next.and_time(NaiveTime::MIN).and_utc() - Duration::microseconds(1);
    Ok((start, end))
}

/// Events that fall on `day`
pub fn on_day(events: &[Event], day: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|e| e.day() == day).collect()
}

/// Owner-scoped event operations
#[derive(Clone)]
pub struct EventRepository {
    store: StoreAdapter,
}

impl EventRepository {
    pub fn new(store: StoreAdapter) -> Self {
        Self { store }
    }

    /// All of the user's events by date; nobody signed in means no events
    pub async fn list(&self, user: Option<&UserId>) -> Result<Vec<Event>> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        self.store.list_events(user, None).await
    }

    /// Events dated within the given month
    pub async fn list_month(&self, user: Option<&UserId>, year: i32, month: u32) -> Result<Vec<Event>> {
        let range = month_bounds(year, month)?;
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        let events = self.store.list_events(user, Some(range)).await?;
        tracing::debug!(
            "loaded {} events for {}-{:02}",
            events.len(),
            range.0.year(),
            range.0.month()
        );
        Ok(events)
    }

    /// Schedule an event on `day` (stored at noon UTC)
    pub async fn create(&self, user: Option<&UserId>, title: &str, day: NaiveDate) -> Result<Event> {
        let user = user.ok_or(AstraError::NotSignedIn)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(AstraError::validation("title", "event title cannot be empty"));
        }

        let event = self.store.insert_event(user, title, at_noon(day)).await?;
        tracing::info!("scheduled event {} on {}", event.id, day);
        Ok(event)
    }

    pub async fn delete(&self, user: Option<&UserId>, event_id: &str) -> Result<()> {
        let user = user.ok_or(AstraError::NotSignedIn)?;
        self.store.delete_event(user, event_id).await?;
        tracing::info!("deleted event {}", event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use chrono::Timelike;
    use std::sync::Arc;

    fn repository() -> (Arc<MemoryStore>, EventRepository) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), EventRepository::new(StoreAdapter::new(store)))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start.date_naive(), day(2024, 2, 1));
        assert_eq!(end.date_naive(), day(2024, 2, 29));
        assert_eq!(end.hour(), 23);

        let (_, end) = month_bounds(2025, 12).unwrap();
        assert_eq!(end.date_naive(), day(2025, 12, 31));
        assert!(month_bounds(2025, 13).is_err());
    }

    #[test]
    fn test_at_noon() {
        let at = at_noon(day(2025, 3, 20));
        assert_eq!(at.to_rfc3339(), "2025-03-20T12:00:00+00:00");
    }

    #[tokio::test]
    async fn test_list_month_is_inclusive() {
        let (_, repo) = repository();
        let user = UserId::new("u1");
        for (title, d) in [("before", day(2025, 2, 28)), ("first", day(2025, 3, 1)), ("last", day(2025, 3, 31)), ("after", day(2025, 4, 1))] {
            repo.create(Some(&user), title, d).await.unwrap();
        }

        let events = repo.list_month(Some(&user), 2025, 3).await.unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "last"]);
        assert_eq!(on_day(&events, day(2025, 3, 31)).len(), 1);
        assert_eq!(repo.list(Some(&user)).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_validation_and_auth_short_circuit() {
        let (store, repo) = repository();
        let user = UserId::new("u1");

        assert!(matches!(
            repo.create(Some(&user), "   ", day(2025, 3, 1)).await,
            Err(AstraError::Validation { .. })
        ));
        assert!(matches!(
            repo.create(None, "Standup", day(2025, 3, 1)).await,
            Err(AstraError::NotSignedIn)
        ));
        assert!(matches!(repo.delete(None, "e1").await, Err(AstraError::NotSignedIn)));
        assert!(repo.list(None).await.unwrap().is_empty());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let (store, repo) = repository();
        let owner = UserId::new("u1");
        let event = repo.create(Some(&owner), "Review", day(2025, 5, 2)).await.unwrap();

        repo.delete(Some(&UserId::new("u2")), &event.id).await.unwrap();
        assert_eq!(repo.list(Some(&owner)).await.unwrap().len(), 1);

        repo.delete(Some(&owner), &event.id).await.unwrap();
        assert!(repo.list(Some(&owner)).await.unwrap().is_empty());
        assert_eq!(
            store.calls().iter().filter(|c| c.op == StoreOp::Delete).count(),
            2
        );
    }
}
