//! Typed, owner-scoped operations over a [`RemoteStore`]

use super::{timestamp, Filter, Order, RemoteStore, Row, StoreError, Table};
use crate::board::{Task, TaskStatus};
use crate::calendar::Event;
use crate::chat::ChatMessage;
use crate::session::UserId;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Typed access to the task, event and chat tables
///
/// Every call is filtered on the owner column; there is no way to reach
/// another user's rows through this type.
#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn RemoteStore>,
}

#[derive(Deserialize)]
struct TaskRow {
    #[serde(deserialize_with = "id_text")]
    id: String,
    content: String,
    status: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NewTask<'a> {
    content: &'a str,
    status: &'static str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct EventRow {
    #[serde(deserialize_with = "id_text")]
    id: String,
    title: String,
    date: DateTime<Utc>,
    user_id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct NewEvent<'a> {
    title: &'a str,
    date: String,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct MessageRow {
    #[serde(deserialize_with = "id_text")]
    id: String,
    message: String,
    is_user: bool,
    user_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    message: &'a str,
    is_user: bool,
    user_id: &'a str,
}

/// Ids are opaque; accept both text and integer keys
fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {}", other))),
    }
}

fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        _ => Err(StoreError::invalid_response("row must be an object").into()),
    }
}

fn from_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        StoreError::invalid_response(format!("malformed {} row: {}", table, e)).into()
    })
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: self.id,
            content: self.content,
            status: self.status.parse()?,
            owner: UserId::new(self.user_id),
            created_at: self.created_at,
        })
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            date: row.date,
            owner: UserId::new(row.user_id),
            created_at: row.created_at,
        }
    }
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            text: row.message,
            is_user: row.is_user,
            owner: UserId::new(row.user_id),
            created_at: row.created_at,
        }
    }
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    /// All of the user's tasks, oldest first
    pub async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>> {
        let rows = self
            .store
            .select(Table::Tasks, &[Filter::owner(user)], Some(&Order::asc("created_at")))
            .await?;
        rows.into_iter()
            .map(|row| from_row::<TaskRow>(Table::Tasks, row)?.into_task())
            .collect()
    }

    pub async fn insert_task(&self, user: &UserId, content: &str, status: TaskStatus) -> Result<Task> {
        let row = to_row(&NewTask {
            content,
            status: status.as_str(),
            user_id: user.as_str(),
        })?;
        let stored = self.store.insert(Table::Tasks, row).await?;
        from_row::<TaskRow>(Table::Tasks, stored)?.into_task()
    }

    /// Single status write, scoped by task id and owner
    pub async fn update_task_status(&self, user: &UserId, task_id: &str, status: TaskStatus) -> Result<()> {
        let mut patch = Row::new();
        patch.insert("status".to_string(), Value::String(status.as_str().to_string()));
        self.store
            .update(Table::Tasks, task_id, patch, &[Filter::owner(user)])
            .await?;
        Ok(())
    }

    pub async fn delete_task(&self, user: &UserId, task_id: &str) -> Result<()> {
        self.store
            .delete(Table::Tasks, task_id, &[Filter::owner(user)])
            .await?;
        Ok(())
    }

    /// The user's events ordered by date, optionally limited to an inclusive range
    pub async fn list_events(
        &self,
        user: &UserId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Event>> {
        let mut filters = vec![Filter::owner(user)];
        if let Some((start, end)) = range {
            filters.push(Filter::gte("date", timestamp(start)));
            filters.push(Filter::lte("date", timestamp(end)));
        }
        let rows = self
            .store
            .select(Table::Events, &filters, Some(&Order::asc("date")))
            .await?;
        rows.into_iter()
            .map(|row| from_row::<EventRow>(Table::Events, row).map(Event::from))
            .collect()
    }

    pub async fn insert_event(&self, user: &UserId, title: &str, date: DateTime<Utc>) -> Result<Event> {
        let row = to_row(&NewEvent {
            title,
            date: timestamp(date),
            user_id: user.as_str(),
        })?;
        let stored = self.store.insert(Table::Events, row).await?;
        from_row::<EventRow>(Table::Events, stored).map(Event::from)
    }

    pub async fn delete_event(&self, user: &UserId, event_id: &str) -> Result<()> {
        self.store
            .delete(Table::Events, event_id, &[Filter::owner(user)])
            .await?;
        Ok(())
    }

    /// The user's conversation, oldest first
    pub async fn list_messages(&self, user: &UserId) -> Result<Vec<ChatMessage>> {
        let rows = self
            .store
            .select(
                Table::ChatHistory,
                &[Filter::owner(user)],
                Some(&Order::asc("created_at")),
            )
            .await?;
        rows.into_iter()
            .map(|row| from_row::<MessageRow>(Table::ChatHistory, row).map(ChatMessage::from))
            .collect()
    }

    pub async fn insert_message(&self, user: &UserId, text: &str, is_user: bool) -> Result<ChatMessage> {
        let row = to_row(&NewMessage {
            message: text,
            is_user,
            user_id: user.as_str(),
        })?;
        let stored = self.store.insert(Table::ChatHistory, row).await?;
        from_row::<MessageRow>(Table::ChatHistory, stored).map(ChatMessage::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};
    use crate::utils::errors::AstraError;
    use chrono::TimeZone;
    use serde_json::json;

    fn adapter() -> (Arc<MemoryStore>, StoreAdapter) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), StoreAdapter::new(store))
    }

    #[tokio::test]
    async fn test_tasks_are_scoped_to_owner() {
        let (_, adapter) = adapter();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let task = adapter.insert_task(&alice, "write report", TaskStatus::Todo).await.unwrap();
        adapter.insert_task(&bob, "other", TaskStatus::Done).await.unwrap();

        let tasks = adapter.list_tasks(&alice).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0], task);
        assert_eq!(task.owner, alice);

        adapter.update_task_status(&bob, &task.id, TaskStatus::Done).await.unwrap();
        adapter.delete_task(&bob, &task.id).await.unwrap();
        let tasks = adapter.list_tasks(&alice).await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn test_unknown_status_surfaces() {
        let (store, adapter) = adapter();
        store
            .seed(
                Table::Tasks,
                json!({"content": "x", "status": "archived", "user_id": "alice"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await;

        let err = adapter.list_tasks(&UserId::new("alice")).await.unwrap_err();
        assert!(matches!(err, AstraError::UnknownStatus { ref value } if value == "archived"));
    }

    #[tokio::test]
    async fn test_events_range_is_inclusive_and_ordered() {
        let (_, adapter) = adapter();
        let user = UserId::new("alice");
        let at = |d: u32| Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap();

        adapter.insert_event(&user, "late", at(31)).await.unwrap();
        adapter.insert_event(&user, "early", at(1)).await.unwrap();
        adapter.insert_event(&user, "mid", at(20)).await.unwrap();

        let events = adapter
            .list_events(&user, Some((at(1), at(20))))
            .await
            .unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "mid"]);
        assert_eq!(events[1].date, at(20));
    }

    #[tokio::test]
    async fn test_messages_round_trip() {
        let (store, adapter) = adapter();
        let user = UserId::new("alice");
        adapter.insert_message(&user, "hello", true).await.unwrap();
        adapter.insert_message(&user, "hi there", false).await.unwrap();

        let history = adapter.list_messages(&user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_user);
        assert_eq!(history[1].text, "hi there");
        assert_eq!(
            store.calls().iter().filter(|c| c.op == StoreOp::Insert).count(),
            2
        );
    }

    #[test]
    fn test_integer_ids_are_accepted() {
        let row = json!({"id": 42, "title": "t", "date": "2025-03-20T12:00:00+00:00", "user_id": "u"});
        let event: Event = from_row::<EventRow>(Table::Events, row.as_object().cloned().unwrap())
            .map(Event::from)
            .unwrap();
        assert_eq!(event.id, "42");
        assert!(event.created_at.is_none());
    }
}
