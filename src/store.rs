use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::*;

/// Error surface of the record store adapter. The engine propagates these;
/// retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    NotFound(BookingId),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::NotFound(id) => write!(f, "record not found: {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Thin interface over the external document store holding booking records.
/// `atomic_batch` is all-or-nothing: no partial application is observable.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, booking: Booking) -> Result<(), StoreError>;
    async fn get(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;
    async fn query(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError>;
    async fn update(&self, id: BookingId, patch: BookingPatch) -> Result<(), StoreError>;
    async fn delete(&self, id: BookingId) -> Result<(), StoreError>;
    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;
}

/// In-memory reference store. Backs the test suite and local tooling; the
/// production adapter wraps the remote document store behind the same trait.
pub struct MemoryStore {
    records: DashMap<BookingId, Booking>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { records: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, booking: Booking) -> Result<(), StoreError> {
        self.records.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn query(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let mut out: Vec<Booking> = self
            .records
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|b| (b.created_at, b.id));
        Ok(out)
    }

    async fn update(&self, id: BookingId, patch: BookingPatch) -> Result<(), StoreError> {
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply(entry.value_mut());
        Ok(())
    }

    async fn delete(&self, id: BookingId) -> Result<(), StoreError> {
        self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }

    /// Two-phase: validate every op against current state, then apply all.
    /// Validation failures leave the store untouched.
    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        for op in &ops {
            match op {
                BatchOp::Create(_) => {}
                BatchOp::Update(id, _) | BatchOp::Delete(id) => {
                    if !self.records.contains_key(id) {
                        return Err(StoreError::NotFound(*id));
                    }
                }
            }
        }
        for op in ops {
            match op {
                BatchOp::Create(booking) => {
                    self.records.insert(booking.id, booking);
                }
                BatchOp::Update(id, patch) => {
                    if let Some(mut entry) = self.records.get_mut(&id) {
                        patch.apply(entry.value_mut());
                    }
                }
                BatchOp::Delete(id) => {
                    self.records.remove(&id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn booking(court: CourtId, user: &str, created_at: Ms) -> Booking {
        let mut b = Booking::new(user.to_string(), court, AdmissionState::Pending, created_at);
        b.created_at = created_at;
        b
    }

    #[test]
    fn crud_roundtrip() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let court = Ulid::new();
            let b = booking(court, "u1", 100);
            let id = b.id;

            store.create(b.clone()).await.unwrap();
            assert_eq!(store.get(id).await.unwrap(), Some(b));

            store
                .update(id, BookingPatch { state: Some(AdmissionState::Confirmed), slot: Some(Some(0)), updated_at: Some(200) })
                .await
                .unwrap();
            let got = store.get(id).await.unwrap().unwrap();
            assert_eq!(got.state, AdmissionState::Confirmed);
            assert_eq!(got.slot, Some(0));

            store.delete(id).await.unwrap();
            assert_eq!(store.get(id).await.unwrap(), None);
            assert_eq!(store.delete(id).await.unwrap_err(), StoreError::NotFound(id));
        });
    }

    #[test]
    fn query_filters_and_orders_by_created_at() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let court = Ulid::new();
            let other = Ulid::new();

            store.create(booking(court, "b", 300)).await.unwrap();
            store.create(booking(court, "a", 100)).await.unwrap();
            store.create(booking(other, "c", 200)).await.unwrap();

            let got = store.query(BookingFilter::court(court)).await.unwrap();
            assert_eq!(got.len(), 2);
            assert_eq!(got[0].user_id, "a");
            assert_eq!(got[1].user_id, "b");
        });
    }

    #[test]
    fn atomic_batch_is_all_or_nothing() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let court = Ulid::new();
            let existing = booking(court, "u1", 100);
            let existing_id = existing.id;
            store.create(existing).await.unwrap();

            let missing = Ulid::new();
            let err = store
                .atomic_batch(vec![
                    BatchOp::Update(existing_id, BookingPatch { state: Some(AdmissionState::Confirmed), slot: Some(Some(0)), updated_at: None }),
                    BatchOp::Delete(missing),
                ])
                .await
                .unwrap_err();
            assert_eq!(err, StoreError::NotFound(missing));

            // First op must not have been applied.
            let got = store.get(existing_id).await.unwrap().unwrap();
            assert_eq!(got.state, AdmissionState::Pending);
            assert_eq!(got.slot, None);
        });
    }

    #[test]
    fn atomic_batch_applies_mixed_ops() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let court = Ulid::new();
            let a = booking(court, "a", 100);
            let b = booking(court, "b", 200);
            let (a_id, b_id) = (a.id, b.id);
            store.create(a).await.unwrap();
            store.create(b).await.unwrap();

            let c = booking(court, "c", 300);
            let c_id = c.id;
            store
                .atomic_batch(vec![
                    BatchOp::Delete(a_id),
                    BatchOp::Update(b_id, BookingPatch { slot: Some(Some(1)), state: Some(AdmissionState::Confirmed), updated_at: None }),
                    BatchOp::Create(c),
                ])
                .await
                .unwrap();

            assert_eq!(store.get(a_id).await.unwrap(), None);
            assert_eq!(store.get(b_id).await.unwrap().unwrap().slot, Some(1));
            assert!(store.get(c_id).await.unwrap().is_some());
        });
    }
}
