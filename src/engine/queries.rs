use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// The user's live claim on a court, if any. At most one exists.
    pub async fn claim_status(
        &self,
        court_id: CourtId,
        user_id: &str,
    ) -> Result<Option<Booking>, EngineError> {
        let mine = self
            .store
            .query(BookingFilter {
                court_id: Some(court_id),
                user_id: Some(user_id.to_string()),
                state: None,
            })
            .await?;
        Ok(mine.into_iter().next())
    }

    /// Raw booking records for a court, ordered by `created_at`.
    pub async fn bookings(&self, court_id: CourtId) -> Result<Vec<Booking>, EngineError> {
        self.court_bookings(court_id).await
    }
}
