use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(Ulid),
    /// Insert would violate the no-overlap constraint; carries the clashing booking.
    Integrity(Option<Ulid>),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::Integrity(Some(id)) => write!(f, "integrity violation with {id}"),
            StoreError::Integrity(None) => write!(f, "integrity violation"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    NoAccount(Ulid),
    Declined(String),
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::NoAccount(id) => write!(f, "no bank account for {id}"),
            PaymentError::Declined(msg) => write!(f, "declined: {msg}"),
        }
    }
}

impl std::error::Error for PaymentError {}

// ── Collaborator ports ──────────────────────────────────────────

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn resource(&self, id: Ulid) -> Result<Option<Resource>, StoreError>;

    async fn resources_owned_by(&self, owner_id: Ulid) -> Result<Vec<Resource>, StoreError>;
}

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Windows for the resource whose date range intersects `dates`.
    async fn list_windows(
        &self,
        resource_id: Ulid,
        dates: DateRange,
    ) -> Result<Vec<AvailabilityWindow>, StoreError>;

    async fn window(&self, id: Ulid) -> Result<Option<AvailabilityWindow>, StoreError>;

    async fn insert_window(&self, window: AvailabilityWindow) -> Result<(), StoreError>;

    async fn update_window(&self, window: AvailabilityWindow) -> Result<(), StoreError>;

    async fn delete_window(&self, id: Ulid) -> Result<AvailabilityWindow, StoreError>;

    /// Atomically swap every window of a resource for `windows`.
    async fn replace_windows(
        &self,
        resource_id: Ulid,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError>;

    /// `dates: None` lists every booking of the resource.
    async fn bookings_for_resource(
        &self,
        resource_id: Ulid,
        dates: Option<DateRange>,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_for_user(
        &self,
        user_id: Ulid,
        dates: Option<DateRange>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Must reject an overlapping booking on the same resource and date
    /// with [`StoreError::Integrity`].
    async fn insert(&self, booking: Booking) -> Result<(), StoreError>;

    async fn delete(&self, id: Ulid) -> Result<Booking, StoreError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Submissions with a completion date, newest completion first.
    async fn completed_submissions(&self, user_id: Ulid)
    -> Result<Vec<PuzzleSubmission>, StoreError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn has_payable_account(&self, owner_id: Ulid) -> bool;

    /// Credit `amount` to the owner and, unless waived, the service fee to
    /// the system revenue account.
    async fn charge(
        &self,
        owner_id: Ulid,
        amount: Decimal,
        waive_fee: bool,
    ) -> Result<ChargeReceipt, PaymentError>;
}

/// Every collaborator the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub resources: Arc<dyn ResourceStore>,
    pub availability: Arc<dyn AvailabilityStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl Collaborators {
    /// Wire one in-memory store for all storage ports.
    pub fn in_memory(store: Arc<InMemoryStore>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            resources: store.clone(),
            availability: store.clone(),
            bookings: store.clone(),
            submissions: store,
            payments,
        }
    }
}

// ── In-memory implementation ────────────────────────────────────

pub struct InMemoryStore {
    resources: DashMap<Ulid, Resource>,
    windows: DashMap<Ulid, AvailabilityWindow>,
    /// Resource → window ids.
    resource_windows: DashMap<Ulid, Vec<Ulid>>,
    bookings: DashMap<Ulid, Booking>,
    /// (resource, date) → booking ids; its entry lock makes insert check-and-set.
    day_slots: DashMap<(Ulid, Ms), Vec<Ulid>>,
    submissions: DashMap<Ulid, Vec<PuzzleSubmission>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
            windows: DashMap::new(),
            resource_windows: DashMap::new(),
            bookings: DashMap::new(),
            day_slots: DashMap::new(),
            submissions: DashMap::new(),
        }
    }

    pub fn put_resource(&self, resource: Resource) {
        self.resources.insert(resource.id, resource);
    }

    pub fn remove_resource(&self, id: &Ulid) -> Option<Resource> {
        self.resources.remove(id).map(|(_, r)| r)
    }

    /// Insert or replace a submission (keyed by its id).
    pub fn put_submission(&self, submission: PuzzleSubmission) {
        let mut list = self.submissions.entry(submission.user_id).or_default();
        list.retain(|s| s.id != submission.id);
        list.push(submission);
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    fn collect_bookings(&self, ids: &[Ulid]) -> Vec<Booking> {
        ids.iter()
            .filter_map(|id| self.bookings.get(id).map(|b| b.value().clone()))
            .collect()
    }
}

fn sort_bookings(bookings: &mut [Booking]) {
    bookings.sort_by_key(|b| (b.date, b.start_time));
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn resource(&self, id: Ulid) -> Result<Option<Resource>, StoreError> {
        Ok(self.resources.get(&id).map(|r| r.value().clone()))
    }

    async fn resources_owned_by(&self, owner_id: Ulid) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .resources
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| r.value().clone())
            .collect())
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryStore {
    async fn list_windows(
        &self,
        resource_id: Ulid,
        dates: DateRange,
    ) -> Result<Vec<AvailabilityWindow>, StoreError> {
        let Some(ids) = self.resource_windows.get(&resource_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.windows.get(id).map(|w| w.value().clone()))
            .filter(|w| w.dates().intersects(&dates))
            .collect())
    }

    async fn window(&self, id: Ulid) -> Result<Option<AvailabilityWindow>, StoreError> {
        Ok(self.windows.get(&id).map(|w| w.value().clone()))
    }

    async fn insert_window(&self, window: AvailabilityWindow) -> Result<(), StoreError> {
        self.resource_windows
            .entry(window.resource_id)
            .or_default()
            .push(window.id);
        self.windows.insert(window.id, window);
        Ok(())
    }

    async fn update_window(&self, window: AvailabilityWindow) -> Result<(), StoreError> {
        let mut existing = self
            .windows
            .get_mut(&window.id)
            .ok_or(StoreError::NotFound(window.id))?;
        *existing = window;
        Ok(())
    }

    async fn delete_window(&self, id: Ulid) -> Result<AvailabilityWindow, StoreError> {
        let (_, window) = self.windows.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(mut ids) = self.resource_windows.get_mut(&window.resource_id) {
            ids.retain(|w| *w != id);
        }
        Ok(window)
    }

    async fn replace_windows(
        &self,
        resource_id: Ulid,
        windows: Vec<AvailabilityWindow>,
    ) -> Result<(), StoreError> {
        let mut ids = self.resource_windows.entry(resource_id).or_default();
        for old in ids.drain(..) {
            self.windows.remove(&old);
        }
        for window in windows {
            ids.push(window.id);
            self.windows.insert(window.id, window);
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|b| b.value().clone()))
    }

    async fn bookings_for_resource(
        &self,
        resource_id: Ulid,
        dates: Option<DateRange>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = match dates {
            Some(DateRange { from, to: Some(to) }) if to - from <= SIX_DAYS => {
                let mut found = Vec::new();
                let mut day = from;
                while day <= to {
                    if let Some(ids) = self.day_slots.get(&(resource_id, day)) {
                        found.extend(self.collect_bookings(&ids));
                    }
                    day += ONE_DAY;
                }
                found
            }
            _ => self
                .bookings
                .iter()
                .filter(|b| b.resource_id == resource_id)
                .filter(|b| dates.is_none_or(|d| d.contains(b.date)))
                .map(|b| b.value().clone())
                .collect(),
        };
        sort_bookings(&mut found);
        Ok(found)
    }

    async fn bookings_for_user(
        &self,
        user_id: Ulid,
        dates: Option<DateRange>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| dates.is_none_or(|d| d.contains(b.date)))
            .map(|b| b.value().clone())
            .collect();
        sort_bookings(&mut found);
        Ok(found)
    }

    async fn insert(&self, booking: Booking) -> Result<(), StoreError> {
        // Holding the day's entry serializes inserts for that resource and date.
        let mut slot = self
            .day_slots
            .entry((booking.resource_id, booking.date))
            .or_default();
        let period = booking.period();
        for id in slot.iter() {
            if let Some(existing) = self.bookings.get(id)
                && existing.period().overlaps(&period)
            {
                return Err(StoreError::Integrity(Some(*id)));
            }
        }
        slot.push(booking.id);
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn delete(&self, id: Ulid) -> Result<Booking, StoreError> {
        let (_, booking) = self.bookings.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(mut ids) = self.day_slots.get_mut(&(booking.resource_id, booking.date)) {
            ids.retain(|b| *b != id);
        }
        Ok(booking)
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn completed_submissions(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<PuzzleSubmission>, StoreError> {
        let mut completed: Vec<PuzzleSubmission> = self
            .submissions
            .get(&user_id)
            .map(|list| {
                list.iter()
                    .filter(|s| s.completion_date.is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        completed.sort_by(|a, b| b.completion_date.cmp(&a.completion_date));
        Ok(completed)
    }
}
