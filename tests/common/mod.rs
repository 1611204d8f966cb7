//! Shared fixtures: an in-memory store plus hand-rolled fakes for the
//! billing provider, chat-role API, renderer, and blob store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use atrium_server::clients::{
    BillingProvider, ChatRoleClient, CheckoutSession, ClientError, ObjectStorage,
    ProviderCustomer, ProviderSubscription, QrRenderer,
};
use atrium_server::models::{
    CouponKind, Event, EventCoupon, EventStatus, EventTicket, MembershipTier, User,
};

pub fn make_user(discord_user_id: Option<&str>) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("user-{id}"),
        email: format!("{id}@example.test"),
        discord_user_id: discord_user_id.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

pub fn make_tier(
    slug: &str,
    level: i32,
    price_id: Option<&str>,
    role_id: Option<&str>,
) -> MembershipTier {
    let now = Utc::now();
    MembershipTier {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        level,
        stripe_price_id: price_id.map(str::to_string),
        discord_role_id: role_id.map(str::to_string),
        active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_event(capacity: Option<i32>, min_price_cents: i64) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Community Meetup".to_string(),
        description: None,
        location: Some("Main Hall".to_string()),
        virtual_url: None,
        start_time: now + chrono::Duration::days(7),
        end_time: None,
        status: EventStatus::Scheduled,
        capacity,
        min_price_cents,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_coupon(event_id: Uuid, code: &str, kind: CouponKind, value: i64) -> EventCoupon {
    EventCoupon {
        id: Uuid::new_v4(),
        event_id,
        code: code.to_string(),
        kind,
        value,
        expires_at: None,
        max_uses: None,
        used_count: 0,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct FakeBilling {
    pub sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
    pub customers: Mutex<Vec<ProviderCustomer>>,
    pub fail: AtomicBool,
}

impl FakeBilling {
    pub fn add_session(&self, session: CheckoutSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn add_subscription(&self, subscription: ProviderSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    fn check_up(&self) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::UnexpectedResponse(
                "billing provider is down".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ClientError> {
        self.check_up()?;
        self.sessions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("no session {id}")))
    }

    async fn retrieve_subscription(&self, id: &str) -> Result<ProviderSubscription, ClientError> {
        self.check_up()?;
        self.subscriptions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("no subscription {id}")))
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, ClientError> {
        self.check_up()?;
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_customer(&self, email: &str) -> Result<ProviderCustomer, ClientError> {
        self.check_up()?;
        let customer = ProviderCustomer {
            id: format!("cus_{}", Uuid::new_v4().simple()),
            email: Some(email.to_string()),
        };
        self.customers.lock().unwrap().push(customer.clone());
        Ok(customer)
    }
}

#[derive(Default)]
pub struct FakeChat {
    pub assignments: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    pub reject: AtomicBool,
}

#[async_trait]
impl ChatRoleClient for FakeChat {
    async fn assign_role(
        &self,
        external_user_id: &str,
        role_id: &str,
    ) -> Result<bool, ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::UnexpectedResponse(
                "chat platform is down".to_string(),
            ));
        }
        if self.reject.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.assignments
            .lock()
            .unwrap()
            .push((external_user_id.to_string(), role_id.to_string()));
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub fail: AtomicBool,
    /// Fail only renders whose payload contains this fragment.
    pub fail_contains: Mutex<Option<String>>,
}

#[async_trait]
impl QrRenderer for FakeRenderer {
    async fn render(&self, ticket: &EventTicket, _event: &Event) -> Result<Vec<u8>, ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::UnexpectedResponse(
                "renderer is down".to_string(),
            ));
        }
        if let Some(fragment) = self.fail_contains.lock().unwrap().as_deref() {
            if ticket.qr_code_data.contains(fragment) {
                return Err(ClientError::UnexpectedResponse(
                    "renderer rejected payload".to_string(),
                ));
            }
        }
        Ok(ticket.qr_code_data.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, _bytes: Vec<u8>, path: &str) -> Result<String, ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::UnexpectedResponse(
                "blob store is down".to_string(),
            ));
        }
        let url = format!("https://cdn.example.test/{path}");
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }
}
