use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use backend::usecases::{
    gateways::{Mailer, PaymentGateway},
    settlement::{SettlementError, SettlementUseCase, WebhookOutcome},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use crates::{
    domain::{
        entities::{
            availability_slots::{AvailabilitySlotEntity, InsertAvailabilitySlotEntity},
            bookings::{BookingEntity, InsertBookingEntity},
            mentors::{InsertMentorEntity, MentorEntity, UpdateMentorEntity},
            payments::{PaymentEntity, UpsertPaymentEntity},
            referral_codes::{InsertReferralCodeEntity, InsertReferralUseEntity, ReferralCodeEntity},
        },
        repositories::{
            availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
            invoices::InvoiceRepository, mentors::MentorRepository, payments::PaymentRepository,
            profiles::ProfileRepository, referral_codes::ReferralCodeRepository,
        },
        value_objects::{
            bookings::BookingInsertOutcome, enums::booking_statuses::BookingStatus,
            payments::{BookingOrderNotes, PaymentMethodDetails, VerifyPaymentRequest},
            referrals::ReferralUseOutcome,
        },
    },
    email::resend_client::EmailMessage,
    payments::razorpay_client::{CreateOrderParams, RazorpayOrder, RazorpayPayment},
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    mentors: HashMap<Uuid, MentorEntity>,
    slots: HashMap<Uuid, AvailabilitySlotEntity>,
    bookings: Vec<BookingEntity>,
    payments: HashMap<String, PaymentEntity>,
    referral_codes: HashMap<String, ReferralCodeEntity>,
    referral_uses: Vec<InsertReferralUseEntity>,
}

/// Postgres stand-in: one lock gives the booking insert and slot claim the same
/// atomicity the transaction has.
#[derive(Default)]
struct InMemoryStore {
    state: Mutex<StoreState>,
    invoice_sequence: AtomicI64,
}

#[async_trait]
impl MentorRepository for InMemoryStore {
    async fn find_by_id(&self, mentor_id: Uuid) -> Result<Option<MentorEntity>> {
        Ok(self.state.lock().await.mentors.get(&mentor_id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<MentorEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .mentors
            .values()
            .find(|mentor| mentor.user_id == Some(user_id))
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<MentorEntity>> {
        let state = self.state.lock().await;
        Ok(state.mentors.values().filter(|m| m.is_active).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<MentorEntity>> {
        Ok(self.state.lock().await.mentors.values().cloned().collect())
    }

    async fn create(&self, _mentor: InsertMentorEntity) -> Result<MentorEntity> {
        bail!("not used by settlement")
    }

    async fn update(
        &self,
        _mentor_id: Uuid,
        _changeset: UpdateMentorEntity,
    ) -> Result<Option<MentorEntity>> {
        bail!("not used by settlement")
    }
}

#[async_trait]
impl AvailabilitySlotRepository for InMemoryStore {
    async fn find_by_id(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlotEntity>> {
        Ok(self.state.lock().await.slots.get(&slot_id).cloned())
    }

    async fn list_bookable(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlotEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .slots
            .values()
            .filter(|s| s.mentor_id == mentor_id && s.date >= from_date && s.is_bookable(now))
            .cloned()
            .collect())
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlotEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .slots
            .values()
            .filter(|s| s.mentor_id == mentor_id && s.date >= from_date)
            .cloned()
            .collect())
    }

    async fn create(&self, _slot: InsertAvailabilitySlotEntity) -> Result<AvailabilitySlotEntity> {
        bail!("not used by settlement")
    }

    async fn delete_unclaimed(
        &self,
        _slot_id: Uuid,
        _mentor_id: Uuid,
        _now: DateTime<Utc>,
    ) -> Result<bool> {
        bail!("not used by settlement")
    }

    async fn reserve(
        &self,
        _slot_id: Uuid,
        _reserved_by: String,
        _reserved_until: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> Result<bool> {
        bail!("not used by settlement")
    }

    async fn release_reservation(&self, _slot_id: Uuid, _reserved_by: String) -> Result<()> {
        bail!("not used by settlement")
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_and_claim_slot(
        &self,
        booking: InsertBookingEntity,
    ) -> Result<BookingInsertOutcome> {
        let mut state = self.state.lock().await;

        if state
            .bookings
            .iter()
            .any(|existing| existing.razorpay_order_id == booking.razorpay_order_id)
        {
            return Ok(BookingInsertOutcome::DuplicateOrder);
        }

        if let Some(slot_id) = booking.slot_id {
            let slot = state
                .slots
                .get_mut(&slot_id)
                .ok_or_else(|| anyhow!("slot {slot_id} missing"))?;
            if slot.is_booked {
                return Ok(BookingInsertOutcome::SlotTaken);
            }
            slot.is_booked = true;
            slot.is_reserved = false;
            slot.reserved_by = None;
            slot.reserved_until = None;
        }

        let now = Utc::now();
        let created = BookingEntity {
            id: Uuid::new_v4(),
            mentor_id: booking.mentor_id,
            slot_id: booking.slot_id,
            user_id: booking.user_id,
            user_name: booking.user_name,
            user_email: booking.user_email,
            user_phone: booking.user_phone,
            session_type: booking.session_type,
            session_price: booking.session_price,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
            meet_link: booking.meet_link,
            razorpay_order_id: booking.razorpay_order_id,
            confirmed_at: booking.confirmed_at,
            created_at: now,
            updated_at: now,
        };
        state.bookings.push(created.clone());
        Ok(BookingInsertOutcome::Created(created))
    }

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .find(|b| b.razorpay_order_id == razorpay_order_id)
            .cloned())
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state.bookings.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn list(&self, _status: Option<BookingStatus>) -> Result<Vec<BookingEntity>> {
        Ok(self.state.lock().await.bookings.clone())
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.mentor_id == mentor_id && b.date >= from_date)
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        _booking_id: Uuid,
        _from: BookingStatus,
        _to: BookingStatus,
    ) -> Result<Option<BookingEntity>> {
        bail!("not used by settlement")
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    /// Same merge as the `ON CONFLICT` update: the first invoice id sticks and
    /// null or fallback values never replace stored ones.
    async fn upsert_by_order_id(&self, payment: UpsertPaymentEntity) -> Result<PaymentEntity> {
        let mut state = self.state.lock().await;

        let row = match state.payments.get(&payment.razorpay_order_id).cloned() {
            None => PaymentEntity {
                id: Uuid::new_v4(),
                booking_id: payment.booking_id,
                razorpay_order_id: payment.razorpay_order_id.clone(),
                razorpay_payment_id: payment.razorpay_payment_id,
                razorpay_signature: payment.razorpay_signature,
                amount: payment.amount,
                currency: payment.currency,
                status: payment.status,
                invoice_id: payment.invoice_id,
                payment_method: payment.payment_method,
                card_network: payment.card_network,
                card_last4: payment.card_last4,
                bank: payment.bank,
                wallet: payment.wallet,
                vpa: payment.vpa,
                fee: payment.fee,
                tax: payment.tax,
                created_at: Utc::now(),
                updated_at: payment.updated_at,
            },
            Some(stored) => PaymentEntity {
                id: stored.id,
                booking_id: payment.booking_id.or(stored.booking_id),
                razorpay_order_id: stored.razorpay_order_id,
                razorpay_payment_id: payment.razorpay_payment_id,
                razorpay_signature: payment.razorpay_signature.or(stored.razorpay_signature),
                amount: payment.amount,
                currency: payment.currency,
                status: payment.status,
                invoice_id: stored.invoice_id,
                payment_method: if payment.payment_method == PaymentMethodDetails::FALLBACK_METHOD {
                    stored.payment_method
                } else {
                    payment.payment_method
                },
                card_network: payment.card_network.or(stored.card_network),
                card_last4: payment.card_last4.or(stored.card_last4),
                bank: payment.bank.or(stored.bank),
                wallet: payment.wallet.or(stored.wallet),
                vpa: payment.vpa.or(stored.vpa),
                fee: payment.fee.or(stored.fee),
                tax: payment.tax.or(stored.tax),
                created_at: stored.created_at,
                updated_at: payment.updated_at,
            },
        };

        state.payments.insert(payment.razorpay_order_id, row.clone());
        Ok(row)
    }

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<PaymentEntity>> {
        Ok(self.state.lock().await.payments.get(&razorpay_order_id).cloned())
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryStore {
    async fn next_invoice_number(&self) -> Result<i64> {
        Ok(self.invoice_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn update_phone(
        &self,
        _user_id: Option<Uuid>,
        _email: String,
        _phone: String,
    ) -> Result<usize> {
        Ok(1)
    }
}

#[async_trait]
impl ReferralCodeRepository for InMemoryStore {
    async fn find_by_code(&self, code: String) -> Result<Option<ReferralCodeEntity>> {
        Ok(self.state.lock().await.referral_codes.get(&code).cloned())
    }

    async fn create(&self, _code: InsertReferralCodeEntity) -> Result<ReferralCodeEntity> {
        bail!("not used by settlement")
    }

    async fn record_use(&self, referral_use: InsertReferralUseEntity) -> Result<ReferralUseOutcome> {
        let mut state = self.state.lock().await;
        if state
            .referral_uses
            .iter()
            .any(|u| u.razorpay_order_id == referral_use.razorpay_order_id)
        {
            return Ok(ReferralUseOutcome::AlreadyRecorded);
        }
        if let Some(code) = state.referral_codes.get_mut(&referral_use.code) {
            code.times_used += 1;
        }
        state.referral_uses.push(referral_use);
        Ok(ReferralUseOutcome::Recorded)
    }
}

/// Accepts every signature and serves the orders a test opened. Payment
/// lookups fail so settlement uses its fallbacks.
#[derive(Default)]
struct TrustingGateway {
    orders: std::sync::Mutex<HashMap<String, RazorpayOrder>>,
}

impl TrustingGateway {
    fn open_order(&self, order_id: &str, notes: BookingOrderNotes, amount: i64) {
        let order = RazorpayOrder {
            id: order_id.to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: Some(format!("cc_{order_id}")),
            status: Some("paid".to_string()),
            notes: notes.into_map(),
        };
        self.orders
            .lock()
            .unwrap()
            .insert(order_id.to_string(), order);
    }
}

#[async_trait]
impl PaymentGateway for TrustingGateway {
    fn key_id(&self) -> String {
        "rzp_test_key".to_string()
    }

    fn verify_payment_signature(&self, _order_id: &str, _payment_id: &str, _signature: &str) -> bool {
        true
    }

    fn verify_webhook_signature(&self, _payload: &[u8], _signature: &str) -> bool {
        true
    }

    async fn create_order(&self, _params: CreateOrderParams) -> Result<RazorpayOrder> {
        bail!("not used by settlement")
    }

    async fn fetch_order(&self, order_id: &str) -> Result<RazorpayOrder> {
        let orders = self
            .orders
            .lock()
            .map_err(|_| anyhow!("order book poisoned"))?;
        orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| anyhow!("order {order_id} not found"))
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment> {
        bail!("payment {payment_id} unavailable")
    }
}

#[derive(Default)]
struct CountingMailer {
    sent: AtomicUsize,
    recipients: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for CountingMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut recipients) = self.recipients.lock() {
            recipients.push(message.to);
        }
        Ok(())
    }
}

type StoreSettlement = SettlementUseCase<
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
    InMemoryStore,
>;

/// Discounted FRIEND10 price of the 499 rupee session, in paise.
const FRIEND10_AMOUNT: i64 = 44_900;

struct Fixture {
    store: Arc<InMemoryStore>,
    gateway: Arc<TrustingGateway>,
    mailer: Arc<CountingMailer>,
    usecase: Arc<StoreSettlement>,
    mentor_id: Uuid,
    slot_id: Uuid,
    cheap_mentor_id: Uuid,
    cheap_slot_id: Uuid,
}

fn mentor(id: Uuid, name: &str, email: &str, price: i32, now: DateTime<Utc>) -> MentorEntity {
    MentorEntity {
        id,
        user_id: None,
        name: name.to_string(),
        email: email.to_string(),
        role: Some("SDE Intern".to_string()),
        college: "IIT Madras".to_string(),
        price,
        bio: None,
        expertise: vec!["DSA".to_string()],
        meet_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn reserved_slot(id: Uuid, mentor_id: Uuid, now: DateTime<Utc>) -> AvailabilitySlotEntity {
    AvailabilitySlotEntity {
        id,
        mentor_id,
        date: (now + Duration::days(3)).date_naive(),
        start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        is_booked: false,
        is_reserved: true,
        reserved_by: Some("student@example.com".to_string()),
        reserved_until: Some(now + Duration::minutes(10)),
        created_at: now,
    }
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::default());
    let gateway = Arc::new(TrustingGateway::default());
    let mailer = Arc::new(CountingMailer::default());

    let mentor_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let cheap_mentor_id = Uuid::new_v4();
    let cheap_slot_id = Uuid::new_v4();
    let now = Utc::now();
    {
        let mut state = store.state.lock().await;
        state.mentors.insert(
            mentor_id,
            mentor(mentor_id, "Asha Rao", "asha@college.edu", 499, now),
        );
        state.mentors.insert(
            cheap_mentor_id,
            mentor(cheap_mentor_id, "Dev Shah", "dev@college.edu", 1, now),
        );
        state
            .slots
            .insert(slot_id, reserved_slot(slot_id, mentor_id, now));
        state.slots.insert(
            cheap_slot_id,
            reserved_slot(cheap_slot_id, cheap_mentor_id, now),
        );
        state.referral_codes.insert(
            "FRIEND10".to_string(),
            ReferralCodeEntity {
                id: Uuid::new_v4(),
                code: "FRIEND10".to_string(),
                discount_percent: 10,
                max_uses: None,
                times_used: 0,
                is_active: true,
                expires_at: None,
                created_at: now,
            },
        );
    }

    let usecase = SettlementUseCase::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        gateway.clone(),
        mailer.clone(),
    );

    Fixture {
        store,
        gateway,
        mailer,
        usecase: Arc::new(usecase),
        mentor_id,
        slot_id,
        cheap_mentor_id,
        cheap_slot_id,
    }
}

fn booking_notes(slot_id: Uuid, mentor_id: Uuid, referral_code: Option<&str>) -> BookingOrderNotes {
    BookingOrderNotes {
        slot_id,
        mentor_id,
        session_type: "standard".to_string(),
        user_email: "student@example.com".to_string(),
        user_name: Some("Student".to_string()),
        user_phone: Some("9876543210".to_string()),
        user_id: None,
        referral_code: referral_code.map(str::to_string),
    }
}

impl Fixture {
    /// Opens a FRIEND10-discounted order for the 499 rupee slot.
    fn open_order(&self, order_id: &str) {
        self.gateway.open_order(
            order_id,
            booking_notes(self.slot_id, self.mentor_id, Some("FRIEND10")),
            FRIEND10_AMOUNT,
        );
    }

    fn order_paid_webhook(&self, order_id: &str, payment_id: &str) -> Vec<u8> {
        let notes = booking_notes(self.slot_id, self.mentor_id, Some("FRIEND10")).into_map();
        serde_json::to_vec(&serde_json::json!({
            "entity": "event",
            "event": "order.paid",
            "payload": {
                "payment": {"entity": {
                    "id": payment_id, "order_id": order_id, "amount": FRIEND10_AMOUNT,
                    "currency": "INR", "status": "captured",
                    "method": "upi", "vpa": "student@upi"
                }},
                "order": {"entity": {
                    "id": order_id, "amount": FRIEND10_AMOUNT, "currency": "INR",
                    "status": "paid", "notes": notes
                }}
            }
        }))
        .unwrap()
    }
}

fn verify_request(fixture: &Fixture, order_id: &str, payment_id: &str) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        razorpay_order_id: Some(order_id.to_string()),
        razorpay_payment_id: Some(payment_id.to_string()),
        razorpay_signature: Some("sig".to_string()),
        slot_id: Some(fixture.slot_id),
        mentor_id: Some(fixture.mentor_id),
        session_type: Some("standard".to_string()),
        user_id: None,
        user_name: Some("Student".to_string()),
        user_email: Some("student@example.com".to_string()),
        user_phone: Some("9876543210".to_string()),
        selected_date: None,
        selected_time: None,
        referral_code: Some("friend10".to_string()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_verifications_of_one_order_settle_once() {
    let fixture = fixture().await;
    fixture.open_order("order_race");

    let first = {
        let usecase = Arc::clone(&fixture.usecase);
        let request = verify_request(&fixture, "order_race", "pay_race");
        tokio::spawn(async move { usecase.verify_and_settle(request).await })
    };
    let second = {
        let usecase = Arc::clone(&fixture.usecase);
        let request = verify_request(&fixture, "order_race", "pay_race");
        tokio::spawn(async move { usecase.verify_and_settle(request).await })
    };

    let (first, second) = tokio::join!(first, second);
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();

    assert_eq!(first.booking.id, second.booking.id);
    assert_eq!(first.invoice_id, second.invoice_id);
    assert_eq!(
        [first.duplicate, second.duplicate]
            .iter()
            .filter(|duplicate| **duplicate)
            .count(),
        1
    );

    let state = fixture.store.state.lock().await;
    assert_eq!(state.bookings.len(), 1);
    assert!(state.slots[&fixture.slot_id].is_booked);
    assert_eq!(state.payments.len(), 1);
    assert_eq!(
        state.payments["order_race"].booking_id,
        Some(first.booking.id)
    );
    assert_eq!(state.payments["order_race"].invoice_id, first.invoice_id);
    assert_eq!(state.referral_uses.len(), 1);
    assert_eq!(state.referral_codes["FRIEND10"].times_used, 1);

    assert_eq!(fixture.mailer.sent.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn second_order_for_a_booked_slot_is_recorded_without_booking() {
    let fixture = fixture().await;
    fixture.open_order("order_one");
    fixture.open_order("order_two");

    let settled = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_one", "pay_one"))
        .await
        .unwrap();
    assert!(!settled.duplicate);
    assert_eq!(settled.booking.session_price, 449);
    assert_eq!(
        settled.meet_link.as_deref(),
        Some("https://meet.google.com/abc-defg-hij")
    );

    let err = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_two", "pay_two"))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::SlotTaken));

    let state = fixture.store.state.lock().await;
    assert_eq!(state.bookings.len(), 1);
    assert_eq!(state.payments["order_two"].booking_id, None);
    assert_eq!(state.payments["order_one"].booking_id, Some(settled.booking.id));
    assert_eq!(fixture.mailer.sent.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn settled_booking_emails_student_and_mentor() {
    let fixture = fixture().await;
    fixture.open_order("order_mail");

    let settled = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_mail", "pay_mail"))
        .await
        .unwrap();
    assert!(settled.invoice_id.starts_with("CC-"));
    assert!(settled.invoice_id.ends_with("000001"));

    let recipients = fixture.mailer.recipients.lock().unwrap().clone();
    assert_eq!(
        recipients
            .iter()
            .filter(|to| to.as_str() == "student@example.com")
            .count(),
        2
    );
    assert!(recipients.iter().any(|to| to == "asha@college.edu"));
}

#[tokio::test]
async fn cheap_order_cannot_settle_an_expensive_slot() {
    let fixture = fixture().await;
    {
        let mut state = fixture.store.state.lock().await;
        let friend10 = state.referral_codes.get_mut("FRIEND10").unwrap();
        friend10.max_uses = Some(1);
        friend10.times_used = 1;
    }
    fixture.gateway.open_order(
        "order_cheap",
        booking_notes(fixture.cheap_slot_id, fixture.cheap_mentor_id, Some("FRIEND10")),
        100,
    );

    // Body points the one rupee order at the 499 rupee mentor's slot.
    let err = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_cheap", "pay_cheap"))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::BookingMismatch(_)));

    let state = fixture.store.state.lock().await;
    assert!(state.bookings.is_empty());
    assert!(state.payments.is_empty());
    assert!(!state.slots[&fixture.slot_id].is_booked);
    assert!(!state.slots[&fixture.cheap_slot_id].is_booked);
    assert!(state.referral_uses.is_empty());
    assert_eq!(state.referral_codes["FRIEND10"].times_used, 1);
    assert_eq!(fixture.mailer.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_referral_code_is_not_counted_at_settlement() {
    let fixture = fixture().await;
    {
        let mut state = fixture.store.state.lock().await;
        let friend10 = state.referral_codes.get_mut("FRIEND10").unwrap();
        friend10.max_uses = Some(1);
        friend10.times_used = 1;
    }
    fixture.open_order("order_late");

    let settled = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_late", "pay_late"))
        .await
        .unwrap();
    assert!(!settled.duplicate);

    let state = fixture.store.state.lock().await;
    assert_eq!(state.bookings.len(), 1);
    assert!(state.referral_uses.is_empty());
    assert_eq!(state.referral_codes["FRIEND10"].times_used, 1);
}

#[tokio::test]
async fn webhook_after_verify_keeps_signature_and_invoice() {
    let fixture = fixture().await;
    fixture.open_order("order_conv");

    let verified = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_conv", "pay_conv"))
        .await
        .unwrap();
    assert!(!verified.duplicate);

    let outcome = fixture
        .usecase
        .handle_webhook(
            &fixture.order_paid_webhook("order_conv", "pay_conv"),
            Some("webhook-sig"),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Settled {
            booking_id: verified.booking.id,
            duplicate: true,
        }
    );

    let state = fixture.store.state.lock().await;
    assert_eq!(state.bookings.len(), 1);
    assert_eq!(state.payments.len(), 1);
    let payment = &state.payments["order_conv"];
    assert_eq!(payment.razorpay_signature.as_deref(), Some("sig"));
    assert_eq!(payment.invoice_id, verified.invoice_id);
    assert_eq!(payment.booking_id, Some(verified.booking.id));
    assert_eq!(payment.payment_method, "upi");
    assert_eq!(payment.vpa.as_deref(), Some("student@upi"));
    assert_eq!(fixture.store.invoice_sequence.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.mailer.sent.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn verify_after_webhook_reports_the_stored_invoice() {
    let fixture = fixture().await;
    fixture.open_order("order_late_cb");

    let outcome = fixture
        .usecase
        .handle_webhook(
            &fixture.order_paid_webhook("order_late_cb", "pay_late_cb"),
            Some("webhook-sig"),
        )
        .await
        .unwrap();
    let booking_id = match outcome {
        WebhookOutcome::Settled {
            booking_id,
            duplicate: false,
        } => booking_id,
        other => panic!("webhook did not settle: {other:?}"),
    };
    let webhook_invoice = fixture.store.state.lock().await.payments["order_late_cb"]
        .invoice_id
        .clone();

    let verified = fixture
        .usecase
        .verify_and_settle(verify_request(&fixture, "order_late_cb", "pay_late_cb"))
        .await
        .unwrap();
    assert!(verified.duplicate);
    assert_eq!(verified.booking.id, booking_id);
    assert_eq!(verified.invoice_id, webhook_invoice);

    let state = fixture.store.state.lock().await;
    let payment = &state.payments["order_late_cb"];
    assert_eq!(payment.razorpay_signature.as_deref(), Some("sig"));
    assert_eq!(payment.payment_method, "upi");
    assert_eq!(payment.invoice_id, webhook_invoice);
    assert_eq!(fixture.store.invoice_sequence.load(Ordering::SeqCst), 1);
}
