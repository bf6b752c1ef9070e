#![allow(unused)]

use actix_http::{body::MessageBody, Method, Request};
use actix_web::{
    dev::{Service, ServiceResponse},
    test::{call_service, read_body_json, TestRequest},
};
use anyhow::Result;
use entity::payment;
use migration::{Migrator, MigratorTrait};
use razorpay_client::{Gateway, NewOrder, Order, Verifier};
use receiptbox::{
    mailer::{Mailer, OutgoingEmail},
    setting::Setting,
    storage::DocumentStore,
    AppState, Error, NewDonation, Notification, Options,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use tempfile::TempDir;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";

/// Records created orders, fails on demand.
#[derive(Clone, Default)]
pub struct MockGateway {
    pub orders: Arc<Mutex<Vec<NewOrder>>>,
    pub fail: Arc<AtomicBool>,
    seq: Arc<AtomicUsize>,
}

impl MockGateway {
    pub fn orders(&self) -> Vec<NewOrder> {
        self.orders.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Gateway for MockGateway {
    async fn create_order(&self, order: &NewOrder) -> razorpay_client::Result<Order> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(razorpay_client::Error::Unavailable(
                "operation timed out".to_owned(),
            ));
        }
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().unwrap().push(order.clone());
        let id = format!("order_test{:06}", n);
        Ok(Order {
            raw: json!({"id": id, "amount": order.amount, "status": "created"}),
            id,
        })
    }

    fn key_id(&self) -> &str {
        KEY_ID
    }
}

/// Records sent emails, fails on demand.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> receiptbox::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::DeliveryFailure("status 503 Service Unavailable".to_owned()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub gateway: MockGateway,
    pub mailer: RecordingMailer,
    pub dir: TempDir,
}

pub fn test_setting(dir: &TempDir) -> Setting {
    let mut setting = Setting::default();
    setting.db_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("receiptbox.sqlite").display()
    );
    setting.razorpay.key_id = KEY_ID.to_owned();
    setting.razorpay.key_secret = KEY_SECRET.to_owned();
    setting.mail.from = "receipts@example.org".to_owned();
    setting.storage.root = dir.path().join("documents");
    setting.receipt.organization = Some("Seva Trust".to_owned());
    setting
}

pub async fn create_test_context() -> Result<TestContext> {
    create_test_context_with(|_| {}).await
}

pub async fn create_test_context_with<F: FnOnce(&mut Setting)>(f: F) -> Result<TestContext> {
    let dir = tempfile::tempdir()?;
    let mut setting = test_setting(&dir);
    f(&mut setting);
    setting.validate()?;

    let mut options = ConnectOptions::new(setting.db_url.clone());
    options.max_connections(1).sqlx_logging(false);
    let conn = Database::connect(options).await?;

    let gateway = MockGateway::default();
    let mailer = RecordingMailer::default();
    let service = receiptbox::Service::new(
        conn,
        Box::new(gateway.clone()),
        Verifier::new(KEY_SECRET),
        Box::new(mailer.clone()),
        DocumentStore::new(setting.storage.root.clone()),
        Options::from(&setting),
    );
    Migrator::fresh(service.db()).await?;

    Ok(TestContext {
        state: AppState { service, setting },
        gateway,
        mailer,
        dir,
    })
}

pub fn sign(order_id: &str, payment_id: &str) -> String {
    Verifier::new(KEY_SECRET).sign(order_id, payment_id)
}

/// Correctly signed notification for the payment.
pub fn notification(payment: &payment::Model, payment_id: &str) -> Notification {
    Notification::new(
        &payment.transaction_id,
        payment_id,
        &sign(&payment.transaction_id, payment_id),
    )
}

pub fn donation(contact: &str, email: Option<&str>, amount: &str) -> NewDonation {
    NewDonation {
        name: "Asha Rao".to_owned(),
        contact: contact.to_owned(),
        email: email.map(ToOwned::to_owned),
        amount: amount.to_owned(),
        ..Default::default()
    }
}

/// Create a pending payment through the donation form.
pub async fn pending_payment(
    ctx: &TestContext,
    contact: &str,
    email: Option<&str>,
    amount: &str,
) -> Result<payment::Model> {
    Ok(ctx
        .state
        .service
        .initiate_donation(donation(contact, email, amount))
        .await?
        .payment)
}

pub async fn call<S, B>(app: &S, req: Request) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = call_service(app, req).await;
    let status = res.status().as_u16();
    let val = read_body_json::<Value, _>(res).await;
    Ok((val, status))
}

pub async fn get<S, B>(app: &S, path: &str) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    call(app, TestRequest::with_uri(path).to_request()).await
}

pub async fn post<S, B>(app: &S, path: &str, data: Value) -> Result<(Value, u16)>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    call(
        app,
        TestRequest::with_uri(path)
            .method(Method::POST)
            .set_json(data)
            .to_request(),
    )
    .await
}
