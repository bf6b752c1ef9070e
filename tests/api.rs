use actix_http::{header, Method};
use actix_web::{
    test::{call_service, init_service, read_body, TestRequest},
    web,
};
use anyhow::Result;
use receiptbox::create_web_app;
use serde_json::json;
use util::{create_test_context, sign};

mod util;

#[actix_rt::test]
async fn donation_and_webhook() -> Result<()> {
    let ctx = create_test_context().await?;
    let mailer = ctx.mailer.clone();
    let app = init_service(create_web_app(web::Data::new(ctx.state))).await;

    let (val, status) = util::post(
        &app,
        "/v1/donations",
        json!({
            "name": "Asha Rao",
            "contact": "9850000001",
            "email": "asha@example.org",
            "amount": 500
        }),
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["reused"], json!(false));
    assert_eq!(val["razorpay_key_id"], json!(util::KEY_ID));
    assert_eq!(val["payment"]["status"], json!("PENDING"));
    assert_eq!(val["payment"]["amount"], json!(50_000));
    assert_eq!(val["donor"]["contact"], json!("9850000001"));
    let order_id = val["payment"]["transaction_id"].as_str().unwrap().to_owned();

    let (val, status) = util::post(
        &app,
        "/webhook/payment",
        json!({
            "razorpay_payment_id": "pay_a1",
            "razorpay_order_id": order_id,
            "razorpay_signature": sign(&order_id, "pay_a1"),
        }),
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["status"], json!("SUCCESS"));
    let receipt_number = val["receipt_number"].as_str().unwrap().to_owned();
    assert!(receipt_number.starts_with("TR"));
    assert_eq!(mailer.sent().len(), 1);

    // redelivery
    let (val, status) = util::post(
        &app,
        "/webhook/payment",
        json!({
            "razorpay_payment_id": "pay_a1",
            "razorpay_order_id": order_id,
            "razorpay_signature": sign(&order_id, "pay_a1"),
        }),
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(val["status"], json!("SUCCESS"));
    assert_eq!(val["receipt_number"], json!(receipt_number));
    assert_eq!(mailer.sent().len(), 1);

    let (val, status) = util::get(&app, &format!("/v1/payments/{}", order_id)).await?;
    assert_eq!(status, 200);
    assert_eq!(val["payment"]["status"], json!("SUCCESS"));
    assert_eq!(val["receipt"]["receipt_number"], json!(receipt_number));
    assert_eq!(val["receipt"]["email_sent"], json!(true));
    assert_eq!(val["history"].as_array().unwrap().len(), 2);
    assert_eq!(val["history"][1]["status"], json!("SUCCESS"));
    Ok(())
}

#[actix_rt::test]
async fn webhook_errors_answer_ok() -> Result<()> {
    let ctx = create_test_context().await?;
    let app = init_service(create_web_app(web::Data::new(ctx.state))).await;

    let (val, _) = util::post(
        &app,
        "/v1/donations",
        json!({"name": "Ravi", "contact": "9850000002", "amount": "99.99"}),
    )
    .await?;
    let order_id = val["payment"]["transaction_id"].as_str().unwrap().to_owned();

    let cases = [
        (json!({"razorpay_order_id": order_id}), "Missing payment parameters"),
        (
            json!({
                "razorpay_payment_id": "pay_x",
                "razorpay_order_id": "order_unknown",
                "razorpay_signature": sign("order_unknown", "pay_x"),
            }),
            "Payment not found",
        ),
        (
            json!({
                "razorpay_payment_id": "pay_x",
                "razorpay_order_id": order_id,
                "razorpay_signature": sign(&order_id, "pay_other"),
            }),
            "Invalid signature",
        ),
        (
            json!({
                "razorpay_payment_id": "pay_x",
                "razorpay_order_id": order_id,
                "razorpay_signature": sign(&order_id, "pay_x"),
            }),
            "Payment failed",
        ),
    ];
    for (body, message) in cases {
        let (val, status) = util::post(&app, "/webhook/payment", body).await?;
        assert_eq!(status, 200);
        assert_eq!(val["status"], json!("error"));
        assert_eq!(val["message"], json!(message));
    }

    // not even json
    let req = TestRequest::with_uri("/webhook/payment")
        .method(Method::POST)
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("razorpay_order_id=1")
        .to_request();
    let (val, status) = util::call(&app, req).await?;
    assert_eq!(status, 200);
    assert_eq!(val["message"], json!("Missing payment parameters"));

    let (val, _) = util::get(&app, &format!("/v1/payments/{}", order_id)).await?;
    assert_eq!(val["payment"]["status"], json!("FAILED"));
    Ok(())
}

#[actix_rt::test]
async fn api_errors() -> Result<()> {
    let ctx = create_test_context().await?;
    let gateway = ctx.gateway.clone();
    let app = init_service(create_web_app(web::Data::new(ctx.state))).await;

    let (val, status) = util::post(
        &app,
        "/v1/donations",
        json!({"name": "Ravi", "contact": "9850000003", "amount": "0"}),
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(val["error"], json!(true));
    assert_eq!(val["status_code"], json!(400));

    // unparsable body uses the same error shape
    let (val, status) = util::post(&app, "/v1/donations", json!({"name": "Ravi"})).await?;
    assert_eq!(status, 400);
    assert_eq!(val["error"], json!(true));

    gateway.set_fail(true);
    let (val, status) = util::post(
        &app,
        "/v1/donations",
        json!({"name": "Ravi", "contact": "9850000003", "amount": "10"}),
    )
    .await?;
    assert_eq!(status, 503);
    assert_eq!(val["status_code"], json!(503));

    let (val, status) = util::get(&app, "/v1/payments/order_unknown").await?;
    assert_eq!(status, 404);
    assert_eq!(val["error"], json!(true));
    Ok(())
}

#[actix_rt::test]
async fn cors() -> Result<()> {
    let ctx = create_test_context().await?;
    let app = init_service(create_web_app(web::Data::new(ctx.state))).await;

    let req = TestRequest::with_uri("/v1/donations")
        .method(Method::OPTIONS)
        .insert_header((header::ORIGIN, "https://donate.example.org"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .to_request();
    let res = call_service(&app, req).await;
    assert!(res.status().is_success());
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let _ = read_body(res).await;
    Ok(())
}
