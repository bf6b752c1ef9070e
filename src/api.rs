//! http api for the donation form

use crate::{AppState, Error, NewDonation, Result};
use actix_cors::Cors;
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

pub fn scope() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/v1")
        .wrap(
            Cors::default()
                .send_wildcard()
                .allow_any_header()
                .allow_any_origin()
                .allow_any_method()
                .max_age(86_400),
        )
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| Error::InvalidParam(err.to_string()).into()),
        )
        .service(create_donation)
        .service(get_payment)
}

/// create a gateway order for the donation form
#[post("/donations")]
pub async fn create_donation(
    state: web::Data<AppState>,
    data: web::Json<NewDonation>,
) -> Result<HttpResponse, Error> {
    let donation = state.service.initiate_donation(data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "payment": donation.payment,
        "donor": donation.donor,
        "razorpay_key_id": state.service.gateway().key_id(),
        "reused": donation.reused,
    })))
}

/// payment status with receipt and history
#[get("/payments/{order_id}")]
pub async fn get_payment(
    state: web::Data<AppState>,
    order_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let summary = state.service.payment_summary(&order_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}
