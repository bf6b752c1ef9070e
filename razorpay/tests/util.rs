#![allow(unused)]

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::Result;
use serde_json::{json, Value};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";

#[derive(Clone)]
struct Reply {
    status: u16,
    body: Value,
}

async fn orders(req: HttpRequest, data: web::Json<Value>, reply: web::Data<Reply>) -> HttpResponse {
    let auth = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let mut body = reply.body.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("echo_auth".to_owned(), json!(auth));
        obj.insert("echo_request".to_owned(), data.into_inner());
    }
    HttpResponse::build(StatusCode::from_u16(reply.status).unwrap()).json(body)
}

/// Start a throwaway orders endpoint, returns the api base url.
pub fn mock_gateway(status: u16, body: Value) -> Result<String> {
    let reply = Reply { status, body };
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(reply.clone()))
            .route("/v1/orders", web::post().to(orders))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;
    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());
    Ok(format!("http://{}/v1", addr))
}
