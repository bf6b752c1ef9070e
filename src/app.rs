use crate::{
    api,
    mailer::{DisabledMailer, Mailer, ResendMailer},
    setting::Setting,
    storage::DocumentStore,
    webhook, Options, Result, Service,
};
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest},
    middleware, App as WebApp, HttpServer,
};
use razorpay_client::Razorpay;
use sea_orm::{ConnectOptions, Database};
use std::{path::Path, time::Duration};
use tracing::{info, warn};

pub struct AppState {
    pub service: Service,
    pub setting: Setting,
}

impl AppState {
    pub async fn create<P: AsRef<Path>>(
        setting_path: Option<P>,
        setting_env_prefix: Option<String>,
    ) -> Result<Self> {
        let env_notice = setting_env_prefix
            .as_ref()
            .map(|s| {
                format!(
                    ", config will be overrided by ENV seting with prefix `{}_`",
                    s
                )
            })
            .unwrap_or_default();

        let setting = if let Some(path) = setting_path {
            info!("Load config {:?}{}", path.as_ref(), env_notice);
            Setting::read(path.as_ref(), setting_env_prefix)?
        } else if let Some(prefix) = setting_env_prefix {
            info!("Load default config{}", env_notice);
            Setting::from_env(prefix)?
        } else {
            info!("Load default config");
            Setting::default()
        };

        info!("{:?}", setting);

        Self::from_setting(setting).await
    }

    pub async fn from_setting(setting: Setting) -> Result<Self> {
        setting.validate()?;

        let razorpay = Razorpay::connect(
            setting.razorpay.api_url.clone(),
            setting.razorpay.key_id.clone(),
            setting.razorpay.key_secret.clone(),
            Some(Duration::from_secs(setting.razorpay.timeout_secs)),
        )?;
        let verifier = razorpay.verifier();

        let mailer: Box<dyn Mailer + Send + Sync> = match &setting.mail.api_key {
            Some(key) if !key.trim().is_empty() => Box::new(ResendMailer::new(
                setting.mail.api_url.clone(),
                key.trim(),
                setting.mail.from.clone(),
                Some(Duration::from_secs(setting.mail.timeout_secs)),
            )?),
            _ => {
                warn!("mail.api_key is not set, receipt emails are disabled");
                Box::new(DisabledMailer)
            }
        };

        let mut options = ConnectOptions::from(&setting.db_url);
        options.sqlx_logging_level(tracing::log::LevelFilter::Trace);
        let conn = Database::connect(options).await?;

        let service = Service::new(
            conn,
            Box::new(razorpay),
            verifier,
            mailer,
            DocumentStore::new(setting.storage.root.clone()),
            Options::from(&setting),
        );

        Ok(Self { service, setting })
    }
}

pub fn create_web_app(
    data: actix_web::web::Data<AppState>,
) -> WebApp<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    WebApp::new()
        .app_data(data)
        .wrap(middleware::Logger::default()) // enable logger
        .service(api::scope())
        .service(webhook::scope())
}

/// start http server
pub async fn start(state: AppState) -> Result<()> {
    let state = actix_web::web::Data::new(state);

    let c_data = state.clone();
    let server = HttpServer::new(move || create_web_app(c_data.clone()));
    let num = if state.setting.thread.http == 0 {
        num_cpus::get()
    } else {
        state.setting.thread.http
    };
    let host = state.setting.network.host.clone();
    let port = state.setting.network.port;
    info!("Start http server {}:{}", host, port);
    server.workers(num).bind((host, port))?.run().await?;
    Ok(())
}
