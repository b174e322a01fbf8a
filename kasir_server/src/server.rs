use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use duitku_tools::DuitkuApi;
use kasir_engine::{OrderFlowApi, PaymentApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{
        health,
        AddProductRoute,
        AdjustStockRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        CreatePaymentRoute,
        DeleteOrderRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        PaymentCallbackRoute,
        PaymentStatusRoute,
        PaymentsForOrderRoute,
        ProductsRoute,
        SweepPaymentsRoute,
        UpdateOrderRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let _sweeper = start_expiry_worker(db.clone(), config.sweep_interval_secs);
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let duitku = DuitkuApi::new(config.duitku.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone());
        let payments_api = PaymentApi::new(db.clone());
        let duitku_api = duitku.clone();
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kgs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(duitku_api));
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(PaymentsForOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(AdjustStockRoute::<SqliteDatabase>::new())
            .service(PaymentCallbackRoute::<SqliteDatabase>::new())
            .service(SweepPaymentsRoute::<SqliteDatabase>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatusRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
