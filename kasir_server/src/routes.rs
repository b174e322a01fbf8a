//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database operations,
//! gateway calls, etc.) must be expressed as futures or asynchronous functions so that worker threads can interleave
//! requests.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use chrono::{Duration, Utc};
use duitku_tools::{DuitkuApi, NewInquiry};
use kasir_engine::{
    db_types::{
        GatewayUpdate,
        NewPayment,
        NewProduct,
        NewTransaction,
        PaymentStatus,
        TransactionQueryFilter,
        TransactionStatus,
        UpdateTransaction,
    },
    helpers::new_merchant_order_id,
    OrderFlowApi,
    PaymentApi,
    PosDatabase,
};
use log::*;

use crate::{
    auth::ActorContext,
    data_objects::{CreatePaymentRequest, PaymentStatusQuery, StockAdjustment, SweepResult},
    errors::ServerError,
    helpers::parse_callback_body,
};

macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl PosDatabase);
pub async fn create_order<B: PosDatabase>(
    ctx: ActorContext,
    body: web::Json<NewTransaction>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for tenant {}", ctx.tenant_id);
    let order = api.create_order(ctx.context(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(orders_search => Get "/orders" impl PosDatabase);
pub async fn orders_search<B: PosDatabase>(
    ctx: ActorContext,
    query: web::Query<TransactionQueryFilter>,
    api: web::Data<OrderFlowApi<B>>,
    payments: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    // Lazily expire overdue payments first, so the listing never shows orders that are already dead.
    if let Err(e) = payments.sweep_expired(ctx.context(), Utc::now()).await {
        warn!("💻️ Lazy expiry sweep failed for tenant {}: {e}", ctx.tenant_id);
    }
    let page = api.search_orders(ctx.context(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(order_by_id => Get "/orders/{id}" impl PosDatabase);
pub async fn order_by_id<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let order = api
        .fetch_order(ctx.context(), id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Transaction {id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order => Patch "/orders/{id}" impl PosDatabase);
pub async fn update_order<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    body: web::Json<UpdateTransaction>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let order = api.update_order(ctx.context(), id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl PosDatabase);
pub async fn cancel_order<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let transaction = api.cancel_order(ctx.context(), id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

route!(delete_order => Delete "/orders/{id}" impl PosDatabase);
pub async fn delete_order<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    if !ctx.role.is_administrative() {
        return Err(ServerError::InsufficientPermissions(format!("Role {} may not delete transactions", ctx.role)));
    }
    let id = path.into_inner();
    api.delete_order(ctx.context(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

route!(payments_for_order => Get "/orders/{id}/payments" impl PosDatabase);
pub async fn payments_for_order<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let payments = api.payments_for_transaction(ctx.context(), id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------  Products  ----------------------------------------------------

route!(products => Get "/products" impl PosDatabase);
pub async fn products<B: PosDatabase>(
    ctx: ActorContext,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let products = api.products(ctx.context()).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(add_product => Post "/products" impl PosDatabase);
pub async fn add_product<B: PosDatabase>(
    ctx: ActorContext,
    body: web::Json<NewProduct>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.add_product(ctx.context(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(adjust_stock => Post "/products/{id}/stock" impl PosDatabase);
pub async fn adjust_stock<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    body: web::Json<StockAdjustment>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let product = api.adjust_stock(ctx.context(), id, body.delta).await?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------  Payments  ----------------------------------------------------

route!(create_payment => Post "/payments" impl PosDatabase);
/// Opens a gateway payment for a pending transaction.
///
/// The inquiry round-trip to Duitku happens *before* anything is written locally: if the gateway rejects the
/// inquiry or cannot be reached, no payment row is created and the transaction stays payable.
pub async fn create_payment<B: PosDatabase>(
    ctx: ActorContext,
    body: web::Json<CreatePaymentRequest>,
    orders: web::Data<OrderFlowApi<B>>,
    payments: web::Data<PaymentApi<B>>,
    duitku: web::Data<DuitkuApi>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    let order = orders
        .fetch_order(ctx.context(), params.transaction_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Transaction {}", params.transaction_id)))?;
    let trx = &order.transaction;
    if trx.status != TransactionStatus::Pending {
        return Err(ServerError::InvalidState(format!(
            "Transaction {} is {} and cannot take a payment",
            trx.id, trx.status
        )));
    }
    let now = Utc::now();
    let merchant_order_id = new_merchant_order_id(trx.tenant_id, &trx.transaction_number, now);
    let inquiry = NewInquiry {
        merchant_order_id: merchant_order_id.clone(),
        amount: trx.total.value(),
        payment_method: params.payment_method.clone(),
        product_details: format!("Pembayaran {}", trx.transaction_number),
        email: params.email.unwrap_or_else(|| "noreply@kasirgo.id".to_string()),
        customer_name: trx.customer_name.clone(),
    };
    let response = duitku.create_inquiry(inquiry).await?;
    let expired_at = now + Duration::minutes(duitku.config().expiry_period_mins);
    let new_payment = NewPayment {
        transaction_id: trx.id,
        merchant_order_id,
        reference: response.reference,
        payment_url: response.payment_url,
        va_number: response.va_number,
        qr_string: response.qr_string,
        payment_method: params.payment_method,
        amount: trx.total,
        status_code: Some(response.status_code),
        status_message: Some(response.status_message),
        expired_at: Some(expired_at),
    };
    let payment = payments.record_new_payment(ctx.context(), new_payment).await?;
    Ok(HttpResponse::Created().json(payment))
}

route!(payment_status => Get "/payments/{id}" impl PosDatabase);
/// Returns a payment's current state. With `?realtime=true`, a still-pending payment is checked against the
/// gateway first. A gateway that cannot be reached is not an error here; the stored status is returned unchanged
/// and the next poll or callback will catch up.
pub async fn payment_status<B: PosDatabase>(
    ctx: ActorContext,
    path: web::Path<i64>,
    query: web::Query<PaymentStatusQuery>,
    payments: web::Data<PaymentApi<B>>,
    duitku: web::Data<DuitkuApi>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let payment = payments
        .payment(ctx.context(), id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Payment {id}")))?;
    if !query.realtime || payment.status != PaymentStatus::Pending {
        return Ok(HttpResponse::Ok().json(payment));
    }
    let status = match duitku.transaction_status(&payment.merchant_order_id).await {
        Ok(status) => status,
        Err(e) => {
            warn!("💳️ Could not poll gateway for payment [{}]: {e}", payment.merchant_order_id);
            return Ok(HttpResponse::Ok().json(payment));
        },
    };
    let update = GatewayUpdate { result_code: status.status_code, reference: status.reference, raw_payload: None };
    let payment = payments.process_poll_result(ctx.context(), id, update).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(payment_callback => Post "/payments/callback" impl PosDatabase);
/// The Duitku server-to-server callback. Unauthenticated; trust is established solely by the MD5 signature over
/// the callback fields and our API key.
pub async fn payment_callback<B: PosDatabase>(
    req: HttpRequest,
    body: Bytes,
    payments: web::Data<PaymentApi<B>>,
    duitku: web::Data<DuitkuApi>,
) -> Result<HttpResponse, ServerError> {
    let payload = parse_callback_body(&req, &body)?;
    if !duitku.verify_callback(&payload) {
        return Err(ServerError::InvalidCallbackSignature);
    }
    let raw = String::from_utf8_lossy(&body).to_string();
    let update = GatewayUpdate {
        result_code: payload.result_code.clone(),
        reference: payload.reference.clone(),
        raw_payload: Some(raw),
    };
    payments.process_callback(&payload.merchant_order_id, update).await?;
    Ok(HttpResponse::Ok().body("OK"))
}

route!(sweep_payments => Post "/payments/sweep" impl PosDatabase);
/// Manually triggers an expiry sweep for the caller's tenant.
pub async fn sweep_payments<B: PosDatabase>(
    ctx: ActorContext,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let swept = api.sweep_expired(ctx.context(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(SweepResult { swept }))
}
