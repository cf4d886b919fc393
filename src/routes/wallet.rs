use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::UserId;
use crate::services::wallet_service::{CallbackAck, RechargeOrder, WalletService, WalletSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub amount: Decimal,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub out_trade_no: String,
    pub sign: String,
}

pub async fn get_balance(
    user: UserId,
    state: web::Data<AppState>,
) -> Result<web::Json<WalletSummary>, AppError> {
    let summary = WalletService::get_balance(&state.db, user.0).await?;
    Ok(web::Json(summary))
}

pub async fn recharge(
    user: UserId,
    state: web::Data<AppState>,
    body: web::Json<RechargeRequest>,
) -> Result<web::Json<RechargeOrder>, AppError> {
    let order = WalletService::create_recharge_order(
        &state.db,
        &state.config.payment_callback_secret,
        &state.config.payment_gateway_url,
        user.0,
        body.amount,
        body.remark.as_deref(),
    )
    .await?;
    Ok(web::Json(order))
}

/// Payment-gateway callback. Unauthenticated but signed; replays ack
/// without re-applying.
pub async fn callback(
    state: web::Data<AppState>,
    body: web::Json<CallbackRequest>,
) -> Result<HttpResponse, AppError> {
    let ack = WalletService::apply_recharge_callback(
        &state.db,
        &state.config.payment_callback_secret,
        &body.out_trade_no,
        &body.sign,
    )
    .await?;

    let message = match ack {
        CallbackAck::Applied => "success",
        CallbackAck::AlreadyProcessed => "already processed",
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message })))
}
