// src/common/payload.rs

use axum::extract::{FromRequest, FromRequestParts};

use crate::common::error::AppError;

// Wrappers dos extratores do axum: a rejeição sai no formato de AppError (400 + JSON)

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
