// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (response headers).

pub mod headers;

pub use headers::add_response_headers;
