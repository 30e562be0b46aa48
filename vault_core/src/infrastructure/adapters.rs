// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Adapters implementing domain service ports.

pub mod encryption;
pub mod tag_codec;

pub use encryption::CryptoController;
pub use tag_codec::JsonTagCodec;
