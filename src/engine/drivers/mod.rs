// SPDX-License-Identifier: Apache-2.0

// Database Drivers Module

pub mod mongodb;
pub mod postgres;
pub mod trino;
