// ==============================================================================
// lib.rs - Prevalence Core Library
// ==============================================================================
// Description: Carrier frequency / prevalence engine and shared-annotation sync
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-16
// Version: 1.2.0
// ==============================================================================

pub mod models;
pub mod frequency;
pub mod source;
pub mod calculations;
pub mod validator;
pub mod observable;
pub mod debounce;
pub mod store;
pub mod annotation;
pub mod config;
