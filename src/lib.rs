//! # lightspring
//!
//! Annotated REST backends for Rust: a name-keyed dependency injection
//! container, static controller metadata, and route dispatch on axum.
//!
//! ## Features
//!
//! - **Named registrations**: services live under a string name or a unique symbol
//! - **Constructor injection**: declared parameters resolved through explicit injection keys
//! - **Lifetimes**: singleton, per-request, and transient services
//! - **Controllers**: routes and parameter bindings described as data, dispatched by handler name
//! - **Caching**: TTL result caching over a pluggable key-value client
//! - **Authentication**: JWT cookies or bearer tokens, role checks, admin bootstrap
//! - **Events**: named in-process events bound to container-managed services
//! - **Serving**: static files, generated OpenAPI docs, rate limiting, security headers
//!
//! ## Quick Start
//!
//! ```rust
//! use lightspring::{Constructor, Container, Key, ParamSpec, ServiceOptions};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container.register_instance("Database", Database { url: "postgres://localhost".to_string() });
//! container.register(
//!     "UserService",
//!     Constructor::of::<UserService>(|args| Ok(UserService { db: args.take(0)? }))
//!         .param(ParamSpec::class::<Database>())
//!         .inject(0, "Database"),
//!     ServiceOptions::singleton(),
//! );
//!
//! let users = container.resolve::<UserService>("UserService").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once and shared across the container
//! - **Request**: created once per [`RequestScope`]
//! - **Transient**: created fresh on every resolution (the default)
//!
//! ## Controllers
//!
//! A [`Controller`](controller::Controller) describes its routes with
//! [`ClassMetadata`](metadata::ClassMetadata) and receives positional
//! [`HandlerArgs`](web::HandlerArgs) assembled from path parameters, the
//! request body and the [`Reply`](web::Reply). See [`Application`] for wiring
//! everything into a server.

pub mod application;
pub mod auth;
pub mod cache;
pub mod config;
pub mod constructor;
pub mod container;
pub mod controller;
pub mod descriptors;
pub mod error;
pub mod events;
pub mod key;
pub mod lifetime;
pub mod logging;
pub mod metadata;
pub mod observer;
pub mod web;

mod internal;

pub use application::{Application, ApplicationBuilder, StartupError};
pub use constructor::{AnyArc, Constructor, CtorArgs, Injectable, ParamKind, ParamSpec};
pub use container::{Container, RequestScope};
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use key::{short_type_name, Key};
pub use lifetime::{Lifetime, ServiceOptions};
pub use observer::{ResolutionObserver, TracingObserver};
