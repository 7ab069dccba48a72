#![forbid(unsafe_code)]
//! relflow-io: resolve logical stream/table names to physical systems.
//!
//! The compiler only ever talks to the `IoResolver` trait. Resolvers are
//! read-only lookups over registrations supplied at construction; they do
//! not touch the physical systems themselves.

pub mod config_resolver;
pub mod factory;
pub mod io_config;
pub mod resolver;

pub use config_resolver::{ConfigIoResolver, SourceKind, SystemRegistration};
pub use factory::{
    create_io_resolver, ConfigIoResolverFactory, IoResolverFactory, ResolverRegistry,
};
pub use io_config::SqlIoConfig;
pub use resolver::{IoResolver, IoRole, IoRoles};
