//! Example: bootstrapping a small application context
//!
//! Declares two configuration sources (one importing the other), a shared
//! connection pool and a listener, then refreshes the context and prints what
//! expansion and interceptor registration produced.

use std::sync::Arc;

use elif_context::bootstrap::BootstrapContext;
use elif_context::config::{BootstrapConfig, Environment, StandardEnvironment};
use elif_context::definitions::Definition;
use elif_context::errors::ContextResult;
use elif_context::metadata::{Condition, FactoryMethod, SourceModel, TypeCatalog, TypeMetadata};
use elif_context::pipeline::LISTENER_ATTRIBUTE;

struct ConnectionPool {
    url: String,
}

struct UserRepository {
    pool: Arc<ConnectionPool>,
}

struct AuditLog;

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with_type(TypeMetadata::source(
            "demo::AppConfig",
            SourceModel::full()
                .with_import("demo::DataConfig")
                .with_component(Definition::object("auditLog", |_| Ok(AuditLog)).with_attribute(LISTENER_ATTRIBUTE, true)),
        ))
        .with_type(TypeMetadata::source(
            "demo::DataConfig",
            SourceModel::full()
                .with_factory_method(FactoryMethod::new("connectionPool", |_| {
                    Ok(ConnectionPool {
                        url: "postgres://localhost/demo".to_string(),
                    })
                }))
                .with_factory_method(
                    FactoryMethod::new("userRepository", |call| {
                        Ok(UserRepository {
                            pool: call.get::<ConnectionPool>("connectionPool")?,
                        })
                    })
                    .with_condition(Condition::on_property("users.enabled")),
                ),
        ))
}

fn main() -> ContextResult<()> {
    let environment = StandardEnvironment::new(Environment::Development).with_property("users.enabled", "true");
    let context = BootstrapContext::builder()
        .with_config(BootstrapConfig::new())
        .with_reader(Arc::new(catalog()))
        .with_resolver(Arc::new(environment))
        .with_definition(Definition::new("appConfig", "demo::AppConfig"))
        .build()?;

    let stats = context.refresh()?;
    println!("Refreshed in {:?} with {} definitions", stats.total_time, stats.definition_count);

    let log = context.expansion_log()?;
    for entry in &log.parsed {
        println!("  round {} parsed '{}' ({})", entry.round, entry.name, entry.type_name);
    }
    println!("Enhanced sources: {:?}", log.enhanced);
    println!("Interceptor chain: {:?}", context.interceptor_chain()?);
    println!("Listeners: {:?}", context.listeners()?);

    let pool = context.get::<ConnectionPool>("connectionPool")?;
    let repository = context.get::<UserRepository>("userRepository")?;
    println!(
        "Repository shares the pool for {}: {}",
        pool.url,
        Arc::ptr_eq(&pool, &repository.pool)
    );

    Ok(())
}
