use std::collections::HashMap;
use std::sync::Arc;

use crate::definitions::{DefinitionRegistry, Supplier, ENHANCED_TYPE_TAG};
use crate::errors::ContextResult;
use crate::expansion::SOURCE_MODE_ATTRIBUTE;
use crate::factory::{EnhancedSpec, ObjectFactory, SourceSpec};
use crate::metadata::SourceMode;
use crate::proxy::PRESERVE_TARGET_TYPE_ATTRIBUTE;

/// Rewrite every full configuration source into its enhanced form
///
/// Runs once after expansion has converged. Returns the names that were rewritten.
pub fn enhance_sources(factory: &ObjectFactory) -> ContextResult<Vec<String>> {
    let registry = factory.registry();
    let full_sources = registry.names_matching(|definition| {
        definition
            .attribute(SOURCE_MODE_ATTRIBUTE)
            .and_then(SourceMode::from_attribute)
            == Some(SourceMode::Full)
    })?;

    let mut enhanced = Vec::new();
    for name in full_sources {
        let definition = registry.definition(&name)?;
        let spec = match &definition.supplier {
            Some(Supplier::Source(spec)) => spec.clone(),
            Some(Supplier::EnhancedSource(_)) => continue,
            _ => {
                tracing::warn!(
                    "Cannot enhance configuration source '{}': it has a custom instance supplier",
                    name
                );
                continue;
            }
        };
        if factory.contains_singleton(&name)? {
            tracing::info!(
                "Cannot enhance configuration source '{}': its instance was created too early",
                name
            );
            continue;
        }

        let bindings = method_bindings(registry, &name, &spec)?;
        let enhanced_type = format!("{}{}", definition.user_type(), ENHANCED_TYPE_TAG);
        tracing::trace!(
            "Replacing source '{}' of type '{}' with enhanced type '{}' ({} bound methods)",
            name,
            definition.type_name,
            enhanced_type,
            bindings.len()
        );

        let enhanced_spec = Arc::new(EnhancedSpec::new((*spec).clone(), bindings));
        registry.update(&name, |definition| {
            definition.type_name = enhanced_type;
            definition.supplier = Some(Supplier::EnhancedSource(enhanced_spec));
            definition.set_attribute(PRESERVE_TARGET_TYPE_ATTRIBUTE, true);
        })?;
        enhanced.push(name);
    }
    Ok(enhanced)
}

/// Factory methods of `source` that produced a registered definition
fn method_bindings(
    registry: &DefinitionRegistry,
    source: &str,
    spec: &SourceSpec,
) -> ContextResult<HashMap<String, String>> {
    let mut bindings = HashMap::new();
    for method in &spec.methods {
        let bound = registry.find(&method.name)?.map_or(false, |definition| {
            matches!(
                &definition.supplier,
                Some(Supplier::FactoryMethod { source: owner, method: produced })
                    if owner == source && produced.name == method.name
            )
        });
        if bound {
            bindings.insert(method.name.clone(), method.name.clone());
        }
    }
    Ok(bindings)
}
