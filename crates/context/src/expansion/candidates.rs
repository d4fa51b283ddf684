use std::collections::HashSet;
use std::sync::Arc;

use crate::definitions::{Definition, DefinitionRegistry, Supplier};
use crate::errors::ContextResult;
use crate::extensions::LOWEST_PRECEDENCE;
use crate::factory::SourceSpec;
use crate::metadata::{MetadataReader, SourceMode, SourceModel};

/// Definition attribute recording the mode of a checked configuration source
pub const SOURCE_MODE_ATTRIBUTE: &str = "elif.context.expansion.sourceMode";

/// A definition that qualified as a configuration source
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    pub name: String,
    /// User type, without any enhancement tag
    pub type_name: String,
    pub mode: SourceMode,
    pub order: Option<i32>,
    pub model: Arc<SourceModel>,
}

/// Check whether a registered definition is an unparsed configuration source
///
/// Qualifying definitions are stamped with their mode, and receive a source
/// supplier if they have none yet.
pub fn check_candidate(
    registry: &DefinitionRegistry,
    name: &str,
    reader: &dyn MetadataReader,
) -> ContextResult<Option<SourceCandidate>> {
    let definition = match registry.find(name)? {
        Some(definition) if !definition.parsed => definition,
        _ => return Ok(None),
    };
    let structural = reader.read(&definition);
    let mode = match structural.source_mode {
        Some(mode) => mode,
        None => return Ok(None),
    };
    let model = match reader
        .type_metadata(definition.user_type())
        .and_then(|metadata| metadata.source.clone())
    {
        Some(model) => model,
        None => return Ok(None),
    };

    let spec = Arc::new(source_spec(definition.user_type(), mode, &model, reader));
    registry.update(name, |definition| {
        definition.set_attribute(SOURCE_MODE_ATTRIBUTE, mode.as_str());
        if definition.supplier.is_none() {
            definition.supplier = Some(Supplier::Source(spec));
        }
    })?;

    Ok(Some(SourceCandidate {
        name: name.to_string(),
        type_name: definition.user_type().to_string(),
        mode,
        order: structural.order,
        model,
    }))
}

/// Ascending order value; candidates without one go last, in discovery order
pub fn sort_candidates(candidates: &mut [SourceCandidate]) {
    candidates.sort_by_key(|candidate| (candidate.order.is_none(), candidate.order.unwrap_or(LOWEST_PRECEDENCE)));
}

/// The source model followed by those of its structural ancestors, nearest first
///
/// Each model is paired with the type name that declares it.
pub fn lineage(
    type_name: &str,
    model: &Arc<SourceModel>,
    reader: &dyn MetadataReader,
) -> Vec<(String, Arc<SourceModel>)> {
    let mut visited = HashSet::new();
    visited.insert(type_name.to_string());
    let mut models = vec![(type_name.to_string(), model.clone())];
    let mut index = 0;

    while index < models.len() {
        let ancestors = models[index].1.ancestors.clone();
        for ancestor in ancestors {
            if !visited.insert(ancestor.clone()) {
                continue;
            }
            if let Some(inherited) = reader.type_metadata(&ancestor).and_then(|m| m.source.clone()) {
                models.push((ancestor, inherited));
            }
        }
        index += 1;
    }
    models
}

/// Runtime spec of a source: own factory methods, then inherited ones it does not redeclare
pub fn source_spec(
    type_name: &str,
    mode: SourceMode,
    model: &Arc<SourceModel>,
    reader: &dyn MetadataReader,
) -> SourceSpec {
    lineage(type_name, model, reader)
        .iter()
        .fold(SourceSpec::new(type_name, mode), |spec, (_, model)| {
            spec.with_methods(model.factory_methods.iter())
        })
}

/// Default definition name for a type: its simple name in lower camel case
pub fn default_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let simple = base.rsplit("::").next().unwrap_or(base);
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name a component definition, deriving one from its type when it has none
pub fn named(mut definition: Definition) -> Definition {
    if definition.name.is_empty() {
        definition.name = default_name(definition.user_type());
    }
    definition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FactoryMethod, TypeCatalog, TypeMetadata};

    #[test]
    fn test_default_name() {
        assert_eq!(default_name("app::mail::MailService"), "mailService");
        assert_eq!(default_name("Cache<String>"), "cache");
        assert_eq!(default_name("URLs"), "uRLs");
        assert_eq!(default_name(""), "");
    }

    #[test]
    fn test_check_candidate_stamps_mode_and_supplier() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::source("app::AppConfig", SourceModel::lite()).with_order(2))
            .with_type(TypeMetadata::concrete("app::Mailer"));
        let registry = DefinitionRegistry::new();
        registry.register(Definition::new("appConfig", "app::AppConfig")).unwrap();
        registry.register(Definition::new("mailer", "app::Mailer")).unwrap();

        let candidate = check_candidate(&registry, "appConfig", &catalog).unwrap().unwrap();
        assert_eq!(candidate.mode, SourceMode::Lite);
        assert_eq!(candidate.order, Some(2));

        let definition = registry.definition("appConfig").unwrap();
        assert_eq!(definition.attribute(SOURCE_MODE_ATTRIBUTE).unwrap(), "lite");
        assert!(matches!(definition.supplier, Some(Supplier::Source(_))));

        assert!(check_candidate(&registry, "mailer", &catalog).unwrap().is_none());
    }

    #[test]
    fn test_inherited_methods_are_shadowed_by_own() {
        let base = SourceModel::lite()
            .with_factory_method(FactoryMethod::new("clock", |_| Ok(1u32)))
            .with_factory_method(FactoryMethod::new("mailer", |_| Ok(2u32)));
        let own = Arc::new(
            SourceModel::full()
                .with_ancestor("app::BaseConfig")
                .with_factory_method(FactoryMethod::new("mailer", |_| Ok("own"))),
        );
        let catalog = TypeCatalog::new().with_type(TypeMetadata::source("app::BaseConfig", base));

        let spec = source_spec("app::AppConfig", SourceMode::Full, &own, &catalog);

        let names: Vec<&str> = spec.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["mailer", "clock"]);
        assert!(spec.method("mailer").unwrap().return_type.contains("str"));
    }

    #[test]
    fn test_sort_candidates() {
        let model = Arc::new(SourceModel::lite());
        let candidate = |name: &str, order: Option<i32>| SourceCandidate {
            name: name.to_string(),
            type_name: name.to_string(),
            mode: SourceMode::Lite,
            order,
            model: model.clone(),
        };
        let mut candidates = vec![
            candidate("none-1", None),
            candidate("ten", Some(10)),
            candidate("none-2", None),
            candidate("five", Some(5)),
        ];

        sort_candidates(&mut candidates);

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["five", "ten", "none-1", "none-2"]);
    }
}
