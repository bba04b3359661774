//! JSON rendering of a loaded container.
//!
//! Strings keep the service-file notation: references are written `@id` / `@?id`,
//! expressions `@=...`, and plain strings starting with `@` are escaped as `@@`.
//! Tagged arguments become single-key objects (`{"!iterator": [...]}`).

use serde_json::{Map, json};
use wirecfg_tree::{Key, Value};

use crate::argument::Argument;
use crate::callable::{Callable, CallableTarget};
use crate::container::ContainerBuilder;
use crate::definition::{Autowire, Definition, DefinitionKind};
use crate::tags::ServiceTag;

/// Render parameters, aliases and services as one JSON object.
pub fn container_to_json(container: &ContainerBuilder) -> serde_json::Value {
    let parameters: Map<String, serde_json::Value> = container
        .parameters()
        .map(|(name, value)| (name.to_owned(), argument_to_json(value)))
        .collect();

    let aliases: Map<String, serde_json::Value> = container
        .aliases()
        .map(|(id, alias)| {
            (
                id.to_owned(),
                json!({"alias": alias.target, "public": alias.public}),
            )
        })
        .collect();

    let services: Map<String, serde_json::Value> = container
        .definitions()
        .map(|(id, definition)| (id.to_owned(), definition_to_json(definition)))
        .collect();

    json!({
        "parameters": parameters,
        "aliases": aliases,
        "services": services,
    })
}

/// Render one definition, leaving out everything that is unset.
pub fn definition_to_json(definition: &Definition) -> serde_json::Value {
    let mut map = Map::new();

    match &definition.kind {
        DefinitionKind::Standalone => {}
        DefinitionKind::Child {
            parent,
            inherit_tags,
        } => {
            map.insert("parent".into(), json!(parent));
            map.insert("inherit_tags".into(), json!(inherit_tags));
        }
        DefinitionKind::Instanceof => {
            map.insert("instanceof".into(), json!(true));
        }
    }

    if let Some(class) = &definition.class {
        map.insert("class".into(), json!(class));
    }
    let flags = [
        ("shared", definition.shared),
        ("synthetic", definition.synthetic),
        ("lazy", definition.lazy),
        ("public", definition.public),
        ("abstract", definition.is_abstract),
    ];
    for (name, flag) in flags {
        if let Some(flag) = flag {
            map.insert(name.into(), json!(flag));
        }
    }
    if let Some(deprecated) = &definition.deprecated {
        map.insert("deprecated".into(), json!(deprecated.template));
    }
    if let Some(factory) = &definition.factory {
        map.insert("factory".into(), callable_to_json(factory));
    }
    if let Some(file) = &definition.file {
        map.insert("file".into(), json!(file));
    }
    if !definition.arguments.is_empty() {
        map.insert("arguments".into(), entries_to_json(&definition.arguments));
    }
    if !definition.properties.is_empty() {
        map.insert("properties".into(), entries_to_json(&definition.properties));
    }
    if let Some(configurator) = &definition.configurator {
        map.insert("configurator".into(), callable_to_json(configurator));
    }
    if !definition.getters.is_empty() {
        map.insert("getters".into(), entries_to_json(&definition.getters));
    }
    if !definition.calls.is_empty() {
        let calls: Vec<serde_json::Value> = definition
            .calls
            .iter()
            .map(|call| json!([call.method, entries_to_json(&call.arguments)]))
            .collect();
        map.insert("calls".into(), json!(calls));
    }
    if !definition.tags.is_empty() {
        let tags: Vec<serde_json::Value> = definition.tags.iter().map(tag_to_json).collect();
        map.insert("tags".into(), json!(tags));
    }
    if let Some(decoration) = &definition.decoration {
        let mut decorates = Map::new();
        decorates.insert("id".into(), json!(decoration.decorated));
        if let Some(inner) = &decoration.inner_name {
            decorates.insert("inner".into(), json!(inner));
        }
        if decoration.priority != 0 {
            decorates.insert("priority".into(), json!(decoration.priority));
        }
        map.insert("decorates".into(), serde_json::Value::Object(decorates));
    }
    match &definition.autowire {
        Some(Autowire::Flag(flag)) => {
            map.insert("autowire".into(), json!(flag));
        }
        Some(Autowire::Calls(methods)) => {
            map.insert("autowire".into(), json!(methods));
        }
        None => {}
    }
    if !definition.autowiring_types.is_empty() {
        map.insert("autowiring_types".into(), json!(definition.autowiring_types));
    }
    if !definition.instanceof.is_empty() {
        let instanceof: Map<String, serde_json::Value> = definition
            .instanceof
            .iter()
            .map(|(class, fragment)| (class.clone(), definition_to_json(fragment)))
            .collect();
        map.insert("_instanceof".into(), serde_json::Value::Object(instanceof));
    }

    serde_json::Value::Object(map)
}

/// Render a resolved argument.
pub fn argument_to_json(argument: &Argument) -> serde_json::Value {
    match argument {
        Argument::Null => json!(null),
        Argument::Bool(b) => json!(b),
        Argument::Int(n) => json!(n),
        Argument::Float(n) => json!(n),
        Argument::String(s) if s.starts_with('@') => json!(format!("@{s}")),
        Argument::String(s) => json!(s),
        Argument::Sequence(items) => {
            json!(items.iter().map(argument_to_json).collect::<Vec<_>>())
        }
        Argument::Mapping(entries) => entries_to_json(entries),
        Argument::Reference(reference) => json!(reference.to_string()),
        Argument::Expression(expression) => json!(format!("@={}", expression.source)),
        Argument::Iterator(items) => {
            json!({"!iterator": items.iter().map(argument_to_json).collect::<Vec<_>>()})
        }
        Argument::ServiceLocator(entries) => {
            let services: Map<String, serde_json::Value> = entries
                .iter()
                .map(|(key, reference)| (key.to_string(), json!(reference.to_string())))
                .collect();
            json!({"!service_locator": services})
        }
        Argument::ClosureProxy(proxy) => {
            json!({"!closure_proxy": [proxy.reference.to_string(), proxy.method]})
        }
    }
}

/// Positional entries become an array, anything else an object.
fn entries_to_json(entries: &[(Key, Argument)]) -> serde_json::Value {
    let positional = entries
        .iter()
        .enumerate()
        .all(|(i, (key, _))| *key == Key::Index(i as i64));
    if positional {
        json!(entries.iter().map(|(_, v)| argument_to_json(v)).collect::<Vec<_>>())
    } else {
        let map: Map<String, serde_json::Value> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), argument_to_json(value)))
            .collect();
        serde_json::Value::Object(map)
    }
}

fn callable_to_json(callable: &Callable) -> serde_json::Value {
    match callable {
        Callable::Function(name) => json!(name),
        Callable::Method { target, method } => match target {
            CallableTarget::Class(class) => json!([class, method]),
            CallableTarget::Service(reference) => json!([reference.to_string(), method]),
            CallableTarget::Instance => json!([null, method]),
        },
    }
}

fn tag_to_json(tag: &ServiceTag) -> serde_json::Value {
    let mut map = Map::new();
    map.insert("name".into(), json!(tag.name));
    for (key, value) in &tag.attributes {
        map.insert(key.clone(), value_to_json(value));
    }
    serde_json::Value::Object(map)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => json!(null),
        Value::Bool(b) => json!(b),
        Value::Int(n) => json!(n),
        Value::Float(n) => json!(n),
        Value::String(s) => json!(s),
        Value::Sequence(items) => json!(items.iter().map(value_to_json).collect::<Vec<_>>()),
        Value::Mapping(mapping) => {
            let map: Map<String, serde_json::Value> = mapping
                .iter()
                .map(|(key, value)| (key.to_string(), value_to_json(value)))
                .collect();
            serde_json::Value::Object(map)
        }
        Value::Tagged(tagged) => {
            let mut map = Map::new();
            map.insert(format!("!{}", tagged.tag), value_to_json(&tagged.value));
            serde_json::Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{ClosureProxy, Expression, Reference};
    use crate::definition::Alias;

    #[test]
    fn test_arguments() {
        let arguments = Argument::Sequence(vec![
            Argument::Reference(Reference::new("logger")),
            Argument::Reference(Reference::optional("cache")),
            Argument::from("@literal"),
            Argument::Expression(Expression {
                source: "service('mailer')".into(),
            }),
            Argument::Iterator(vec![Argument::Reference(Reference::new("a"))]),
            Argument::ClosureProxy(ClosureProxy {
                reference: Reference::new("handler"),
                method: "handle".into(),
            }),
        ]);
        assert_eq!(
            argument_to_json(&arguments),
            json!([
                "@logger",
                "@?cache",
                "@@literal",
                "@=service('mailer')",
                {"!iterator": ["@a"]},
                {"!closure_proxy": ["@handler", "handle"]},
            ])
        );
    }

    #[test]
    fn test_named_entries_become_objects() {
        let entries = vec![
            (Key::Index(0), Argument::Int(1)),
            (Key::Name("$mailer".into()), Argument::Null),
        ];
        assert_eq!(entries_to_json(&entries), json!({"0": 1, "$mailer": null}));

        let locator = Argument::ServiceLocator(vec![(
            Key::Name("mailer".into()),
            Reference::new("app.mailer"),
        )]);
        assert_eq!(
            argument_to_json(&locator),
            json!({"!service_locator": {"mailer": "@app.mailer"}})
        );
    }

    #[test]
    fn test_container() {
        let mut container = ContainerBuilder::new();
        container.set_parameter("locale", Argument::from("en"));
        container.set_alias("mailer", Alias::new("app.mailer", false));

        let mut definition = Definition::child("app.base");
        definition.class = Some("App\\Mailer".into());
        definition.public = Some(false);
        definition.factory = Some(Callable::Method {
            target: CallableTarget::Service(Reference::new("factory")),
            method: "create".into(),
        });
        definition.tags = vec![ServiceTag::new("app.mail").with_attribute("priority", 10i64)];
        container.set_definition("app.mailer", definition);

        assert_eq!(
            container_to_json(&container),
            json!({
                "parameters": {"locale": "en"},
                "aliases": {"mailer": {"alias": "app.mailer", "public": false}},
                "services": {
                    "app.mailer": {
                        "parent": "app.base",
                        "inherit_tags": false,
                        "class": "App\\Mailer",
                        "public": false,
                        "factory": ["@factory", "create"],
                        "tags": [{"name": "app.mail", "priority": 10}],
                    }
                }
            })
        );
    }
}
