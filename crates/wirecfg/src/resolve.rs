//! Reference resolution.

use tracing::trace;
use wirecfg_tree::{Key, Tagged, Value};

use crate::argument::{Argument, ClosureProxy, Expression, Reference};
use crate::error::{DeprecationKind, DeprecationLog, ErrorKind, LoadError, Owner, Scope};

/// Turns raw document values into [`Argument`]s.
pub struct ReferenceResolver<'a> {
    scope: Scope<'a>,
    log: &'a mut DeprecationLog,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(scope: Scope<'a>, log: &'a mut DeprecationLog) -> Self {
        Self { scope, log }
    }

    /// Resolve a value, recursing through collections.
    pub fn resolve(&mut self, value: &Value) -> Result<Argument, LoadError> {
        Ok(match value {
            Value::Null => Argument::Null,
            Value::Bool(b) => Argument::Bool(*b),
            Value::Int(i) => Argument::Int(*i),
            Value::Float(f) => Argument::Float(*f),
            Value::String(s) => self.resolve_string(s)?,
            Value::Sequence(items) => Argument::Sequence(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(_) => Argument::Mapping(self.resolve_entries(value)?),
            Value::Tagged(tagged) => self.resolve_tagged(tagged)?,
        })
    }

    /// Resolve each item of a collection, keyed by name or position.
    ///
    /// Callers check that `value` is a collection; anything else yields no entries.
    pub fn resolve_entries(&mut self, value: &Value) -> Result<Vec<(Key, Argument)>, LoadError> {
        value
            .iter_keyed()
            .map(|(key, item)| self.resolve(item).map(|argument| (key, argument)))
            .collect()
    }

    fn resolve_string(&mut self, s: &str) -> Result<Argument, LoadError> {
        if let Some(expression) = s.strip_prefix("@=") {
            if let Owner::Parameter(_) = self.scope.owner {
                return Err(self.scope.error(
                    ErrorKind::InvalidArgument,
                    format!("Using expressions in parameters is not allowed for {}.", self.scope),
                ));
            }
            return Ok(Argument::Expression(Expression {
                source: expression.to_owned(),
            }));
        }

        let Some(rest) = s.strip_prefix('@') else {
            return Ok(Argument::String(s.to_owned()));
        };

        let (id, optional, escaped) = if rest.starts_with('@') {
            (rest, false, true)
        } else if let Some(id) = rest.strip_prefix('?') {
            (id, true, false)
        } else {
            (rest, false, false)
        };

        let id = match id.strip_suffix('=') {
            Some(stripped) => {
                self.log.report(self.scope.deprecation(
                    DeprecationKind::StrictReferenceSuffix,
                    format!(
                        "The \"=\" suffix that used to disable strict references is deprecated \
                         and will be unsupported in the future. Remove it in \"{id}\"."
                    ),
                ))?;
                stripped
            }
            None => id,
        };

        if escaped {
            return Ok(Argument::String(id.to_owned()));
        }

        let reference = if optional {
            Reference::optional(id)
        } else {
            Reference::new(id)
        };
        trace!(reference = %reference, scope = %self.scope, "resolved reference");
        Ok(Argument::Reference(reference))
    }

    fn resolve_tagged(&mut self, tagged: &Tagged) -> Result<Argument, LoadError> {
        let payload = &tagged.value;
        match tagged.tag.as_str() {
            "iterator" => {
                if payload.as_sequence().is_none() {
                    return Err(self.scope.error(
                        ErrorKind::InvalidArgument,
                        format!(
                            "\"!iterator\" tag only accepts sequences, found {} for {}.",
                            payload.type_name(),
                            self.scope
                        ),
                    ));
                }
                let items = self
                    .resolve_entries(payload)?
                    .into_iter()
                    .map(|(_, item)| item)
                    .collect();
                Ok(Argument::Iterator(items))
            }
            "service_locator" => {
                let Some(mapping) = payload.as_mapping() else {
                    return Err(self.scope.error(
                        ErrorKind::InvalidArgument,
                        format!(
                            "\"!service_locator\" tag only accepts mappings, found {} for {}.",
                            payload.type_name(),
                            self.scope
                        ),
                    ));
                };
                let mut services = Vec::with_capacity(mapping.len());
                for (key, item) in mapping.iter() {
                    let reference = match item.as_str() {
                        Some(s) if s.starts_with('@') && !s.starts_with("@@") => {
                            self.resolve_string(s)?
                        }
                        _ => Argument::Null,
                    };
                    let Argument::Reference(reference) = reference else {
                        return Err(self.scope.error(
                            ErrorKind::InvalidArgument,
                            format!(
                                "\"!service_locator\" tagged values must be {{key: @service}} \
                                 mappings, entry \"{key}\" is not a service reference for {}.",
                                self.scope
                            ),
                        ));
                    };
                    services.push((key.clone(), reference));
                }
                Ok(Argument::ServiceLocator(services))
            }
            "closure_proxy" => {
                let service = payload.positional(0).and_then(Value::as_str);
                let method = payload.positional(1).and_then(Value::as_str);
                let shape_ok = payload.collection_len() == Some(2);
                let proxy = match (service, method) {
                    (Some(service), Some(method))
                        if shape_ok && service.starts_with('@') && !service.starts_with("@@") =>
                    {
                        let reference = match service.strip_prefix("@?") {
                            Some(id) => Reference::optional(id),
                            None => Reference::new(&service[1..]),
                        };
                        Some(ClosureProxy {
                            reference,
                            method: method.to_owned(),
                        })
                    }
                    _ => None,
                };
                proxy.map(Argument::ClosureProxy).ok_or_else(|| {
                    self.scope.error(
                        ErrorKind::InvalidArgument,
                        format!(
                            "\"!closure_proxy\" tagged values must be arrays of [@service, method] \
                             for {}.",
                            self.scope
                        ),
                    )
                })
            }
            other => Err(self.scope.error(
                ErrorKind::UnsupportedTag {
                    tag: other.to_owned(),
                },
                format!("Unsupported tag \"!{other}\" for {}.", self.scope),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::InvalidBehavior;
    use crate::error::Severity;

    fn resolve(source: &str) -> Result<Argument, LoadError> {
        let value = wirecfg_tree::parse(source).unwrap();
        let mut log = DeprecationLog::default();
        ReferenceResolver::new(Scope::service("app.test", "services.yaml"), &mut log)
            .resolve(&value)
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(resolve("42").unwrap(), Argument::Int(42));
        assert_eq!(resolve("~").unwrap(), Argument::Null);
        assert_eq!(resolve("hello").unwrap(), Argument::from("hello"));
        assert_eq!(resolve("'mail@example.com'").unwrap(), Argument::from("mail@example.com"));
    }

    #[test]
    fn test_reference_prefixes() {
        assert_eq!(resolve("'@logger'").unwrap(), Argument::Reference(Reference::new("logger")));
        assert_eq!(
            resolve("'@?logger'").unwrap(),
            Argument::Reference(Reference::optional("logger"))
        );
        assert_eq!(resolve("'@@logger'").unwrap(), Argument::from("@logger"));
        assert_eq!(
            resolve("'@=service(\"mailer\").transport()'").unwrap(),
            Argument::Expression(Expression {
                source: "service(\"mailer\").transport()".into()
            })
        );
    }

    #[test]
    fn test_nested_collections_keep_shape() {
        let resolved = resolve("{ a: ['@x', 1], $b: { c: '@?y' } }").unwrap();
        let Argument::Mapping(entries) = resolved else {
            panic!("expected mapping");
        };
        assert_eq!(entries[0].0, Key::Name("a".into()));
        assert_eq!(
            entries[0].1,
            Argument::Sequence(vec![Reference::new("x").into(), Argument::Int(1)])
        );
        assert_eq!(entries[1].0, Key::Name("$b".into()));
        assert_eq!(
            entries[1].1,
            Argument::Mapping(vec![(Key::Name("c".into()), Reference::optional("y").into())])
        );
    }

    #[test]
    fn test_strict_suffix_is_deprecated() {
        let value = Value::from("@logger=");
        let mut log = DeprecationLog::default();
        let resolved = ReferenceResolver::new(Scope::service("app.test", "services.yaml"), &mut log)
            .resolve(&value)
            .unwrap();
        assert_eq!(resolved, Argument::Reference(Reference::new("logger")));
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].kind, DeprecationKind::StrictReferenceSuffix);

        let mut log = DeprecationLog::new(Severity::Deny);
        let err = ReferenceResolver::new(Scope::service("app.test", "services.yaml"), &mut log)
            .resolve(&value)
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Deprecated(DeprecationKind::StrictReferenceSuffix)
        );
    }

    #[test]
    fn test_iterator() {
        let resolved = resolve("!iterator ['@a', '@?b']").unwrap();
        assert_eq!(
            resolved,
            Argument::Iterator(vec![
                Reference::new("a").into(),
                Reference::optional("b").into()
            ])
        );

        let err = resolve("!iterator { a: '@a' }").unwrap_err();
        insta::assert_snapshot!(err.message, @r#""!iterator" tag only accepts sequences, found mapping for service "app.test" in services.yaml."#);
    }

    #[test]
    fn test_service_locator() {
        let resolved = resolve("!service_locator { a: '@svcA', b: '@?svcB' }").unwrap();
        let Argument::ServiceLocator(entries) = resolved else {
            panic!("expected service locator");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1.invalid_behavior, InvalidBehavior::Exception);
        assert_eq!(entries[1].1.invalid_behavior, InvalidBehavior::Ignore);
        assert_eq!(entries[1].1.id, "svcB");
    }

    #[test]
    fn test_service_locator_rejects_non_references() {
        for source in [
            "!service_locator { a: svcA }",
            "!service_locator { a: '@@svcA' }",
            "!service_locator { a: 3 }",
            "!service_locator { a: '@=expr' }",
        ] {
            let err = resolve(source).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{source}");
            assert!(err.message.contains("entry \"a\""), "{}", err.message);
        }
        let err = resolve("!service_locator ['@a']").unwrap_err();
        assert!(err.message.contains("only accepts mappings"), "{}", err.message);
    }

    #[test]
    fn test_closure_proxy() {
        let resolved = resolve("!closure_proxy ['@?svc', method]").unwrap();
        assert_eq!(
            resolved,
            Argument::ClosureProxy(ClosureProxy {
                reference: Reference::optional("svc"),
                method: "method".into(),
            })
        );

        let resolved = resolve("!closure_proxy ['@svc', method]").unwrap();
        let Argument::ClosureProxy(proxy) = resolved else {
            panic!("expected closure proxy");
        };
        assert_eq!(proxy.reference.invalid_behavior, InvalidBehavior::Exception);
    }

    #[test]
    fn test_closure_proxy_rejects_bad_shapes() {
        for source in [
            "!closure_proxy [svc, method]",
            "!closure_proxy ['@@svc', method]",
            "!closure_proxy ['@svc']",
            "!closure_proxy ['@svc', method, extra]",
            "!closure_proxy ['@svc', 3]",
            "!closure_proxy { a: '@svc', b: method }",
            "!closure_proxy '@svc'",
        ] {
            let err = resolve(source).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{source}");
        }
    }

    #[test]
    fn test_unsupported_tag() {
        let err = resolve("!tagged app.handler").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnsupportedTag {
                tag: "tagged".into()
            }
        );
        insta::assert_snapshot!(err.message, @r#"Unsupported tag "!tagged" for service "app.test" in services.yaml."#);
    }

    #[test]
    fn test_expressions_rejected_in_parameters() {
        let value = Value::from("@=1 + 1");
        let mut log = DeprecationLog::default();
        let err = ReferenceResolver::new(Scope::parameter("answer", "parameters.yaml"), &mut log)
            .resolve(&value)
            .unwrap_err();
        assert!(err.message.contains("not allowed"), "{}", err.message);
    }
}
