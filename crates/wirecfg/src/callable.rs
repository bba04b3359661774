//! Factory and configurator callables.

use wirecfg_tree::Value;

use crate::argument::{Argument, Reference};
use crate::error::{DeprecationLog, ErrorKind, LoadError, Scope};
use crate::resolve::ReferenceResolver;

/// A normalized factory or configurator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callable {
    /// A function or `Class::method` name.
    Function(String),
    /// A method on a class, a service, or the constructed instance.
    Method {
        target: CallableTarget,
        method: String,
    },
}

/// Receiver of a callable method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallableTarget {
    Class(String),
    Service(Reference),
    /// The instance being built; only valid for factories (`[~, method]`).
    Instance,
}

/// Parse the value of a `factory` or `configurator` key.
pub fn parse_callable(
    value: &Value,
    parameter: &str,
    scope: Scope<'_>,
    log: &mut DeprecationLog,
) -> Result<Callable, LoadError> {
    let invalid = |message: String| {
        scope.error(
            ErrorKind::InvalidCallable {
                parameter: parameter.to_owned(),
            },
            message,
        )
    };

    match value {
        Value::String(s) => {
            if let Some(id) = s.strip_prefix('@') {
                return Err(invalid(format!(
                    "The value of the \"{parameter}\" option for {scope} must be the id of the \
                     service without the \"@\" prefix (replace \"{s}\" with \"{id}\")."
                )));
            }
            if s.contains(':') && !s.contains("::") {
                let mut parts = s.split(':');
                let service = parts.next().unwrap_or_default();
                let method = parts.next().unwrap_or_default();
                let reference = Value::String(format!("@{service}"));
                let Argument::Reference(reference) =
                    ReferenceResolver::new(scope, log).resolve(&reference)?
                else {
                    return Err(invalid(format!(
                        "The service part of \"{s}\" in parameter \"{parameter}\" must be a service id for {scope}."
                    )));
                };
                return Ok(Callable::Method {
                    target: CallableTarget::Service(reference),
                    method: method.to_owned(),
                });
            }
            Ok(Callable::Function(s.clone()))
        }
        Value::Sequence(_) | Value::Mapping(_) => {
            let first = value.positional(0).filter(|v| !v.is_null());
            let second = value.positional(1).filter(|v| !v.is_null());
            let method = match second {
                Some(Value::String(method)) => method.clone(),
                Some(other) => {
                    return Err(invalid(format!(
                        "The method name of parameter \"{parameter}\" must be a string, found {} \
                         for {scope}. Check your YAML syntax.",
                        other.type_name()
                    )));
                }
                None => {
                    return Err(invalid(format!(
                        "Parameter \"{parameter}\" must contain an array with two elements for \
                         {scope}. Check your YAML syntax."
                    )));
                }
            };

            let target = match first {
                Some(first) => match ReferenceResolver::new(scope, log).resolve(first)? {
                    Argument::String(class) => CallableTarget::Class(class),
                    Argument::Reference(reference) => CallableTarget::Service(reference),
                    _ => {
                        return Err(invalid(format!(
                            "The first element of parameter \"{parameter}\" must be a class name \
                             or a service reference, found {} for {scope}. Check your YAML syntax.",
                            first.type_name()
                        )));
                    }
                },
                None if parameter == "factory" => CallableTarget::Instance,
                None => {
                    return Err(invalid(format!(
                        "Parameter \"{parameter}\" must contain an array with two elements for \
                         {scope}. Check your YAML syntax."
                    )));
                }
            };
            Ok(Callable::Method { target, method })
        }
        other => Err(invalid(format!(
            "Parameter \"{parameter}\" must be a string or an array, found {} for {scope}. \
             Check your YAML syntax.",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str, parameter: &str) -> Result<Callable, LoadError> {
        let value = wirecfg_tree::parse(source).unwrap();
        let mut log = DeprecationLog::default();
        parse_callable(
            &value,
            parameter,
            Scope::service("app.mailer", "services.yaml"),
            &mut log,
        )
    }

    #[test]
    fn test_function_names() {
        assert_eq!(
            parse("create_mailer", "factory").unwrap(),
            Callable::Function("create_mailer".into())
        );
        assert_eq!(
            parse("'App\\MailerFactory::create'", "factory").unwrap(),
            Callable::Function("App\\MailerFactory::create".into())
        );
    }

    #[test]
    fn test_service_method_shorthand() {
        assert_eq!(
            parse("'factory.mailer:create'", "factory").unwrap(),
            Callable::Method {
                target: CallableTarget::Service(Reference::new("factory.mailer")),
                method: "create".into(),
            }
        );
    }

    #[test]
    fn test_shorthand_goes_through_reference_rules() {
        assert_eq!(
            parse("'?factory.mailer:create'", "factory").unwrap(),
            Callable::Method {
                target: CallableTarget::Service(Reference::optional("factory.mailer")),
                method: "create".into(),
            }
        );

        let value = wirecfg_tree::parse("'factory.mailer=:create'").unwrap();
        let mut log = DeprecationLog::default();
        let callable = parse_callable(
            &value,
            "factory",
            Scope::service("app.mailer", "services.yaml"),
            &mut log,
        )
        .unwrap();
        assert_eq!(
            callable,
            Callable::Method {
                target: CallableTarget::Service(Reference::new("factory.mailer")),
                method: "create".into(),
            }
        );
        assert_eq!(log.records().len(), 1);
        assert_eq!(
            log.records()[0].kind,
            crate::error::DeprecationKind::StrictReferenceSuffix
        );

        let err = parse("'=service(\"x\"):create'", "factory").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidCallable {
                parameter: "factory".into()
            }
        );
    }

    #[test]
    fn test_at_prefix_is_rejected() {
        let err = parse("'@factory.mailer:create'", "factory").unwrap_err();
        insta::assert_snapshot!(err.message, @r#"The value of the "factory" option for service "app.mailer" in services.yaml must be the id of the service without the "@" prefix (replace "@factory.mailer:create" with "factory.mailer:create")."#);
    }

    #[test]
    fn test_array_forms() {
        assert_eq!(
            parse("['@?configurator', configure]", "configurator").unwrap(),
            Callable::Method {
                target: CallableTarget::Service(Reference::optional("configurator")),
                method: "configure".into(),
            }
        );
        assert_eq!(
            parse("[App\\Factory, create]", "factory").unwrap(),
            Callable::Method {
                target: CallableTarget::Class("App\\Factory".into()),
                method: "create".into(),
            }
        );
    }

    #[test]
    fn test_instance_factory() {
        assert_eq!(
            parse("[~, create]", "factory").unwrap(),
            Callable::Method {
                target: CallableTarget::Instance,
                method: "create".into(),
            }
        );
        let err = parse("[~, configure]", "configurator").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidCallable {
                parameter: "configurator".into()
            }
        );
        insta::assert_snapshot!(err.message, @r#"Parameter "configurator" must contain an array with two elements for service "app.mailer" in services.yaml. Check your YAML syntax."#);
    }

    #[test]
    fn test_bad_shapes() {
        assert!(parse("[App\\Factory]", "factory").is_err());
        assert!(parse("[]", "factory").is_err());
        assert!(parse("[App\\Factory, 3]", "factory").is_err());
        assert!(parse("[[a], create]", "factory").is_err());

        let err = parse("42", "factory").unwrap_err();
        assert!(err.message.contains("must be a string or an array, found integer"), "{}", err.message);
    }
}
