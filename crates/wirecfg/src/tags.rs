//! Service tags.

use wirecfg_tree::Value;

use crate::error::{ErrorKind, LoadError, Scope};

/// A tag attached to a service: a name plus scalar attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTag {
    pub name: String,
    pub attributes: Vec<(String, Value)>,
}

impl ServiceTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Where a tag list is declared; the two places word their errors differently.
#[derive(Debug, Clone, Copy)]
pub enum TagOwner<'a> {
    Service(Scope<'a>),
    Defaults { file: &'a str },
}

impl TagOwner<'_> {
    fn error(&self, message: String) -> LoadError {
        match self {
            TagOwner::Service(scope) => scope.error(ErrorKind::InvalidTag, message),
            TagOwner::Defaults { file } => {
                LoadError::new(ErrorKind::InvalidTag, message).in_file(*file)
            }
        }
    }

    fn not_a_list(&self) -> String {
        match self {
            TagOwner::Service(scope) => format!(
                "Parameter \"tags\" must be an array for {scope}. Check your YAML syntax."
            ),
            TagOwner::Defaults { file } => format!(
                "Parameter \"tags\" in \"_defaults\" must be an array in {file}. Check your YAML \
                 syntax."
            ),
        }
    }

    fn missing_name(&self) -> String {
        match self {
            TagOwner::Service(scope) => {
                format!("A \"tags\" entry is missing a \"name\" key for {scope}.")
            }
            TagOwner::Defaults { file } => {
                format!("A \"tags\" entry in \"_defaults\" is missing a \"name\" key in {file}.")
            }
        }
    }

    fn bad_name(&self) -> String {
        match self {
            TagOwner::Service(scope) => {
                format!("The tag name for {scope} must be a non-empty string.")
            }
            TagOwner::Defaults { file } => {
                format!("The tag name in \"_defaults\" must be a non-empty string in {file}.")
            }
        }
    }

    fn bad_attribute(&self, tag: &str, attribute: &str) -> String {
        match self {
            TagOwner::Service(scope) => format!(
                "A \"tags\" attribute must be of a scalar-type for {scope}, tag \"{tag}\", \
                 attribute \"{attribute}\". Check your YAML syntax."
            ),
            TagOwner::Defaults { file } => format!(
                "Tag \"{tag}\", attribute \"{attribute}\" in \"_defaults\" must be of a \
                 scalar-type in {file}. Check your YAML syntax."
            ),
        }
    }
}

/// Normalize a `tags` value into a tag list.
///
/// Entries are either a bare tag name or a mapping with a `name` key; every other key of the
/// mapping is an attribute and must hold a scalar or null.
pub fn parse_tags(value: &Value, owner: TagOwner<'_>) -> Result<Vec<ServiceTag>, LoadError> {
    if !value.is_collection() {
        return Err(owner.error(owner.not_a_list()));
    }

    value
        .iter_keyed()
        .map(|(_, entry)| {
            let Some(mapping) = entry.as_mapping() else {
                return match entry {
                    Value::String(name) if !name.is_empty() => Ok(ServiceTag::new(name.as_str())),
                    Value::Null => Err(owner.error(owner.missing_name())),
                    _ => Err(owner.error(owner.bad_name())),
                };
            };

            let name = match mapping.get("name") {
                None | Some(Value::Null) => return Err(owner.error(owner.missing_name())),
                Some(Value::String(name)) if !name.is_empty() => name.clone(),
                Some(_) => return Err(owner.error(owner.bad_name())),
            };

            let mut tag = ServiceTag::new(name);
            for (key, attribute) in mapping.iter() {
                let key = key.to_string();
                if key == "name" {
                    continue;
                }
                if !attribute.is_scalar() && !attribute.is_null() {
                    return Err(owner.error(owner.bad_attribute(&tag.name, &key)));
                }
                tag.attributes.push((key, attribute.clone()));
            }
            Ok(tag)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_tags(source: &str) -> Result<Vec<ServiceTag>, LoadError> {
        let value = wirecfg_tree::parse(source).unwrap();
        parse_tags(
            &value,
            TagOwner::Service(Scope::service("app.listener", "services.yaml")),
        )
    }

    fn default_tags(source: &str) -> Result<Vec<ServiceTag>, LoadError> {
        let value = wirecfg_tree::parse(source).unwrap();
        parse_tags(&value, TagOwner::Defaults { file: "services.yaml" })
    }

    #[test]
    fn test_shorthand_and_full_form() {
        let tags = service_tags("[kernel.reset, { name: kernel.listener, priority: 10 }]").unwrap();
        assert_eq!(
            tags,
            vec![
                ServiceTag::new("kernel.reset"),
                ServiceTag::new("kernel.listener").with_attribute("priority", 10i64),
            ]
        );
    }

    #[test]
    fn test_scalar_attributes() {
        let tags = service_tags("[{ name: t, weight: 3.5, enabled: true, note: ~ }]").unwrap();
        assert_eq!(tags[0].name, "t");
        assert_eq!(tags[0].attribute("weight"), Some(&Value::Float(3.5)));
        assert_eq!(tags[0].attribute("enabled"), Some(&Value::Bool(true)));
        assert_eq!(tags[0].attribute("note"), Some(&Value::Null));
    }

    #[test]
    fn test_non_scalar_attribute() {
        let err = service_tags("[{ name: t, bad: [1, 2] }]").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTag);
        insta::assert_snapshot!(err.message, @r#"A "tags" attribute must be of a scalar-type for service "app.listener" in services.yaml, tag "t", attribute "bad". Check your YAML syntax."#);

        let err = default_tags("[{ name: t, bad: { a: 1 } }]").unwrap_err();
        insta::assert_snapshot!(err.message, @r#"Tag "t", attribute "bad" in "_defaults" must be of a scalar-type in services.yaml. Check your YAML syntax."#);
    }

    #[test]
    fn test_names() {
        let err = service_tags("[{ priority: 1 }]").unwrap_err();
        assert!(err.message.contains("missing a \"name\" key"), "{}", err.message);

        let err = service_tags("[{ name: '' }]").unwrap_err();
        assert!(err.message.contains("non-empty string"), "{}", err.message);

        let err = service_tags("['']").unwrap_err();
        assert!(err.message.contains("non-empty string"), "{}", err.message);

        let err = service_tags("[{ name: [a] }]").unwrap_err();
        assert!(err.message.contains("non-empty string"), "{}", err.message);

        let err = default_tags("[{ name: ~ }]").unwrap_err();
        assert!(err.message.contains("in \"_defaults\" is missing"), "{}", err.message);
    }

    #[test]
    fn test_not_a_list() {
        let err = service_tags("kernel.reset").unwrap_err();
        insta::assert_snapshot!(err.message, @r#"Parameter "tags" must be an array for service "app.listener" in services.yaml. Check your YAML syntax."#);
        assert_eq!(err.service.as_deref(), Some("app.listener"));

        let err = default_tags("3").unwrap_err();
        assert!(err.message.contains("in \"_defaults\" must be an array"), "{}", err.message);
    }
}
