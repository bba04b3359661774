//! Loader for YAML dependency-injection service files.
//!
//! A service file declares `imports`, `parameters`, `services` and configuration blocks for
//! registered extensions. [`YamlFileLoader`] reads such files into a [`ContainerBuilder`]:
//!
//! ```
//! use wirecfg::{Argument, ContainerBuilder, Reference, YamlFileLoader};
//!
//! let source = r#"
//! parameters:
//!     mailer.transport: smtp
//!
//! services:
//!     _defaults:
//!         public: false
//!
//!     app.mailer:
//!         class: App\Mailer
//!         arguments: ['@logger', '%mailer.transport%']
//! "#;
//!
//! let mut container = ContainerBuilder::new();
//! YamlFileLoader::new(&mut container)
//!     .load_source(source, "services.yaml")
//!     .unwrap();
//!
//! let mailer = container.definition("app.mailer").unwrap();
//! assert_eq!(mailer.class.as_deref(), Some("App\\Mailer"));
//! assert_eq!(mailer.public, Some(false));
//! assert_eq!(
//!     mailer.argument(0i64),
//!     Some(&Argument::Reference(Reference::new("logger")))
//! );
//! ```

mod argument;
mod callable;
mod container;
mod defaults;
mod definition;
mod dump;
mod error;
mod extension;
mod keywords;
mod loader;
mod locator;
mod options;
mod parser;
mod registrar;
mod resolve;
mod tags;

pub use argument::{Argument, ClosureProxy, Expression, InvalidBehavior, Reference};
pub use callable::{Callable, CallableTarget};
pub use container::ContainerBuilder;
pub use defaults::Defaults;
pub use definition::{
    Alias, Autowire, DEFAULT_DEPRECATION_TEMPLATE, Decoration, Definition, DefinitionKind,
    Deprecated, MethodCall,
};
pub use dump::{argument_to_json, container_to_json, definition_to_json};
pub use error::{Deprecation, DeprecationKind, ErrorKind, LoadError, Severity};
pub use extension::{Extension, ExtensionError, PassthroughExtension};
pub use keywords::Context;
pub use loader::YamlFileLoader;
pub use locator::FileLocator;
pub use options::LoaderOptions;
pub use registrar::{ClassRegistrar, GlobClassRegistrar, RegistrarError};
pub use tags::ServiceTag;
pub use wirecfg_tree::{Key, Mapping, Value};
