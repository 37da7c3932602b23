mod component;
mod container;
mod injectable;
mod injector;
mod resolver;
mod token;

pub use component::{Component, ConstructFn};
pub use container::Container;
pub use injectable::Injectable;
pub use injector::Injector;
pub use resolver::{InstanceResolver, ModuleScope};
pub use token::{Instance, Token};
